//! Logging hook for notification observation.

use std::fmt::Debug;
use voxroute_core::{BoxError, Hook, HookResult, Message};

/// A hook that logs every notification it sees and lets it through.
///
/// Attach it first on an outlet to trace what a handler forwards downstream.
pub struct LoggingHook {
    name: &'static str,
}

impl LoggingHook {
    /// Create a new `LoggingHook` with a default name.
    pub fn new() -> Self {
        Self { name: "outlet" }
    }

    /// Create a new `LoggingHook` with a custom name.
    ///
    /// The name identifies the outlet in log lines.
    pub fn named(name: &'static str) -> Self {
        Self { name }
    }
}

impl Default for LoggingHook {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Message + Debug> Hook<E> for LoggingHook {
    async fn on_event(&self, event: &E) -> Result<HookResult, BoxError> {
        #[cfg(feature = "tracing")]
        {
            tracing::debug!(name = %self.name, ?event, "notification emitted");
        }
        #[cfg(not(feature = "tracing"))]
        {
            let _ = (self.name, event);
        }
        Ok(HookResult::Next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logging_hook_continues() {
        let hook = LoggingHook::named("success");
        let result = hook.on_event(&"call-1".to_string()).await.unwrap();
        assert_eq!(result, HookResult::Next);
    }
}
