//! # Downstream Hooks
//!
//! The lowest-level consumer of handler output.
//!
//! A handler that forwards an event hands a notification to every hook
//! attached to one of its outlets, in attachment order. Each hook decides
//! whether the next one sees the notification (`Next`) or not (`Stop`).
//!
//! # Static vs Dynamic Dispatch
//!
//! [`Hook`] uses native `async fn` for zero-cost static dispatch. Outlets
//! store heterogeneous hooks and therefore go through [`DynHook`], which every
//! [`Hook`] implements automatically.

use crate::{error::BoxError, message::Message};
use futures::future::BoxFuture;
use std::future::Future;

/// Result of hook execution indicating whether to continue or stop propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookResult {
    /// The notification was observed; continue to the next hook.
    Next,
    /// The notification was consumed; stop propagation to subsequent hooks.
    Stop,
}

/// A downstream consumer of notifications.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Hook<{E}>`",
    label = "missing `Hook` implementation",
    note = "Hooks must implement `on_event` for the specific message type `{E}`."
)]
pub trait Hook<E: Message>: Send + Sync + 'static {
    /// Called when a notification is emitted.
    fn on_event(&self, event: &E) -> impl Future<Output = Result<HookResult, BoxError>> + Send;
}

/// Dynamic object-safe version of [`Hook`].
pub trait DynHook<E: Message>: Send + Sync + 'static {
    /// Called when a notification is emitted (dynamic dispatch version).
    fn on_event_dyn<'a>(&'a self, event: &'a E) -> BoxFuture<'a, Result<HookResult, BoxError>>;
}

impl<E: Message, T: Hook<E>> DynHook<E> for T {
    fn on_event_dyn<'a>(&'a self, event: &'a E) -> BoxFuture<'a, Result<HookResult, BoxError>> {
        Box::pin(self.on_event(event))
    }
}
