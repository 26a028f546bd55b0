//! Handler kinds and identities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of one configured handler instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(String);

impl HandlerId {
    /// Wrap a configuration node id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandlerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for HandlerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The participants of a call lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerKind {
    /// Coordinating application instance holding platform credentials.
    #[serde(rename = "voice-application")]
    Application,
    /// Receives calls placed to a configured endpoint.
    #[serde(rename = "voice-incoming-call")]
    Incoming,
    /// Originates calls.
    #[serde(rename = "voice-call")]
    Outgoing,
    /// Reacts to one digit-menu action.
    #[serde(rename = "voice-dtmf")]
    Digit,
    /// Supplies markup once a call is answered.
    #[serde(rename = "voice-answered-call-event")]
    AnsweredEvent,
}

impl HandlerKind {
    /// Configuration type name of this kind.
    pub const fn type_name(self) -> &'static str {
        match self {
            HandlerKind::Application => "voice-application",
            HandlerKind::Incoming => "voice-incoming-call",
            HandlerKind::Outgoing => "voice-call",
            HandlerKind::Digit => "voice-dtmf",
            HandlerKind::AnsweredEvent => "voice-answered-call-event",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}
