//! Callback event model.
//!
//! The platform posts one JSON document per lifecycle step of a call. The
//! `event` field selects the variant; everything the engine does not read is
//! kept in `extra` so downstream consumers still see the full callback.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::store::MARKUP_SUFFIX;

/// Opaque platform identifier correlating all events of one call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// Wrap a platform call identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store key of the markup mailbox for this call.
    pub fn markup_key(&self) -> String {
        format!("{}{}", self.0, MARKUP_SUFFIX)
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CallId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for CallId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Discriminant of a [`CallEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Incoming call event.
    Ice,
    /// Answered call event.
    Ace,
    /// Prompt input (digit result) event.
    Pie,
    /// Disconnected call event.
    Dice,
}

impl EventKind {
    /// Wire name of the discriminant.
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::Ice => "ice",
            EventKind::Ace => "ace",
            EventKind::Pie => "pie",
            EventKind::Dice => "dice",
        }
    }

    /// Parse a wire discriminant.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "ice" => Some(EventKind::Ice),
            "ace" => Some(EventKind::Ace),
            "pie" => Some(EventKind::Pie),
            "dice" => Some(EventKind::Dice),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An endpoint (number, username, sip address) as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Endpoint type, e.g. `number` or `username`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// The endpoint address.
    pub endpoint: String,
}

impl Endpoint {
    /// A phone number endpoint.
    pub fn number(endpoint: impl Into<String>) -> Self {
        Self {
            kind: Some("number".to_string()),
            endpoint: endpoint.into(),
        }
    }
}

/// Incoming call event (`ice`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceEvent {
    /// Call identifier.
    pub callid: CallId,
    /// Caller line identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli: Option<String>,
    /// Dialed destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Endpoint>,
    /// Fields not interpreted by the engine.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Answered call event (`ace`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AceEvent {
    /// Call identifier.
    pub callid: CallId,
    /// Fields not interpreted by the engine.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The option a caller picked in a menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuResult {
    /// Result type, e.g. `sequence` or `return`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Selected action value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Menu the result belongs to.
    #[serde(rename = "menuId", default, skip_serializing_if = "Option::is_none")]
    pub menu_id: Option<String>,
}

/// Prompt input event (`pie`), sent after the caller answered a menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieEvent {
    /// Call identifier.
    pub callid: CallId,
    /// Caller line identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli: Option<String>,
    /// Dialed destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Endpoint>,
    /// Menu outcome.
    #[serde(rename = "menuResult", default, skip_serializing_if = "Option::is_none")]
    pub menu_result: Option<MenuResult>,
    /// Fields not interpreted by the engine.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PieEvent {
    /// The action value selected by the caller, if any.
    pub fn action(&self) -> Option<&str> {
        self.menu_result.as_ref()?.value.as_deref()
    }
}

/// How a call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallResult {
    /// The callee picked up.
    Answered,
    /// The callee was busy or rejected.
    Busy,
    /// Nobody picked up.
    NoAnswer,
    /// The call could not be established.
    Failed,
    /// Any value this engine does not classify.
    #[serde(other)]
    Unknown,
}

/// Why a call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallReason {
    /// The callee hung up.
    CalleeHangup,
    /// The caller (the application) hung up.
    CallerHangup,
    /// The call manager terminated the call.
    ManagerHangup,
    /// The call timed out.
    Timeout,
    /// The call was cancelled.
    Cancel,
    /// Any value this engine does not classify.
    #[serde(other)]
    Unknown,
}

/// Disconnected call event (`dice`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiceEvent {
    /// Call identifier.
    pub callid: CallId,
    /// Termination result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CallResult>,
    /// Termination reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<CallReason>,
    /// Fields not interpreted by the engine.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A lifecycle callback for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum CallEvent {
    /// Incoming call.
    Ice(IceEvent),
    /// Call answered.
    Ace(AceEvent),
    /// Digit result.
    Pie(PieEvent),
    /// Call ended.
    Dice(DiceEvent),
}

impl CallEvent {
    /// Discriminant of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            CallEvent::Ice(_) => EventKind::Ice,
            CallEvent::Ace(_) => EventKind::Ace,
            CallEvent::Pie(_) => EventKind::Pie,
            CallEvent::Dice(_) => EventKind::Dice,
        }
    }

    /// The call this event belongs to.
    pub fn call_id(&self) -> &CallId {
        match self {
            CallEvent::Ice(e) => &e.callid,
            CallEvent::Ace(e) => &e.callid,
            CallEvent::Pie(e) => &e.callid,
            CallEvent::Dice(e) => &e.callid,
        }
    }

    /// Caller line identity, for the events that carry one.
    pub fn cli(&self) -> Option<&str> {
        match self {
            CallEvent::Ice(e) => e.cli.as_deref(),
            CallEvent::Pie(e) => e.cli.as_deref(),
            CallEvent::Ace(_) | CallEvent::Dice(_) => None,
        }
    }

    /// Destination endpoint, for the events that carry one.
    pub fn to(&self) -> Option<&Endpoint> {
        match self {
            CallEvent::Ice(e) => e.to.as_ref(),
            CallEvent::Pie(e) => e.to.as_ref(),
            CallEvent::Ace(_) | CallEvent::Dice(_) => None,
        }
    }
}

/// A decoded callback body.
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    /// One of the lifecycle events the engine routes.
    Event(CallEvent),
    /// A well-formed callback with a discriminant the engine does not route.
    Unrecognized(String),
}

impl Callback {
    /// Decode a callback body.
    ///
    /// Bodies without a string `event` field are rejected.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        let name = match value.get("event").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => {
                return Err(<serde_json::Error as serde::de::Error>::missing_field(
                    "event",
                ));
            }
        };
        if EventKind::from_wire(&name).is_none() {
            return Ok(Callback::Unrecognized(name));
        }
        serde_json::from_value(value).map(Callback::Event)
    }
}
