//! Notifications emitted to downstream consumers.

use crate::{
    event::{CallEvent, CallId, Endpoint},
    kind::HandlerId,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// The call a notification is about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCall {
    /// Call identifier; downstream consumers hand it back to bind the call.
    pub call_id: CallId,
    /// Caller line identity.
    pub from: Option<String>,
    /// Dialed destination.
    pub to: Option<Endpoint>,
    /// The callback that produced this notification.
    pub raw: Option<CallEvent>,
}

impl VoiceCall {
    /// Call details taken from a callback.
    pub fn from_event(event: &CallEvent) -> Self {
        Self {
            call_id: event.call_id().clone(),
            from: event.cli().map(str::to_string),
            to: event.to().cloned(),
            raw: Some(event.clone()),
        }
    }

    /// Only the call identifier, for calls the platform already has markup for.
    pub fn bare(call_id: CallId) -> Self {
        Self {
            call_id,
            from: None,
            to: None,
            raw: None,
        }
    }
}

/// A message a handler forwards downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallNotification {
    /// Handler that emitted the notification.
    pub source: HandlerId,
    /// Call details, absent for termination reports.
    pub voice_call: Option<VoiceCall>,
    /// The callback, when forwarded as is.
    pub payload: Option<CallEvent>,
    /// Per-message parameters for the receiving handler, such as `svaml` or
    /// call request fields. They take effect where the handler's own
    /// configuration leaves a gap.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl CallNotification {
    /// A notification without parameters.
    pub fn new(
        source: HandlerId,
        voice_call: Option<VoiceCall>,
        payload: Option<CallEvent>,
    ) -> Self {
        Self {
            source,
            voice_call,
            payload,
            params: Map::new(),
        }
    }

    /// Attach a parameter, replacing any previous value under `name`.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// A parameter carried by the message itself.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Markup carried by the message, if it is a non-empty string.
    pub fn svaml(&self) -> Option<&str> {
        self.param("svaml")
            .and_then(Value::as_str)
            .filter(|svaml| !svaml.is_empty())
    }

    /// Call identifier of the notification, whichever part carries it.
    pub fn call_id(&self) -> Option<&CallId> {
        self.voice_call
            .as_ref()
            .map(|call| &call.call_id)
            .or_else(|| self.payload.as_ref().map(CallEvent::call_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svaml_param() {
        let notification = CallNotification::new(
            HandlerId::from("in-1"),
            Some(VoiceCall::bare(CallId::from("c-1"))),
            None,
        );
        assert_eq!(notification.svaml(), None);

        let blank = notification.clone().with_param("svaml", "");
        assert_eq!(blank.svaml(), None);

        let numeric = notification.clone().with_param("svaml", 7);
        assert_eq!(numeric.svaml(), None);
        assert_eq!(numeric.param("svaml"), Some(&Value::from(7)));

        let menu = notification.with_param("svaml", "<menu/>");
        assert_eq!(menu.svaml(), Some("<menu/>"));
        assert_eq!(menu.call_id(), Some(&CallId::from("c-1")));
    }

    #[test]
    fn test_empty_params_are_not_serialized() {
        let notification = CallNotification::new(HandlerId::from("in-1"), None, None);
        let json = serde_json::to_value(&notification).unwrap();
        assert!(json.get("params").is_none());

        let json = serde_json::to_value(notification.with_param("text", "hi")).unwrap();
        assert_eq!(json["params"]["text"], "hi");
    }
}
