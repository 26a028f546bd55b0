//! # Outbound Callouts
//!
//! The request model for placing a call through the telephony platform. The
//! transport itself (HTTP, request signing) lives behind [`CalloutClient`];
//! this module only decides what to send.
//!
//! Parameters come from two places: the handler's configured defaults and the
//! notification that triggered the call. For each parameter the first *valid*
//! value wins, configuration first, so a flow can leave a field blank in the
//! editor and feed it from upstream instead.
//!
//! ```text
//! CallRequestDraft (config) --merge--> CallRequestDraft --resolve--> CallRequest --to_body--> CalloutBody
//!                              ^
//!              CallRequestDraft (overrides)
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use voxroute_core::{BoxError, CallId, CallNotification, CalloutError, HandlerId};

use crate::handler::ApplicationConfig;

/// Longest call a custom callout may keep open, in seconds.
pub const CONNECT_PSTN_MAX_DURATION: u32 = 14400;

/// What the callee hears once the call connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Text to speech.
    Text,
    /// Pre-recorded prompts.
    Prompts,
    /// A digit sequence.
    Dtmf,
    /// Markup evaluated when the call is answered.
    Svaml,
}

/// How the destination endpoint is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationType {
    /// A phone number in `+E.164` form.
    Number,
    /// A platform user name.
    Username,
}

/// Call parameters as configured or received, not yet validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallRequestDraft {
    /// Addressing scheme of the destination.
    pub destination_type: Option<DestinationType>,
    /// Who to call.
    pub destination_endpoint: Option<String>,
    /// Presented caller number.
    pub cli: Option<String>,
    /// What the callee hears.
    pub message_type: Option<MessageType>,
    /// Markup, for [`MessageType::Svaml`].
    pub svaml: Option<String>,
    /// Text, for [`MessageType::Text`].
    pub text: Option<String>,
    /// Prompts, for [`MessageType::Prompts`].
    pub prompts: Option<String>,
    /// Digits, for [`MessageType::Dtmf`].
    pub dtmf: Option<String>,
    /// Voice locale.
    pub locale: Option<String>,
}

fn non_empty(value: &String) -> bool {
    !value.is_empty()
}

fn phone_number(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("phone number cannot be an empty string".to_string());
    }
    if !value.starts_with('+') {
        return Err("phone number must start with a +".to_string());
    }
    Ok(())
}

fn valid_phone_number(value: &String) -> bool {
    phone_number(value).is_ok()
}

fn valid_json(value: &String) -> bool {
    serde_json::from_str::<Value>(value).is_ok()
}

/// Keep the first valid value, configuration first.
///
/// An invalid candidate is kept when nothing valid exists so that
/// [`CallRequestDraft::resolve`] can report why.
fn pick<T>(primary: Option<T>, fallback: Option<T>, valid: fn(&T) -> bool) -> Option<T> {
    match (primary, fallback) {
        (Some(p), Some(f)) if !valid(&p) && valid(&f) => Some(f),
        (p, f) => p.or(f),
    }
}

fn field<T: DeserializeOwned>(params: &Map<String, Value>, name: &str) -> Option<T> {
    params
        .get(name)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

impl CallRequestDraft {
    /// Read call parameters from a JSON object, skipping fields whose value
    /// has the wrong shape.
    pub fn from_params(params: &Map<String, Value>) -> Self {
        Self {
            destination_type: field(params, "destinationType"),
            destination_endpoint: field(params, "destinationEndpoint"),
            cli: field(params, "cli"),
            message_type: field(params, "messageType"),
            svaml: field(params, "svaml"),
            text: field(params, "text"),
            prompts: field(params, "prompts"),
            dtmf: field(params, "dtmf"),
            locale: field(params, "locale"),
        }
    }

    /// Call parameters carried by a notification: its own parameters first,
    /// then the fields of the callback it forwards.
    pub fn from_notification(notification: &CallNotification) -> Self {
        let own = Self::from_params(&notification.params);
        match notification
            .payload
            .as_ref()
            .and_then(|payload| serde_json::to_value(payload).ok())
        {
            Some(Value::Object(payload)) => own.merge(Self::from_params(&payload)),
            _ => own,
        }
    }

    /// Combine configured defaults with per-call overrides.
    ///
    /// Each field takes the first valid value, looking at `self` before
    /// `overrides`.
    pub fn merge(self, overrides: CallRequestDraft) -> Self {
        Self {
            destination_type: self.destination_type.or(overrides.destination_type),
            destination_endpoint: pick(
                self.destination_endpoint,
                overrides.destination_endpoint,
                valid_phone_number,
            ),
            cli: pick(self.cli, overrides.cli, valid_phone_number),
            message_type: self.message_type.or(overrides.message_type),
            svaml: pick(self.svaml, overrides.svaml, valid_json),
            text: pick(self.text, overrides.text, non_empty),
            prompts: pick(self.prompts, overrides.prompts, non_empty),
            dtmf: pick(self.dtmf, overrides.dtmf, non_empty),
            locale: pick(self.locale, overrides.locale, non_empty),
        }
    }

    /// Validate the draft into a request that can be sent.
    pub fn resolve(self) -> Result<CallRequest, CalloutError> {
        let destination_type = self.destination_type.ok_or(CalloutError::InvalidParam {
            param: "destinationType",
            reason: "is required".to_string(),
        })?;

        let destination_endpoint = self
            .destination_endpoint
            .ok_or_else(|| "is required".to_string())
            .and_then(|endpoint| phone_number(&endpoint).map(|()| endpoint))
            .map_err(|reason| CalloutError::InvalidParam {
                param: "destinationEndpoint",
                reason,
            })?;

        let cli = match self.cli {
            Some(cli) => match phone_number(&cli) {
                Ok(()) => Some(cli),
                Err(reason) => {
                    tracing::warn!(%cli, %reason, "dropping invalid cli");
                    None
                }
            },
            None => None,
        };

        let message_type = self.message_type.ok_or(CalloutError::InvalidParam {
            param: "messageType",
            reason: "is required".to_string(),
        })?;

        let markup = self
            .svaml
            .clone()
            .filter(|svaml| !svaml.is_empty() && valid_json(svaml));

        let required = |param: &'static str, value: Option<String>| {
            value
                .filter(|v| !v.is_empty())
                .ok_or(CalloutError::InvalidParam {
                    param,
                    reason: "is required".to_string(),
                })
        };

        let message = match message_type {
            MessageType::Text => CallMessage::Text(required("text", self.text)?),
            MessageType::Prompts => CallMessage::Prompts(required("prompts", self.prompts)?),
            MessageType::Dtmf => CallMessage::Dtmf(required("dtmf", self.dtmf)?),
            MessageType::Svaml => {
                let svaml = required("svaml", self.svaml)?;
                if !valid_json(&svaml) {
                    return Err(CalloutError::InvalidParam {
                        param: "svaml",
                        reason: "is not valid JSON".to_string(),
                    });
                }
                CallMessage::Svaml(svaml)
            }
        };

        Ok(CallRequest {
            destination_type,
            destination_endpoint,
            cli,
            message,
            markup,
            locale: self.locale.filter(|l| !l.is_empty()),
        })
    }
}

/// Message content of a validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallMessage {
    /// Text to speech.
    Text(String),
    /// Pre-recorded prompts.
    Prompts(String),
    /// A digit sequence.
    Dtmf(String),
    /// Markup handed back on the answered callback.
    Svaml(String),
}

/// A validated outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// Addressing scheme of the destination.
    pub destination_type: DestinationType,
    /// Who to call.
    pub destination_endpoint: String,
    /// Presented caller number.
    pub cli: Option<String>,
    /// What the callee hears.
    pub message: CallMessage,
    /// Markup served on the answered callback, whatever the message type.
    pub markup: Option<String>,
    /// Voice locale.
    pub locale: Option<String>,
}

impl CallRequest {
    /// Markup to store for the answered callback, if any.
    pub fn markup(&self) -> Option<&str> {
        self.markup.as_deref()
    }

    /// Whether the markup runs an interactive menu.
    ///
    /// Menus cannot be started from a text-to-speech callout, so these calls
    /// go out as custom callouts instead.
    pub fn runs_menu(&self) -> bool {
        match &self.message {
            CallMessage::Svaml(svaml) => svaml.to_lowercase().contains("runmenu"),
            _ => false,
        }
    }

    /// Build the platform request body. `custom` tags the call with the
    /// handler that placed it.
    pub fn to_body(&self, custom: &HandlerId) -> CalloutBody {
        if self.runs_menu() {
            return CalloutBody::CustomCallout {
                custom_callout: CustomCallout {
                    ice: self.connect_pstn_ice(),
                },
            };
        }

        let mut tts = TtsCallout {
            cli: self.cli.clone(),
            destination: Destination {
                kind: self.destination_type,
                endpoint: self.destination_endpoint.clone(),
            },
            custom: custom.to_string(),
            enable_ace: true,
            enable_dice: true,
            text: None,
            prompts: None,
            dtmf: None,
            locale: None,
        };
        match &self.message {
            CallMessage::Text(text) => {
                tts.text = Some(text.clone());
                tts.locale = self.locale.clone();
                tts.enable_ace = false;
            }
            CallMessage::Prompts(prompts) => {
                tts.prompts = Some(prompts.clone());
                tts.locale = self.locale.clone();
                tts.enable_ace = false;
            }
            CallMessage::Dtmf(dtmf) => {
                tts.dtmf = Some(dtmf.clone());
                tts.enable_ace = false;
            }
            // the platform requires some text; the markup is served on ace
            CallMessage::Svaml(_) => tts.text = Some(" ".to_string()),
        }
        CalloutBody::TtsCallout { tts_callout: tts }
    }

    fn connect_pstn_ice(&self) -> String {
        let mut action = Map::new();
        action.insert("name".into(), "connectPstn".into());
        action.insert("number".into(), self.destination_endpoint.clone().into());
        if let Some(cli) = &self.cli {
            action.insert("cli".into(), cli.clone().into());
        }
        action.insert("maxDuration".into(), CONNECT_PSTN_MAX_DURATION.into());
        action.insert("amd".into(), json!({ "enabled": false }));
        if let Some(locale) = &self.locale {
            action.insert("locale".into(), locale.clone().into());
        }
        json!({ "action": action }).to_string()
    }
}

/// Request body of the callouts endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method")]
pub enum CalloutBody {
    /// Text-to-speech (or markup) callout.
    #[serde(rename = "ttsCallout")]
    TtsCallout {
        /// Callout parameters.
        #[serde(rename = "ttsCallout")]
        tts_callout: TtsCallout,
    },
    /// Custom callout carrying its own ice answer.
    #[serde(rename = "customCallout")]
    CustomCallout {
        /// Callout parameters.
        #[serde(rename = "customCallout")]
        custom_callout: CustomCallout,
    },
}

/// Parameters of a text-to-speech callout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsCallout {
    /// Presented caller number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli: Option<String>,
    /// Who to call.
    pub destination: Destination,
    /// Opaque value echoed back on callbacks.
    pub custom: String,
    /// Request the answered callback.
    pub enable_ace: bool,
    /// Request the call-ended callback.
    pub enable_dice: bool,
    /// Spoken text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Prompts to play.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<String>,
    /// Digits to play.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtmf: Option<String>,
    /// Voice locale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// Callout destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    /// Addressing scheme.
    #[serde(rename = "type")]
    pub kind: DestinationType,
    /// Number or user name.
    pub endpoint: String,
}

/// Parameters of a custom callout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomCallout {
    /// Serialized answer to the call's ice, as a JSON string.
    pub ice: String,
}

/// Platform answer to a callout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalloutReply {
    /// Id of the new call.
    pub call_id: Option<CallId>,
    /// Set when the platform refused the request.
    pub error_code: Option<i64>,
    /// Human readable error.
    pub message: Option<String>,
}

/// Sends callout requests to the telephony platform.
#[async_trait]
pub trait CalloutClient: Send + Sync + 'static {
    /// Post `body` signed with `credentials`.
    ///
    /// An error means no platform answer was received; platform refusals come
    /// back as a [`CalloutReply`] with an error code.
    async fn callout(
        &self,
        credentials: &ApplicationConfig,
        body: &CalloutBody,
    ) -> Result<CalloutReply, BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(message_type: MessageType) -> CallRequestDraft {
        CallRequestDraft {
            destination_type: Some(DestinationType::Number),
            destination_endpoint: Some("+15550001".to_string()),
            message_type: Some(message_type),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_prefers_valid_config_value() {
        let config = CallRequestDraft {
            destination_endpoint: Some("+15550001".to_string()),
            text: Some(String::new()),
            ..Default::default()
        };
        let overrides = CallRequestDraft {
            destination_endpoint: Some("+15550002".to_string()),
            text: Some("hello".to_string()),
            ..Default::default()
        };

        let merged = config.merge(overrides);

        assert_eq!(merged.destination_endpoint.as_deref(), Some("+15550001"));
        assert_eq!(merged.text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_merge_skips_invalid_config_number() {
        let config = CallRequestDraft {
            destination_endpoint: Some("15550001".to_string()),
            ..Default::default()
        };
        let overrides = CallRequestDraft {
            destination_endpoint: Some("+15550002".to_string()),
            ..Default::default()
        };

        let merged = config.merge(overrides);
        assert_eq!(merged.destination_endpoint.as_deref(), Some("+15550002"));
    }

    #[test]
    fn test_resolve_rejects_number_without_plus() {
        let mut request = draft(MessageType::Text);
        request.destination_endpoint = Some("15550001".to_string());
        request.text = Some("hi".to_string());

        let err = request.resolve().unwrap_err();
        assert!(matches!(
            err,
            CalloutError::InvalidParam {
                param: "destinationEndpoint",
                ..
            }
        ));
        assert!(err.to_string().contains("must start with a +"));
    }

    #[test]
    fn test_resolve_requires_message_content() {
        let err = draft(MessageType::Prompts).resolve().unwrap_err();
        assert!(matches!(
            err,
            CalloutError::InvalidParam {
                param: "prompts",
                ..
            }
        ));
    }

    #[test]
    fn test_resolve_drops_invalid_cli() {
        let mut request = draft(MessageType::Dtmf);
        request.dtmf = Some("1234".to_string());
        request.cli = Some("0046".to_string());

        let resolved = request.resolve().unwrap();
        assert_eq!(resolved.cli, None);
    }

    #[test]
    fn test_text_callout_disables_ace() {
        let mut request = draft(MessageType::Text);
        request.text = Some("hello".to_string());
        request.locale = Some("en-US".to_string());
        request.cli = Some("+46700000000".to_string());

        let body = request.resolve().unwrap().to_body(&HandlerId::from("call-1"));
        let wire = serde_json::to_value(&body).unwrap();

        assert_eq!(
            wire,
            json!({
                "method": "ttsCallout",
                "ttsCallout": {
                    "cli": "+46700000000",
                    "destination": { "type": "number", "endpoint": "+15550001" },
                    "custom": "call-1",
                    "enableAce": false,
                    "enableDice": true,
                    "text": "hello",
                    "locale": "en-US"
                }
            })
        );
    }

    #[test]
    fn test_svaml_callout_keeps_ace_and_stores_markup() {
        let mut request = draft(MessageType::Svaml);
        request.svaml = Some(r#"{"action":{"name":"hangup"}}"#.to_string());

        let resolved = request.resolve().unwrap();
        assert_eq!(resolved.markup(), Some(r#"{"action":{"name":"hangup"}}"#));

        match resolved.to_body(&HandlerId::from("call-1")) {
            CalloutBody::TtsCallout { tts_callout } => {
                assert!(tts_callout.enable_ace);
                assert_eq!(tts_callout.text.as_deref(), Some(" "));
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn test_menu_markup_uses_custom_callout() {
        let mut request = draft(MessageType::Svaml);
        request.svaml = Some(r#"{"action":{"name":"RunMenu"}}"#.to_string());
        request.locale = Some("en-US".to_string());

        let body = request.resolve().unwrap().to_body(&HandlerId::from("call-1"));
        let CalloutBody::CustomCallout { custom_callout } = body else {
            panic!("expected custom callout");
        };
        let ice: Value = serde_json::from_str(&custom_callout.ice).unwrap();

        assert_eq!(ice["action"]["name"], "connectPstn");
        assert_eq!(ice["action"]["number"], "+15550001");
        assert_eq!(ice["action"]["maxDuration"], 14400);
        assert_eq!(ice["action"]["amd"]["enabled"], false);
        assert!(ice["action"].get("cli").is_none());
    }

    #[test]
    fn test_reply_parses_error() {
        let reply: CalloutReply =
            serde_json::from_str(r#"{"errorCode":40003,"message":"Invalid number"}"#).unwrap();
        assert_eq!(reply.error_code, Some(40003));
        assert_eq!(reply.call_id, None);
    }

    #[test]
    fn test_markup_is_kept_for_any_message_type() {
        let mut request = draft(MessageType::Text);
        request.text = Some("hello".to_string());
        request.svaml = Some(r#"{"action":{"name":"runMenu"}}"#.to_string());

        let resolved = request.resolve().unwrap();
        assert_eq!(resolved.markup(), Some(r#"{"action":{"name":"runMenu"}}"#));
        // only markup messages turn into custom callouts
        assert!(!resolved.runs_menu());
        assert!(matches!(
            resolved.to_body(&HandlerId::from("call-1")),
            CalloutBody::TtsCallout { .. }
        ));

        let mut broken = draft(MessageType::Dtmf);
        broken.dtmf = Some("12".to_string());
        broken.svaml = Some("<not json>".to_string());
        assert_eq!(broken.resolve().unwrap().markup(), None);
    }

    #[test]
    fn test_params_skip_malformed_fields() {
        let params = json!({
            "destinationType": "fax",
            "destinationEndpoint": "+15550003",
            "messageType": "text",
            "text": 42,
            "locale": "sv-SE"
        });
        let Value::Object(params) = params else {
            unreachable!()
        };

        let parsed = CallRequestDraft::from_params(&params);
        assert_eq!(parsed.destination_type, None);
        assert_eq!(parsed.destination_endpoint.as_deref(), Some("+15550003"));
        assert_eq!(parsed.message_type, Some(MessageType::Text));
        assert_eq!(parsed.text, None);
        assert_eq!(parsed.locale.as_deref(), Some("sv-SE"));
    }

    #[test]
    fn test_notification_params_come_before_payload() {
        use voxroute_core::{CallEvent, IceEvent};

        let ice = CallEvent::Ice(IceEvent {
            callid: CallId::from("c-1"),
            cli: Some("+15550009".to_string()),
            to: None,
            extra: Map::new(),
        });
        let notification =
            CallNotification::new(HandlerId::from("in-1"), None, Some(ice))
                .with_param("destinationEndpoint", "+15550004")
                .with_param("cli", "0046");

        let parsed = CallRequestDraft::from_notification(&notification);
        assert_eq!(parsed.destination_endpoint.as_deref(), Some("+15550004"));
        // the message's invalid cli gives way to the forwarded caller's number
        assert_eq!(parsed.cli.as_deref(), Some("+15550009"));
    }
}
