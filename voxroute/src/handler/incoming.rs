use serde::Deserialize;
use voxroute_core::{
    CallEvent, CallNotification, Endpoint, HandlerId, HandlerKind, SessionStore, StoreError,
    VoiceCall,
};

use super::{CallSession, HandlerCore, HandlerStatus};
use crate::outlet::Outlet;

/// Static configuration of an [`IncomingCall`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IncomingConfig {
    /// Number (or other endpoint) this instance answers for.
    pub endpoint: String,
    /// Markup answered to the platform, if the flow provides it up front.
    #[serde(default)]
    pub svaml: Option<String>,
}

/// Receives calls placed to one endpoint.
///
/// Selected by the dialed destination rather than by call id. After taking a
/// call it marks itself bound so the call-ended callback can find it.
#[derive(Debug)]
pub struct IncomingCall {
    core: HandlerCore,
    config: IncomingConfig,
    outlet: Outlet,
}

impl IncomingCall {
    /// Create an incoming call receiver.
    pub fn new(id: impl Into<HandlerId>, config: IncomingConfig, session: SessionStore) -> Self {
        Self {
            core: HandlerCore::new(id.into(), HandlerKind::Incoming, session),
            config,
            outlet: Outlet::new("incoming"),
        }
    }

    /// Static configuration.
    pub fn config(&self) -> &IncomingConfig {
        &self.config
    }

    /// Port receiving accepted calls.
    pub fn outlet(&self) -> &Outlet {
        &self.outlet
    }

    /// Whether this instance answers calls to `to`.
    pub fn matches_endpoint(&self, to: Option<&Endpoint>) -> bool {
        to.is_some_and(|to| to.endpoint == self.config.endpoint)
    }

    /// Configured markup; an empty string means none.
    pub fn markup(&self) -> Option<String> {
        self.config.svaml.clone().filter(|svaml| !svaml.is_empty())
    }

    /// Forward a callback for a call this instance received.
    pub async fn proxy_event(&self, event: &CallEvent) -> Result<(), StoreError> {
        match event {
            CallEvent::Ice(ice) => {
                self.outlet
                    .emit(&CallNotification::new(
                        self.core.id().clone(),
                        Some(VoiceCall::from_event(event)),
                        Some(event.clone()),
                    ))
                    .await;
                self.core.set_status(HandlerStatus::Ongoing);
                self.core.session().mark_call_id(&ice.callid).await
            }
            CallEvent::Dice(dice) => {
                self.core.set_status(HandlerStatus::Closed);
                self.core.session().clear_call_id(&dice.callid).await
            }
            CallEvent::Ace(_) | CallEvent::Pie(_) => {
                tracing::debug!(
                    handler = %self.core.id(),
                    event = %event.kind(),
                    "incoming call ignores event"
                );
                Ok(())
            }
        }
    }
}

impl CallSession for IncomingCall {
    fn core(&self) -> &HandlerCore {
        &self.core
    }
}
