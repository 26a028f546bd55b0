use serde::Deserialize;
use std::sync::Arc;
use voxroute_core::{
    BoxError, CallEvent, CallId, CallNotification, HandlerId, HandlerKind, Hook, HookResult,
    SessionStore, StoreError, VoiceCall,
};

use super::{CallSession, HandlerCore, HandlerStatus};
use crate::outlet::Outlet;

/// Static configuration of an [`AnsweredCallEvent`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnsweredConfig {
    /// Markup used when the input does not carry its own.
    #[serde(default)]
    pub svaml: Option<String>,
}

/// Supplies markup for a call after the flow decided how to continue it.
///
/// A flow connects this handler downstream of an incoming or outgoing call;
/// when the call reaches it, it stores the markup and binds the call so the
/// pending callback (or the next answered callback) can pick the markup up.
#[derive(Debug)]
pub struct AnsweredCallEvent {
    core: HandlerCore,
    config: AnsweredConfig,
    outlet: Outlet,
}

impl AnsweredCallEvent {
    /// Create an answered call markup supplier.
    pub fn new(id: impl Into<HandlerId>, config: AnsweredConfig, session: SessionStore) -> Self {
        Self {
            core: HandlerCore::new(id.into(), HandlerKind::AnsweredEvent, session),
            config,
            outlet: Outlet::new("answered"),
        }
    }

    /// Static configuration.
    pub fn config(&self) -> &AnsweredConfig {
        &self.config
    }

    /// Port receiving the callbacks this instance is bound to.
    pub fn outlet(&self) -> &Outlet {
        &self.outlet
    }

    /// Store markup for `call_id` and bind the call.
    ///
    /// `markup` overrides the configured default. With neither, any unread
    /// markup left for the call is dropped.
    pub async fn accept(&self, call_id: &CallId, markup: Option<&str>) -> Result<(), StoreError> {
        let session = self.core.session();
        match markup
            .filter(|svaml| !svaml.is_empty())
            .or(self.config.svaml.as_deref())
        {
            Some(svaml) if !svaml.is_empty() => session.set_markup(call_id, svaml).await?,
            _ => session.clear_markup(call_id).await?,
        }
        session.mark_call_id(call_id).await
    }

    /// Consume the markup stored for `call_id`.
    pub async fn take_markup(&self, call_id: &CallId) -> Result<Option<String>, StoreError> {
        self.core.session().take_markup(call_id).await
    }

    /// Read the markup stored for `call_id`, leaving it in place.
    pub async fn peek_markup(&self, call_id: &CallId) -> Result<Option<String>, StoreError> {
        self.core.session().peek_markup(call_id).await
    }

    /// Forward a callback for a call this instance is bound to.
    ///
    /// The dispatcher only routes answered and ended callbacks here. An
    /// incoming callback is accepted as well, for hosts that route it to a
    /// supplier themselves.
    pub async fn proxy_event(&self, event: &CallEvent) -> Result<(), StoreError> {
        match event {
            CallEvent::Ice(_) | CallEvent::Ace(_) => {
                self.outlet
                    .emit(&CallNotification::new(
                        self.core.id().clone(),
                        Some(VoiceCall::from_event(event)),
                        Some(event.clone()),
                    ))
                    .await;
                self.core.set_status(HandlerStatus::Ongoing);
                self.core.session().mark_call_id(event.call_id()).await
            }
            CallEvent::Dice(dice) => {
                self.core.set_status(HandlerStatus::Closed);
                self.core.session().clear_call_id(&dice.callid).await
            }
            CallEvent::Pie(_) => Ok(()),
        }
    }

    /// A hook that binds every call it is notified about, with the markup the
    /// notification carries or else the default.
    pub fn input(self: &Arc<Self>) -> AnsweredInput {
        AnsweredInput(self.clone())
    }
}

impl CallSession for AnsweredCallEvent {
    fn core(&self) -> &HandlerCore {
        &self.core
    }
}

/// Upstream connection into an [`AnsweredCallEvent`].
pub struct AnsweredInput(Arc<AnsweredCallEvent>);

impl Hook<CallNotification> for AnsweredInput {
    async fn on_event(&self, event: &CallNotification) -> Result<HookResult, BoxError> {
        if let Some(call) = &event.voice_call {
            self.0.accept(&call.call_id, event.svaml()).await?;
        }
        Ok(HookResult::Next)
    }
}
