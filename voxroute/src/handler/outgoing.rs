use serde::Deserialize;
use std::{fmt, sync::Arc};
use voxroute_core::{
    BoxError, CallEvent, CallId, CallNotification, CallReason, CallResult, CalloutError,
    HandlerId, HandlerKind, Hook, HookResult, SessionStore, StoreError, VoiceCall,
};

use super::{Application, CallSession, HandlerCore, HandlerStatus};
use crate::{
    callout::{CallRequestDraft, CalloutClient},
    outlet::Outlet,
};

/// Static configuration of an [`OutgoingCall`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OutgoingConfig {
    /// Id of the application whose credentials sign the callout.
    #[serde(default)]
    pub application: String,
    /// Default call parameters.
    #[serde(flatten)]
    pub defaults: CallRequestDraft,
}

/// Which port a finished call leaves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The call ran to its natural end.
    Success,
    /// The call never connected or the callee cut it short.
    Failure,
}

/// How an outbound call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termination {
    /// Port to forward to.
    pub outcome: Outcome,
    /// Status to show.
    pub status: HandlerStatus,
}

/// Classify the `(result, reason)` pair of a call-ended callback.
///
/// Returns `None` for pairs that carry no verdict. The platform follows a
/// callee hang-up with a caller hang-up; by then the binding is gone, so the
/// second callback never reaches this function for the same call.
pub fn classify_termination(
    result: Option<CallResult>,
    reason: Option<CallReason>,
) -> Option<Termination> {
    let (outcome, status) = match (result?, reason) {
        (CallResult::NoAnswer, _) => (Outcome::Failure, HandlerStatus::NoAnswer),
        (CallResult::Busy, _) => (Outcome::Failure, HandlerStatus::Busy),
        (CallResult::Failed, _) => (Outcome::Failure, HandlerStatus::Failed),
        (CallResult::Answered, Some(CallReason::CalleeHangup)) => {
            (Outcome::Failure, HandlerStatus::CalleeHangup)
        }
        (CallResult::Answered, Some(CallReason::CallerHangup)) => {
            (Outcome::Success, HandlerStatus::Closed)
        }
        (CallResult::Answered, Some(CallReason::ManagerHangup)) => {
            (Outcome::Success, HandlerStatus::ClosedByManager)
        }
        _ => return None,
    };
    Some(Termination { outcome, status })
}

/// Places calls and follows them until they end.
pub struct OutgoingCall {
    core: HandlerCore,
    config: OutgoingConfig,
    application: Arc<Application>,
    client: Arc<dyn CalloutClient>,
    success: Outlet,
    failure: Outlet,
}

impl fmt::Debug for OutgoingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutgoingCall")
            .field("core", &self.core)
            .field("config", &self.config)
            .field("application", self.application.id())
            .field("success", &self.success)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

impl OutgoingCall {
    /// Create a call originator signing with `application`'s credentials.
    pub fn new(
        id: impl Into<HandlerId>,
        config: OutgoingConfig,
        application: Arc<Application>,
        client: Arc<dyn CalloutClient>,
        session: SessionStore,
    ) -> Self {
        Self {
            core: HandlerCore::new(id.into(), HandlerKind::Outgoing, session),
            config,
            application,
            client,
            success: Outlet::new("success"),
            failure: Outlet::new("failure"),
        }
    }

    /// Static configuration.
    pub fn config(&self) -> &OutgoingConfig {
        &self.config
    }

    /// Port for answered calls and natural endings.
    pub fn success(&self) -> &Outlet {
        &self.success
    }

    /// Port for calls that failed or were cut short.
    pub fn failure(&self) -> &Outlet {
        &self.failure
    }

    /// Place a call, filling gaps in the configured defaults from `overrides`.
    ///
    /// On success the new call is bound to this handler and its markup (if
    /// any) is kept for the answered callback.
    pub async fn place_call(&self, overrides: CallRequestDraft) -> Result<CallId, CalloutError> {
        let credentials = self
            .application
            .credentials()
            .inspect_err(|err| self.misconfigured(err))?;
        let request = self
            .config
            .defaults
            .clone()
            .merge(overrides)
            .resolve()
            .inspect_err(|err| self.misconfigured(err))?;
        let body = request.to_body(self.core.id());

        self.core.set_status(HandlerStatus::Calling);
        tracing::debug!(handler = %self.core.id(), ?body, "placing callout");

        let reply = match self.client.callout(credentials, &body).await {
            Ok(reply) => reply,
            Err(source) => {
                tracing::error!(handler = %self.core.id(), error = %source, "callout failed");
                self.core.set_status(HandlerStatus::NetworkError);
                return Err(CalloutError::Transport(source));
            }
        };

        if let Some(code) = reply.error_code.filter(|code| *code != 0) {
            let message = reply.message.unwrap_or_default();
            tracing::error!(handler = %self.core.id(), code, %message, "callout rejected");
            self.core.set_status(HandlerStatus::Rejected(message.clone()));
            return Err(CalloutError::Rejected { code, message });
        }
        let Some(call_id) = reply.call_id else {
            let message = "reply carries no call id".to_string();
            self.core.set_status(HandlerStatus::Rejected(message.clone()));
            return Err(CalloutError::Rejected { code: 0, message });
        };

        let session = self.core.session();
        if let Some(svaml) = request.markup() {
            session.set_markup(&call_id, svaml).await?;
        }
        session.mark_call_id(&call_id).await?;
        tracing::info!(handler = %self.core.id(), %call_id, "call placed");
        Ok(call_id)
    }

    fn misconfigured(&self, err: &CalloutError) {
        tracing::error!(handler = %self.core.id(), error = %err, "cannot place call");
        self.core
            .set_status(HandlerStatus::Misconfigured(err.to_string()));
    }

    /// Consume the markup stored for `call_id`.
    pub async fn take_markup(&self, call_id: &CallId) -> Result<Option<String>, StoreError> {
        self.core.session().take_markup(call_id).await
    }

    /// Forward a callback for a call this instance placed.
    pub async fn proxy_event(&self, event: &CallEvent) -> Result<(), StoreError> {
        match event {
            CallEvent::Ace(ace) => {
                self.core.set_status(HandlerStatus::Ongoing);
                self.success
                    .emit(&CallNotification::new(
                        self.core.id().clone(),
                        Some(VoiceCall::bare(ace.callid.clone())),
                        None,
                    ))
                    .await;
                Ok(())
            }
            CallEvent::Dice(dice) => {
                self.core.session().clear_call_id(&dice.callid).await?;

                let Some(termination) = classify_termination(dice.result, dice.reason) else {
                    tracing::debug!(
                        handler = %self.core.id(),
                        call_id = %dice.callid,
                        result = ?dice.result,
                        reason = ?dice.reason,
                        "call ended without verdict"
                    );
                    return Ok(());
                };
                self.core.set_status(termination.status);

                let outlet = match termination.outcome {
                    Outcome::Success => &self.success,
                    Outcome::Failure => &self.failure,
                };
                outlet
                    .emit(&CallNotification::new(
                        self.core.id().clone(),
                        None,
                        Some(event.clone()),
                    ))
                    .await;
                Ok(())
            }
            CallEvent::Ice(_) | CallEvent::Pie(_) => Ok(()),
        }
    }
}

impl CallSession for OutgoingCall {
    fn core(&self) -> &HandlerCore {
        &self.core
    }
}

impl OutgoingCall {
    /// A hook that places a call for every notification it receives, taking
    /// missing parameters from the notification.
    pub fn input(self: &Arc<Self>) -> OutgoingInput {
        OutgoingInput(self.clone())
    }
}

/// Upstream connection into an [`OutgoingCall`].
pub struct OutgoingInput(Arc<OutgoingCall>);

impl Hook<CallNotification> for OutgoingInput {
    async fn on_event(&self, event: &CallNotification) -> Result<HookResult, BoxError> {
        self.0
            .place_call(CallRequestDraft::from_notification(event))
            .await?;
        Ok(HookResult::Next)
    }
}
