//! # Call Handlers
//!
//! The participants of a call lifecycle. Each configured instance owns an
//! isolated [`SessionStore`] and juggles the state of many calls at once,
//! keyed by call id:
//!
//! ```text
//! Idle --mark--> Bound (optionally holding unread markup) --clear--> Idle
//! ```
//!
//! | Kind | owns a call when | markup source |
//! |---|---|---|
//! | [`IncomingCall`] | its endpoint is the dialed destination | static configuration |
//! | [`OutgoingCall`] | it placed the call | stored when the call was placed |
//! | [`DtmfMenu`] | bound and its action is the one selected | stored on input |
//! | [`AnsweredCallEvent`] | bound | stored on input |
//!
//! [`Application`] is the coordinating instance; it owns no calls.

mod answered;
mod application;
mod dtmf;
mod incoming;
mod outgoing;

pub use answered::{AnsweredCallEvent, AnsweredConfig, AnsweredInput};
pub use application::{Application, ApplicationConfig};
pub use dtmf::{DtmfConfig, DtmfInput, DtmfMenu};
pub use incoming::{IncomingCall, IncomingConfig};
pub use outgoing::{
    OutgoingCall, OutgoingConfig, OutgoingInput, Outcome, Termination, classify_termination,
};

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};
use voxroute_core::{CallEvent, CallId, HandlerId, HandlerKind, SessionStore, StoreError};

/// Presentation status of a handler instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HandlerStatus {
    /// Nothing happened yet.
    #[default]
    Idle,
    /// An outbound call was requested.
    Calling,
    /// A call is in progress.
    Ongoing,
    /// The call ended normally.
    Closed,
    /// The call manager ended the call.
    ClosedByManager,
    /// The callee did not pick up.
    NoAnswer,
    /// The callee was busy or rejected the call.
    Busy,
    /// The call could not be established.
    Failed,
    /// The callee hung up before the flow finished.
    CalleeHangup,
    /// The platform refused the callout.
    Rejected(String),
    /// The callout request never got an answer.
    NetworkError,
    /// The handler cannot run with its configuration.
    Misconfigured(String),
}

impl fmt::Display for HandlerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerStatus::Idle => f.write_str("idle"),
            HandlerStatus::Calling => f.write_str("calling"),
            HandlerStatus::Ongoing => f.write_str("ongoing"),
            HandlerStatus::Closed => f.write_str("closed"),
            HandlerStatus::ClosedByManager => f.write_str("closed by mngr"),
            HandlerStatus::NoAnswer => f.write_str("no answer"),
            HandlerStatus::Busy => f.write_str("busy"),
            HandlerStatus::Failed => f.write_str("failed"),
            HandlerStatus::CalleeHangup => f.write_str("callee hang-up"),
            HandlerStatus::Rejected(message) => write!(f, "rejected: {message}"),
            HandlerStatus::NetworkError => f.write_str("network error"),
            HandlerStatus::Misconfigured(reason) => write!(f, "misconfigured: {reason}"),
        }
    }
}

/// State every call-owning handler is composed of.
#[derive(Debug)]
pub struct HandlerCore {
    id: HandlerId,
    kind: HandlerKind,
    session: SessionStore,
    status: RwLock<HandlerStatus>,
}

impl HandlerCore {
    pub(crate) fn new(id: HandlerId, kind: HandlerKind, session: SessionStore) -> Self {
        Self {
            id,
            kind,
            session,
            status: RwLock::new(HandlerStatus::Idle),
        }
    }

    /// Instance identity.
    pub fn id(&self) -> &HandlerId {
        &self.id
    }

    /// Instance kind.
    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    /// The instance's store.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Current status.
    pub fn status(&self) -> HandlerStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_status(&self, status: HandlerStatus) {
        tracing::info!(handler = %self.id, kind = %self.kind, %status, "status changed");
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }
}

/// A handler that can be bound to calls.
pub trait CallSession: Send + Sync + 'static {
    /// Shared handler state.
    fn core(&self) -> &HandlerCore;
}

/// Return the first handler bound to `call_id`, in the given order.
pub(crate) async fn first_bound<H: CallSession>(
    handlers: impl IntoIterator<Item = Arc<H>>,
    call_id: &CallId,
) -> Result<Option<Arc<H>>, StoreError> {
    for handler in handlers {
        if handler.core().session().has_call_id(call_id).await? {
            return Ok(Some(handler));
        }
    }
    Ok(None)
}

/// Clear `call_id` on every handler bound to it, returning how many were.
pub(crate) async fn clear_bound<H: CallSession>(
    handlers: impl IntoIterator<Item = Arc<H>>,
    call_id: &CallId,
) -> Result<usize, StoreError> {
    let mut cleared = 0;
    for handler in handlers {
        let session = handler.core().session();
        if session.has_call_id(call_id).await? {
            session.clear_call_id(call_id).await?;
            cleared += 1;
        }
    }
    Ok(cleared)
}

/// One configured handler instance of any kind.
#[derive(Debug, Clone)]
pub enum HandlerInstance {
    /// Coordinating application.
    Application(Arc<Application>),
    /// Incoming call receiver.
    Incoming(Arc<IncomingCall>),
    /// Call originator.
    Outgoing(Arc<OutgoingCall>),
    /// Digit menu action.
    Dtmf(Arc<DtmfMenu>),
    /// Answered call markup supplier.
    AnsweredEvent(Arc<AnsweredCallEvent>),
}

impl HandlerInstance {
    /// Instance identity.
    pub fn id(&self) -> &HandlerId {
        match self {
            HandlerInstance::Application(h) => h.id(),
            HandlerInstance::Incoming(h) => h.core().id(),
            HandlerInstance::Outgoing(h) => h.core().id(),
            HandlerInstance::Dtmf(h) => h.core().id(),
            HandlerInstance::AnsweredEvent(h) => h.core().id(),
        }
    }

    /// Instance kind.
    pub fn kind(&self) -> HandlerKind {
        match self {
            HandlerInstance::Application(_) => HandlerKind::Application,
            HandlerInstance::Incoming(_) => HandlerKind::Incoming,
            HandlerInstance::Outgoing(_) => HandlerKind::Outgoing,
            HandlerInstance::Dtmf(_) => HandlerKind::Digit,
            HandlerInstance::AnsweredEvent(_) => HandlerKind::AnsweredEvent,
        }
    }

    /// Shared call state, for every kind except the application.
    pub fn core(&self) -> Option<&HandlerCore> {
        match self {
            HandlerInstance::Application(_) => None,
            HandlerInstance::Incoming(h) => Some(h.core()),
            HandlerInstance::Outgoing(h) => Some(h.core()),
            HandlerInstance::Dtmf(h) => Some(h.core()),
            HandlerInstance::AnsweredEvent(h) => Some(h.core()),
        }
    }

    /// Whether this instance is bound to `call_id`.
    pub async fn has_call_id(&self, call_id: &CallId) -> Result<bool, StoreError> {
        match self.core() {
            Some(core) => core.session().has_call_id(call_id).await,
            None => Ok(false),
        }
    }

    /// Forward a callback to this instance.
    pub async fn proxy_event(&self, event: &CallEvent) -> Result<(), StoreError> {
        match self {
            HandlerInstance::Application(_) => Ok(()),
            HandlerInstance::Incoming(h) => h.proxy_event(event).await,
            HandlerInstance::Outgoing(h) => h.proxy_event(event).await,
            HandlerInstance::Dtmf(h) => h.proxy_event(event).await,
            HandlerInstance::AnsweredEvent(h) => h.proxy_event(event).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(HandlerStatus::CalleeHangup.to_string(), "callee hang-up");
        assert_eq!(HandlerStatus::ClosedByManager.to_string(), "closed by mngr");
        assert_eq!(
            HandlerStatus::Rejected("bad number".into()).to_string(),
            "rejected: bad number"
        );
    }
}
