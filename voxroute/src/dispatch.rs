//! # Callback Dispatch
//!
//! The single entry point for every callback the telephony platform posts.
//! For each event the [`Dispatcher`] finds the handler that owns the call,
//! collects the markup to answer with and forwards the event downstream, all
//! within the request that delivered it.
//!
//! | event | owner | markup |
//! |---|---|---|
//! | `pie` | bound digit menu with the selected action | taken from the menu; every menu binding for the call is cleared |
//! | `ice` | incoming receiver for the dialed endpoint | configured, else waited for from a bound answered supplier |
//! | `ace` | outgoing originator, else bound answered supplier | taken from the owner |
//! | `dice` | outgoing or incoming owner, after answered bindings are cleared | none |
//!
//! An event with no owner is discarded and answered with a server error so the
//! platform tears the call down instead of waiting.

use crate::{correlate, handler::CallSession, registry::HandlerRegistry};
use std::sync::Arc;
use tracing::Instrument;
use voxroute_core::{CallEvent, Callback, DispatchError, IceEvent, PieEvent, WaitError};
use voxroute_std::wait::BoundedWait;

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    wait: BoundedWait,
    await_answered_markup: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            wait: BoundedWait::default(),
            await_answered_markup: true,
        }
    }
}

impl DispatcherConfig {
    /// Default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll schedule used while an incoming call waits for markup.
    pub fn with_wait(mut self, wait: BoundedWait) -> Self {
        self.wait = wait;
        self
    }

    /// Whether an incoming call without configured markup waits for an
    /// answered supplier to provide some.
    pub fn await_answered_markup(mut self, enabled: bool) -> Self {
        self.await_answered_markup = enabled;
        self
    }

    /// The poll schedule.
    pub fn wait(&self) -> &BoundedWait {
        &self.wait
    }

    /// Whether incoming calls wait for markup.
    pub fn awaits_answered_markup(&self) -> bool {
        self.await_answered_markup
    }
}

/// What to answer the platform with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResponse {
    /// `200` with markup as the body.
    Markup(String),
    /// `200` with an empty body.
    Empty,
    /// `500`; the event was discarded.
    ServerError,
    /// `400`; the body was not a callback.
    BadRequest,
}

impl CallbackResponse {
    /// HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            CallbackResponse::Markup(_) | CallbackResponse::Empty => 200,
            CallbackResponse::ServerError => 500,
            CallbackResponse::BadRequest => 400,
        }
    }

    /// Response body, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            CallbackResponse::Markup(markup) => Some(markup),
            _ => None,
        }
    }

    /// Whether the platform sees a success.
    pub fn is_success(&self) -> bool {
        self.status_code() == 200
    }
}

impl From<Option<String>> for CallbackResponse {
    fn from(markup: Option<String>) -> Self {
        match markup {
            Some(markup) => CallbackResponse::Markup(markup),
            None => CallbackResponse::Empty,
        }
    }
}

/// Routes callbacks to the handlers that own their calls.
///
/// Holds no lock across a dispatch; any number of callbacks may be in flight.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Create a dispatcher with default settings.
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self::with_config(registry, DispatcherConfig::default())
    }

    /// Create a dispatcher with explicit settings.
    pub fn with_config(registry: Arc<HandlerRegistry>, config: DispatcherConfig) -> Self {
        Self { registry, config }
    }

    /// The handlers callbacks are routed to.
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Settings.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Handle a raw callback body.
    ///
    /// Events this engine does not route (notifications and the like) are
    /// acknowledged with an empty success.
    pub async fn handle_json(&self, body: &[u8]) -> CallbackResponse {
        match Callback::from_slice(body) {
            Ok(Callback::Event(event)) => self.dispatch(&event).await,
            Ok(Callback::Unrecognized(name)) => {
                tracing::debug!(event = %name, "acknowledging unrouted event");
                CallbackResponse::Empty
            }
            Err(err) => {
                tracing::warn!(error = %err, "malformed callback body");
                CallbackResponse::BadRequest
            }
        }
    }

    /// Handle one event, turning failures into a server error.
    pub async fn dispatch(&self, event: &CallEvent) -> CallbackResponse {
        match self.try_dispatch(event).await {
            Ok(markup) => markup.into(),
            Err(err @ DispatchError::Store(_)) => {
                tracing::error!(
                    event = %event.kind(),
                    call_id = %event.call_id(),
                    error = %err,
                    "store failed, event discarded"
                );
                CallbackResponse::ServerError
            }
            Err(err) => {
                tracing::warn!(
                    event = %event.kind(),
                    call_id = %event.call_id(),
                    error = %err,
                    "event discarded"
                );
                CallbackResponse::ServerError
            }
        }
    }

    /// Handle one event, returning the markup to answer with.
    pub async fn try_dispatch(&self, event: &CallEvent) -> Result<Option<String>, DispatchError> {
        let span = tracing::info_span!(
            "callback",
            event = %event.kind(),
            call_id = %event.call_id()
        );

        async move {
            if self.registry.application().is_none() {
                return Err(DispatchError::NoApplication);
            }
            match event {
                CallEvent::Pie(pie) => self.on_digits(event, pie).await,
                CallEvent::Ice(ice) => self.on_incoming(event, ice).await,
                CallEvent::Ace(_) => self.on_answered(event).await,
                CallEvent::Dice(_) => self.on_ended(event).await,
            }
        }
        .instrument(span)
        .await
    }

    async fn on_digits(
        &self,
        event: &CallEvent,
        pie: &PieEvent,
    ) -> Result<Option<String>, DispatchError> {
        let call_id = &pie.callid;
        let Some(menu) = correlate::dtmf_for(&self.registry, call_id, pie.action()).await? else {
            return Err(unroutable(
                event,
                format!("no digit menu for action {:?}", pie.action()),
            ));
        };
        tracing::debug!(handler = %menu.core().id(), "digit menu selected");

        let markup = menu.take_markup(call_id).await?;
        correlate::clear_dtmf(&self.registry, call_id).await?;
        menu.proxy_event(event).await?;
        Ok(markup)
    }

    async fn on_incoming(
        &self,
        event: &CallEvent,
        ice: &IceEvent,
    ) -> Result<Option<String>, DispatchError> {
        let Some(incoming) = correlate::incoming_for(&self.registry, ice.to.as_ref()) else {
            let endpoint = ice.to.as_ref().map(|to| to.endpoint.as_str());
            return Err(unroutable(
                event,
                format!("no incoming handler for endpoint {endpoint:?}"),
            ));
        };
        tracing::debug!(handler = %incoming.core().id(), "incoming handler selected");

        let markup = incoming.markup();
        incoming.proxy_event(event).await?;
        if markup.is_some() || !self.config.await_answered_markup {
            return Ok(markup);
        }

        // the flow was just notified and may store markup for this call
        // while we wait
        let registry = self.registry.as_ref();
        let call_id = &ice.callid;
        match self
            .config
            .wait
            .until(move || correlate::answered_markup(registry, call_id))
            .await
        {
            Ok(markup) => Ok(Some(markup)),
            Err(WaitError::Timeout { attempts, waited }) => {
                tracing::warn!(attempts, ?waited, "no markup provided downstream");
                Ok(None)
            }
            Err(WaitError::Source(err)) => Err(err.into()),
        }
    }

    async fn on_answered(&self, event: &CallEvent) -> Result<Option<String>, DispatchError> {
        let call_id = event.call_id();

        if let Some(outgoing) = correlate::outgoing_for(&self.registry, call_id).await? {
            tracing::debug!(handler = %outgoing.core().id(), "outgoing call answered");
            let markup = outgoing.take_markup(call_id).await?;
            outgoing.proxy_event(event).await?;
            return Ok(markup);
        }

        if let Some(answered) = correlate::answered_for(&self.registry, call_id).await? {
            tracing::debug!(handler = %answered.core().id(), "answered supplier selected");
            let markup = answered.take_markup(call_id).await?;
            answered.proxy_event(event).await?;
            answered.core().session().clear_call_id(call_id).await?;
            return Ok(markup);
        }

        Err(unroutable(event, "no handler bound to call".to_string()))
    }

    async fn on_ended(&self, event: &CallEvent) -> Result<Option<String>, DispatchError> {
        let call_id = event.call_id();

        let cleared = correlate::clear_answered(&self.registry, call_id).await?;
        if cleared > 0 {
            tracing::debug!(cleared, "answered bindings cleared");
        }

        let Some(owner) = correlate::outgoing_or_incoming_for(&self.registry, call_id).await?
        else {
            return Err(unroutable(event, "no call owner bound to call".to_string()));
        };
        tracing::debug!(handler = %owner.id(), "call owner selected");
        owner.proxy_event(event).await?;
        Ok(None)
    }
}

fn unroutable(event: &CallEvent, reason: String) -> DispatchError {
    DispatchError::Unroutable {
        event: event.kind(),
        call_id: event.call_id().to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_codes() {
        assert_eq!(CallbackResponse::Markup("<svaml/>".into()).status_code(), 200);
        assert_eq!(CallbackResponse::Empty.status_code(), 200);
        assert_eq!(CallbackResponse::ServerError.status_code(), 500);
        assert_eq!(CallbackResponse::BadRequest.status_code(), 400);
        assert_eq!(CallbackResponse::Empty.body(), None);
        assert_eq!(CallbackResponse::from(Some("x".to_string())).body(), Some("x"));
        assert!(CallbackResponse::from(None).is_success());
        assert!(!CallbackResponse::ServerError.is_success());
        assert!(!CallbackResponse::BadRequest.is_success());
    }

    #[test]
    fn test_config_builder() {
        let config = DispatcherConfig::default();
        assert_eq!(config.wait(), &BoundedWait::default());
        assert!(config.awaits_answered_markup());

        let config = DispatcherConfig::new()
            .with_wait(BoundedWait::from_millis([50]))
            .await_answered_markup(false);
        assert_eq!(config.wait().attempts(), 1);
        assert!(!config.awaits_answered_markup());

        let dispatcher =
            Dispatcher::with_config(Arc::new(HandlerRegistry::new()), config.clone());
        assert!(!dispatcher.config().awaits_answered_markup());
    }

    #[tokio::test]
    async fn test_no_application_is_server_error() {
        let dispatcher = Dispatcher::new(Arc::new(HandlerRegistry::new()));
        let body = br#"{"event":"ace","callid":"c-1"}"#;

        let err = match Callback::from_slice(body).unwrap() {
            Callback::Event(event) => dispatcher.try_dispatch(&event).await.unwrap_err(),
            Callback::Unrecognized(name) => panic!("unexpected {name}"),
        };
        assert!(matches!(err, DispatchError::NoApplication));
        assert_eq!(
            dispatcher.handle_json(body).await,
            CallbackResponse::ServerError
        );
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_bodies() {
        let dispatcher = Dispatcher::new(Arc::new(HandlerRegistry::new()));

        assert_eq!(
            dispatcher
                .handle_json(br#"{"event":"notify","callid":"c-1"}"#)
                .await,
            CallbackResponse::Empty
        );
        assert_eq!(
            dispatcher.handle_json(b"not json").await,
            CallbackResponse::BadRequest
        );
    }
}
