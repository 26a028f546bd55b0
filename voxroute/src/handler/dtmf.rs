use serde::Deserialize;
use std::sync::Arc;
use voxroute_core::{
    BoxError, CallEvent, CallId, CallNotification, HandlerId, HandlerKind, Hook, HookResult,
    SessionStore, StoreError, VoiceCall,
};

use super::{CallSession, HandlerCore};
use crate::outlet::Outlet;

/// Static configuration of a [`DtmfMenu`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DtmfConfig {
    /// Menu action value this instance reacts to.
    pub action: String,
    /// Markup answered when the action is selected.
    #[serde(default)]
    pub svaml: Option<String>,
}

/// Reacts to one action of a digit menu.
///
/// Several instances can be bound to the same call at once, one per action
/// the caller may pick; the selected action decides which one answers.
#[derive(Debug)]
pub struct DtmfMenu {
    core: HandlerCore,
    config: DtmfConfig,
    outlet: Outlet,
}

impl DtmfMenu {
    /// Create a digit menu action.
    pub fn new(id: impl Into<HandlerId>, config: DtmfConfig, session: SessionStore) -> Self {
        Self {
            core: HandlerCore::new(id.into(), HandlerKind::Digit, session),
            config,
            outlet: Outlet::new("dtmf"),
        }
    }

    /// Static configuration.
    pub fn config(&self) -> &DtmfConfig {
        &self.config
    }

    /// Port receiving the digit result when this action is selected.
    pub fn outlet(&self) -> &Outlet {
        &self.outlet
    }

    /// Whether the caller selected this instance's action.
    pub fn matches_action(&self, action: Option<&str>) -> bool {
        action == Some(self.config.action.as_str())
    }

    /// Make this action a candidate answer for the next digit result of
    /// `call_id`.
    pub async fn accept(&self, call_id: &CallId) -> Result<(), StoreError> {
        let session = self.core.session();
        session.mark_call_id(call_id).await?;
        match self.config.svaml.as_deref() {
            Some(svaml) if !svaml.is_empty() => session.set_markup(call_id, svaml).await,
            _ => session.clear_markup(call_id).await,
        }
    }

    /// Consume the markup stored for `call_id`.
    pub async fn take_markup(&self, call_id: &CallId) -> Result<Option<String>, StoreError> {
        self.core.session().take_markup(call_id).await
    }

    /// Forward the digit result downstream.
    pub async fn proxy_event(&self, event: &CallEvent) -> Result<(), StoreError> {
        self.outlet
            .emit(&CallNotification::new(
                self.core.id().clone(),
                Some(VoiceCall::from_event(event)),
                Some(event.clone()),
            ))
            .await;
        Ok(())
    }

    /// A hook that binds every call it is notified about to this action.
    pub fn input(self: &Arc<Self>) -> DtmfInput {
        DtmfInput(self.clone())
    }
}

impl CallSession for DtmfMenu {
    fn core(&self) -> &HandlerCore {
        &self.core
    }
}

/// Upstream connection into a [`DtmfMenu`].
pub struct DtmfInput(Arc<DtmfMenu>);

impl Hook<CallNotification> for DtmfInput {
    async fn on_event(&self, event: &CallNotification) -> Result<HookResult, BoxError> {
        if let Some(call) = &event.voice_call {
            self.0.accept(&call.call_id).await?;
        }
        Ok(HookResult::Next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxroute_std::store::MemoryStore;

    fn menu(action: &str, svaml: Option<&str>) -> DtmfMenu {
        DtmfMenu::new(
            format!("dtmf-{action}"),
            DtmfConfig {
                action: action.to_string(),
                svaml: svaml.map(str::to_string),
            },
            SessionStore::new(MemoryStore::new()),
        )
    }

    #[test]
    fn test_matches_action() {
        let handler = menu("1", None);
        assert!(handler.matches_action(Some("1")));
        assert!(!handler.matches_action(Some("2")));
        assert!(!handler.matches_action(None));
    }

    #[tokio::test]
    async fn test_accept_binds_and_stores_markup() {
        let handler = menu("1", Some("<say>one</say>"));
        let call = CallId::from("c-1");

        handler.accept(&call).await.unwrap();

        assert!(handler.core().session().has_call_id(&call).await.unwrap());
        assert_eq!(
            handler.take_markup(&call).await.unwrap().as_deref(),
            Some("<say>one</say>")
        );
        assert_eq!(handler.take_markup(&call).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_input_hook_binds_notified_call() {
        let handler = Arc::new(menu("2", None));
        let input = handler.input();
        let notification = CallNotification::new(
            HandlerId::from("in-1"),
            Some(VoiceCall::bare(CallId::from("c-9"))),
            None,
        );

        assert_eq!(input.on_event(&notification).await.unwrap(), HookResult::Next);
        assert!(
            handler
                .core()
                .session()
                .has_call_id(&CallId::from("c-9"))
                .await
                .unwrap()
        );
    }
}
