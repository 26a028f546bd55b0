#![allow(dead_code)]

use serde_json::json;
use std::sync::Arc;
use voxroute::{
    CallbackResponse, Dispatcher, HandlerInstance, HandlerRegistry, SessionStore,
    callout::CallRequestDraft,
    handler::{
        AnsweredCallEvent, AnsweredConfig, Application, ApplicationConfig, DtmfConfig, DtmfMenu,
        IncomingCall, IncomingConfig, OutgoingCall, OutgoingConfig,
    },
    store::MemoryStore,
    testing::ScriptedCallout,
};

// ============================================================================
// Handlers
// ============================================================================

pub fn session() -> SessionStore {
    SessionStore::new(MemoryStore::new())
}

pub fn application() -> Arc<Application> {
    Arc::new(Application::new(
        "app",
        ApplicationConfig {
            application_key: "key".to_string(),
            application_secret: "secret".to_string(),
        },
    ))
}

/// A registry holding only the application.
pub fn registry() -> Arc<HandlerRegistry> {
    let registry = HandlerRegistry::new();
    registry
        .register(HandlerInstance::Application(application()))
        .unwrap();
    Arc::new(registry)
}

pub fn incoming(id: &str, endpoint: &str, svaml: Option<&str>) -> Arc<IncomingCall> {
    Arc::new(IncomingCall::new(
        id,
        IncomingConfig {
            endpoint: endpoint.to_string(),
            svaml: svaml.map(str::to_string),
        },
        session(),
    ))
}

pub fn dtmf(id: &str, action: &str, svaml: &str) -> Arc<DtmfMenu> {
    Arc::new(DtmfMenu::new(
        id,
        DtmfConfig {
            action: action.to_string(),
            svaml: Some(svaml.to_string()),
        },
        session(),
    ))
}

pub fn answered(id: &str, svaml: Option<&str>) -> Arc<AnsweredCallEvent> {
    Arc::new(AnsweredCallEvent::new(
        id,
        AnsweredConfig {
            svaml: svaml.map(str::to_string),
        },
        session(),
    ))
}

pub fn outgoing(id: &str, client: ScriptedCallout, defaults: CallRequestDraft) -> Arc<OutgoingCall> {
    Arc::new(OutgoingCall::new(
        id,
        OutgoingConfig {
            application: "app".to_string(),
            defaults,
        },
        application(),
        Arc::new(client),
        session(),
    ))
}

// ============================================================================
// Callback bodies
// ============================================================================

pub fn ice(call_id: &str, to: &str) -> Vec<u8> {
    json!({
        "event": "ice",
        "callid": call_id,
        "cli": "+46700000000",
        "to": { "type": "number", "endpoint": to }
    })
    .to_string()
    .into_bytes()
}

pub fn ace(call_id: &str) -> Vec<u8> {
    json!({ "event": "ace", "callid": call_id })
        .to_string()
        .into_bytes()
}

pub fn pie(call_id: &str, action: &str) -> Vec<u8> {
    json!({
        "event": "pie",
        "callid": call_id,
        "menuResult": { "type": "sequence", "value": action, "menuId": "main" }
    })
    .to_string()
    .into_bytes()
}

pub fn dice(call_id: &str, result: &str, reason: &str) -> Vec<u8> {
    json!({
        "event": "dice",
        "callid": call_id,
        "result": result,
        "reason": reason
    })
    .to_string()
    .into_bytes()
}

pub async fn send(dispatcher: &Dispatcher, body: &[u8]) -> CallbackResponse {
    dispatcher.handle_json(body).await
}
