//! Incoming call routing and the wait for downstream markup.

use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use voxroute::{
    BoundedWait, CallId, CallbackResponse, Dispatcher, DispatcherConfig, HandlerInstance,
    HandlerStatus, handler::CallSession, hooks::LoggingHook, testing::RecordingHook,
};

mod common;
use common::{ace, answered, dice, ice, incoming, registry, send};

#[tokio::test]
async fn test_routes_by_dialed_endpoint() {
    let registry = registry();
    let handlers = [
        incoming("in-1", "+1111", Some("<one/>")),
        incoming("in-2", "+2222", Some("<two/>")),
        incoming("in-3", "+3333", Some("<three/>")),
    ];
    for handler in &handlers {
        registry
            .register(HandlerInstance::Incoming(handler.clone()))
            .unwrap();
    }
    let recorder = RecordingHook::new();
    handlers[1].outlet().attach(LoggingHook::named("in-2"));
    handlers[1].outlet().attach(recorder.clone());
    let dispatcher = Dispatcher::new(registry);

    let response = send(&dispatcher, &ice("c-1", "+2222")).await;

    assert_eq!(response, CallbackResponse::Markup("<two/>".to_string()));
    assert_eq!(recorder.count(), 1);
    assert_eq!(handlers[1].core().status(), HandlerStatus::Ongoing);
    assert_eq!(handlers[0].core().status(), HandlerStatus::Idle);
    // configured markup is not consumed
    assert_eq!(handlers[1].markup().as_deref(), Some("<two/>"));
}

#[tokio::test]
async fn test_unknown_endpoint_is_server_error() {
    let registry = registry();
    registry
        .register(HandlerInstance::Incoming(incoming("in-1", "+1111", None)))
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    let response = send(&dispatcher, &ice("c-1", "+9999")).await;

    assert_eq!(response, CallbackResponse::ServerError);
    assert_eq!(response.status_code(), 500);
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_markup_produced_later() {
    let registry = registry();
    let receiver = incoming("in-1", "+1555", None);
    let supplier = answered("ace-1", None);
    registry
        .register(HandlerInstance::Incoming(receiver.clone()))
        .unwrap();
    registry
        .register(HandlerInstance::AnsweredEvent(supplier.clone()))
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    let producer = tokio::spawn({
        let supplier = supplier.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(700)).await;
            supplier
                .accept(&CallId::from("c-1"), Some("<menu/>"))
                .await
                .unwrap();
        }
    });

    let start = Instant::now();
    let response = send(&dispatcher, &ice("c-1", "+1555")).await;
    producer.await.unwrap();

    assert_eq!(response, CallbackResponse::Markup("<menu/>".to_string()));
    // found on the attempt after the 500ms sleep: 100 + 300 + 500
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(900) && elapsed < Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_wait_times_out_with_empty_success() {
    let registry = registry();
    registry
        .register(HandlerInstance::Incoming(incoming("in-1", "+1555", None)))
        .unwrap();
    registry
        .register(HandlerInstance::AnsweredEvent(answered("ace-1", None)))
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    let start = Instant::now();
    let response = send(&dispatcher, &ice("c-1", "+1555")).await;

    assert_eq!(response, CallbackResponse::Empty);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(3900) && elapsed < Duration::from_millis(4000));
}

#[tokio::test(start_paused = true)]
async fn test_wait_can_be_disabled_or_shortened() {
    let registry = registry();
    registry
        .register(HandlerInstance::Incoming(incoming("in-1", "+1555", None)))
        .unwrap();

    let no_wait = Dispatcher::with_config(
        registry.clone(),
        DispatcherConfig::new().await_answered_markup(false),
    );
    let start = Instant::now();
    assert_eq!(
        send(&no_wait, &ice("c-1", "+1555")).await,
        CallbackResponse::Empty
    );
    assert_eq!(start.elapsed(), Duration::ZERO);

    let short = Dispatcher::with_config(
        registry,
        DispatcherConfig::new().with_wait(BoundedWait::from_millis([10, 20])),
    );
    let start = Instant::now();
    assert_eq!(
        send(&short, &ice("c-2", "+1555")).await,
        CallbackResponse::Empty
    );
    assert!(start.elapsed() < Duration::from_millis(20));
}

#[tokio::test]
async fn test_wired_supplier_answers_ice_and_follow_up_ace() {
    let registry = registry();
    let receiver = incoming("in-1", "+1555", None);
    let supplier = answered("ace-1", Some("<menu/>"));
    receiver.outlet().attach(supplier.input());
    registry
        .register(HandlerInstance::Incoming(receiver.clone()))
        .unwrap();
    registry
        .register(HandlerInstance::AnsweredEvent(supplier.clone()))
        .unwrap();
    let dispatcher = Dispatcher::new(registry);

    assert_eq!(
        send(&dispatcher, &ice("c-1", "+1555")).await,
        CallbackResponse::Markup("<menu/>".to_string())
    );

    // a SIP destination answers with its own ace; the same markup is served
    assert_eq!(
        send(&dispatcher, &ace("c-1")).await,
        CallbackResponse::Markup("<menu/>".to_string())
    );
    let call = CallId::from("c-1");
    assert!(!supplier.core().session().has_call_id(&call).await.unwrap());

    assert_eq!(
        send(&dispatcher, &dice("c-1", "ANSWERED", "CALLERHANGUP")).await,
        CallbackResponse::Empty
    );
    assert_eq!(receiver.core().status(), HandlerStatus::Closed);
    assert!(!receiver.core().session().has_call_id(&call).await.unwrap());
}

#[tokio::test]
async fn test_registry_can_be_shared() {
    let registry = registry();
    let dispatcher = Dispatcher::new(Arc::clone(&registry));
    registry
        .register(HandlerInstance::Incoming(incoming("in-1", "+1555", Some("<x/>"))))
        .unwrap();

    assert_eq!(
        send(&dispatcher, &ice("c-1", "+1555")).await,
        CallbackResponse::Markup("<x/>".to_string())
    );
}
