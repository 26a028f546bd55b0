//! # voxroute - Voice Callback Correlation and Dispatch
//!
//! `voxroute` answers the webhook callbacks a telephony platform posts during
//! a voice call. Each callback is a separate HTTP request; the only thing
//! tying them together is the call id. For every callback the engine works
//! out which configured handler owns the call, what markup to answer with,
//! and where to forward the event, before the request returns.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use voxroute::prelude::*;
//!
//! let flow = FlowConfig::from_json(&std::fs::read_to_string("flow.json")?)?;
//! let registry = Arc::new(flow.build_in_memory(Arc::new(MyCalloutClient), None)?);
//! let dispatcher = Dispatcher::new(registry);
//!
//! // inside the HTTP route serving the callback URL
//! let response = dispatcher.handle_json(&body).await;
//! reply(response.status_code(), response.body().unwrap_or(""));
//! ```
//!
//! ## Components
//!
//! - [`Dispatcher`]: one entry point per callback
//! - [`HandlerRegistry`]: the live handler instances
//! - [`handler`]: incoming, outgoing, digit menu and answered handlers
//! - [`correlate`]: call ownership lookups
//! - [`callout`]: the outbound call request model
//! - [`FlowConfig`]: loading handlers from a flow document

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod callout;
pub mod config;
pub mod correlate;
pub mod dispatch;
pub mod handler;
pub mod outlet;
pub mod registry;
pub mod testing;

pub use voxroute_core::{
    // Events
    AceEvent,
    // Errors
    BoxError,
    CallEvent,
    CallId,
    CallNotification,
    CallReason,
    CallResult,
    Callback,
    CalloutError,
    ConfigError,
    // Store
    ContextStore,
    DiceEvent,
    DispatchError,
    // Hook
    DynHook,
    Endpoint,
    EventKind,
    // Handlers
    HandlerId,
    HandlerKind,
    Hook,
    HookResult,
    IceEvent,
    MenuResult,
    Message,
    PieEvent,
    SessionStore,
    StoreError,
    VoiceCall,
    VoxError,
    WaitError,
};

pub use callout::{CallRequest, CallRequestDraft, CalloutBody, CalloutClient, CalloutReply};
pub use config::FlowConfig;
pub use dispatch::{CallbackResponse, Dispatcher, DispatcherConfig};
pub use handler::{HandlerInstance, HandlerStatus};
pub use outlet::Outlet;
pub use registry::HandlerRegistry;

/// Standard store implementations.
pub mod store {
    pub use voxroute_std::store::MemoryStore;
}

/// Standard hook implementations.
pub mod hooks {
    pub use voxroute_std::hooks::LoggingHook;
}

pub use voxroute_std::wait::BoundedWait;

/// Prelude module - common imports for voxroute.
///
/// # Usage
///
/// ```rust,ignore
/// use voxroute::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BoundedWait,
        // Errors
        BoxError,
        // Events
        CallEvent,
        CallId,
        CallNotification,
        // Dispatch
        CallbackResponse,
        CalloutClient,
        DispatchError,
        Dispatcher,
        DispatcherConfig,
        FlowConfig,
        HandlerRegistry,
        // Hooks
        Hook,
        HookResult,
        SessionStore,
        VoxError,
    };
}
