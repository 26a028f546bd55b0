//! # voxroute-core
//!
//! Core traits and types for the voxroute voice callback engine.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! store backends, downstream consumers and transports that don't need the
//! full `voxroute` dispatcher.
//!
//! # Building Blocks
//!
//! ## Events ([`CallEvent`])
//!
//! The closed set of callbacks a telephony platform posts for one call:
//! incoming (`ice`), answered (`ace`), digit result (`pie`) and ended
//! (`dice`). Every event carries a [`CallId`], the only correlation key
//! between independent HTTP requests of the same call.
//!
//! ## Downstream Delivery ([`Hook`])
//!
//! Handlers forward events to downstream consumers as [`CallNotification`]s.
//! A consumer is a [`Hook`]: it receives the notification and returns `Next`
//! to let the following consumer see it, or `Stop` to end propagation.
//!
//! ## Session State ([`SessionStore`])
//!
//! Each handler instance owns an isolated key/value [`ContextStore`]. The
//! [`SessionStore`] capability layers call bindings and one-shot markup
//! mailboxes on top of it.
//!
//! # Error Types
//!
//! - [`VoxError`] - Top-level error type
//! - [`DispatchError`] - Callback routing errors
//! - [`StoreError`] - Persistence layer failures
//! - [`WaitError`] - Bounded wait exhaustion
//! - [`CalloutError`] - Outbound call placement failures
//! - [`ConfigError`] - Flow configuration errors

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod error;
mod event;
mod hook;
mod kind;
mod message;
mod notification;
mod store;

// Re-exports
pub use error::{
    BoxError, CalloutError, ConfigError, DispatchError, StoreError, VoxError, WaitError,
};
pub use event::{
    AceEvent, CallEvent, CallId, CallReason, CallResult, Callback, DiceEvent, Endpoint, EventKind,
    IceEvent, MenuResult, PieEvent,
};
pub use hook::{DynHook, Hook, HookResult};
pub use kind::{HandlerId, HandlerKind};
pub use message::Message;
pub use notification::{CallNotification, VoiceCall};
pub use store::{ContextStore, MARKUP_SUFFIX, SessionStore};
