//! Error types for voxroute.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`VoxError`] - Top-level error type for all voxroute operations
//! - [`DispatchError`] - Errors while routing a callback to its owner
//! - [`StoreError`] - Errors from the per-handler persistence layer
//! - [`WaitError`] - Errors from a bounded wait
//! - [`CalloutError`] - Errors while placing an outbound call
//! - [`ConfigError`] - Errors while loading flow configuration

use crate::event::EventKind;
use std::time::Duration;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all voxroute operations.
#[derive(Error, Debug)]
pub enum VoxError {
    /// An error occurred during callback dispatch.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// The persistence layer failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Placing an outbound call failed.
    #[error("callout error: {0}")]
    Callout(#[from] CalloutError),

    /// The flow configuration is invalid.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

/// Errors that can occur while routing a callback.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No application instance is configured to act as the coordinator.
    #[error("no voice application configured")]
    NoApplication,

    /// No handler owns the event.
    #[error("no handler for {event} event on call {call_id}: {reason}")]
    Unroutable {
        /// Discriminant of the discarded event.
        event: EventKind,
        /// Call the event belongs to.
        call_id: String,
        /// What the lookup was missing.
        reason: String,
    },

    /// A handler store failed while handling the event.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by a [`ContextStore`](crate::ContextStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored value has an unexpected shape.
    #[error("stored value for key {key} is malformed")]
    Malformed {
        /// Offending key.
        key: String,
    },

    /// A backend-specific failure.
    #[error(transparent)]
    Backend(BoxError),
}

/// Errors returned by a bounded wait.
#[derive(Error, Debug)]
pub enum WaitError<E> {
    /// The delay schedule was exhausted without a value.
    #[error("no value after {attempts} attempts ({waited:?})")]
    Timeout {
        /// Number of supplier invocations.
        attempts: usize,
        /// Total time spent sleeping between attempts.
        waited: Duration,
    },

    /// The supplier itself failed.
    #[error("supplier failed: {0}")]
    Source(#[source] E),
}

impl<E> WaitError<E> {
    /// Whether the wait ended by exhausting its schedule.
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }
}

/// Errors that can occur while placing an outbound call.
#[derive(Error, Debug)]
pub enum CalloutError {
    /// The application key or secret is empty.
    #[error("applicationKey or applicationSecret are empty")]
    MissingCredentials,

    /// A request parameter failed validation.
    #[error("invalid parameter {param}: {reason}")]
    InvalidParam {
        /// Parameter name.
        param: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The platform answered with an error code.
    #[error("callout rejected ({code}): {message}")]
    Rejected {
        /// Platform error code.
        code: i64,
        /// Platform error message.
        message: String,
    },

    /// The request never produced a platform answer.
    #[error("network error")]
    Transport(#[source] BoxError),

    /// Marking the new call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that can occur while loading flow configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The document is not valid JSON for the flow schema.
    #[error("invalid flow document: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two nodes share an id.
    #[error("duplicate node id: {0}")]
    DuplicateId(String),

    /// A node references something that is not configured.
    #[error("invalid node {id}: {reason}")]
    InvalidNode {
        /// Node id.
        id: String,
        /// What is wrong with it.
        reason: String,
    },
}

// Convenience conversions
impl From<BoxError> for VoxError {
    fn from(err: BoxError) -> Self {
        VoxError::Custom(err)
    }
}

impl From<BoxError> for StoreError {
    fn from(err: BoxError) -> Self {
        StoreError::Backend(err)
    }
}
