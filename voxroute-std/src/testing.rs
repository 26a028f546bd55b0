//! Testing utilities for voxroute.
//!
//! This module provides utilities to make testing handlers and dispatch easier.
//!
//! # Features
//!
//! - [`RecordingHook`]: A hook that records every notification it receives
//! - [`FailingHook`]: A hook that always errors
//! - [`FlakyStore`]: A store whose backend can be taken down on demand

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};
use voxroute_core::{BoxError, ContextStore, Hook, HookResult, Message, StoreError};

use crate::store::MemoryStore;

// ============================================================================
// Recording Hook
// ============================================================================

/// A hook that records all notifications it receives.
///
/// Useful for verifying that events are forwarded to the right outlet.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingHook::<CallNotification>::new();
/// outgoing.success().attach(recorder.clone());
///
/// dispatcher.dispatch(&event).await;
///
/// assert_eq!(recorder.count(), 1);
/// ```
pub struct RecordingHook<E: Clone> {
    events: Arc<Mutex<Vec<E>>>,
    result: HookResult,
}

impl<E: Clone> RecordingHook<E> {
    /// Create a new recording hook that returns `Next`.
    pub fn new() -> Self {
        Self::with_result(HookResult::Next)
    }

    /// Create a recording hook that returns a specific result.
    pub fn with_result(result: HookResult) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            result,
        }
    }

    /// Get a clone of the recorded events.
    pub fn events(&self) -> Vec<E> {
        self.lock().clone()
    }

    /// Get the number of recorded events.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// The most recent event, if any.
    pub fn last(&self) -> Option<E> {
        self.lock().last().cloned()
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<E>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Clone> Default for RecordingHook<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> Clone for RecordingHook<E> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            result: self.result,
        }
    }
}

impl<E: Message + Clone> Hook<E> for RecordingHook<E> {
    async fn on_event(&self, event: &E) -> Result<HookResult, BoxError> {
        self.lock().push(event.clone());
        Ok(self.result)
    }
}

// ============================================================================
// Failing Hook
// ============================================================================

/// A hook that fails every notification with a fixed message.
pub struct FailingHook {
    message: &'static str,
}

impl FailingHook {
    /// Create a failing hook.
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

impl<E: Message> Hook<E> for FailingHook {
    async fn on_event(&self, _event: &E) -> Result<HookResult, BoxError> {
        Err(self.message.into())
    }
}

// ============================================================================
// Flaky Store
// ============================================================================

/// Handle for taking a [`FlakyStore`] down and back up.
#[derive(Debug, Clone, Default)]
pub struct OutageSwitch(Arc<AtomicBool>);

impl OutageSwitch {
    /// Make every store operation fail.
    pub fn trip(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Let store operations through again.
    pub fn restore(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Whether the store is currently down.
    pub fn is_down(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A [`MemoryStore`] that reports [`StoreError::Unavailable`] while its
/// [`OutageSwitch`] is tripped.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    switch: OutageSwitch,
}

impl FlakyStore {
    /// Create a store that starts available.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that is down from the start.
    pub fn down() -> Self {
        let store = Self::default();
        store.switch.trip();
        store
    }

    /// Get the switch controlling this store.
    pub fn switch(&self) -> OutageSwitch {
        self.switch.clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.switch.is_down() {
            Err(StoreError::Unavailable("backend offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContextStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.remove(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_hook_shares_events_between_clones() {
        let recorder = RecordingHook::<String>::with_result(HookResult::Stop);
        let observer = recorder.clone();

        let result = recorder.on_event(&"ice".to_string()).await.unwrap();

        assert_eq!(result, HookResult::Stop);
        assert_eq!(observer.events(), vec!["ice".to_string()]);
        observer.clear();
        assert_eq!(recorder.count(), 0);
    }

    #[tokio::test]
    async fn test_flaky_store_outage() {
        let store = FlakyStore::new();
        let switch = store.switch();
        store.set("k", Value::Bool(true)).await.unwrap();

        switch.trip();
        assert!(matches!(
            store.get("k").await,
            Err(StoreError::Unavailable(_))
        ));

        switch.restore();
        assert_eq!(store.get("k").await.unwrap(), Some(Value::Bool(true)));
    }
}
