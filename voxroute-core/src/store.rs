//! # Session State
//!
//! Every handler instance owns one [`ContextStore`]: a key/value mapping that
//! lives as long as the instance's configuration, not as long as a call.
//!
//! [`SessionStore`] layers two per-call conventions on top of it:
//!
//! - **Binding**: key `{callId}` holds `true` while the handler owns the call.
//! - **Markup mailbox**: key `{callId}_svaml` holds response markup that is
//!   consumed by the first dispatch that reads it.

use crate::{error::StoreError, event::CallId};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Suffix appended to a call id to form its markup key.
pub const MARKUP_SUFFIX: &str = "_svaml";

/// Persistence layer backing one handler instance.
///
/// Implementations must tolerate concurrent `get`/`set`/`remove` from
/// unrelated request tasks. Failures are reported, never swallowed.
#[async_trait]
pub trait ContextStore: Send + Sync + 'static {
    /// Read a key. JSON `null` is reported as absent.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write a key.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Call binding and markup capability over a [`ContextStore`].
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<dyn ContextStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Wrap a backend.
    pub fn new(inner: impl ContextStore) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Wrap an already shared backend.
    pub fn from_shared(inner: Arc<dyn ContextStore>) -> Self {
        Self { inner }
    }

    /// Raw read.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(key).await
    }

    /// Raw write.
    pub async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.inner.set(key, value).await
    }

    /// Raw delete.
    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }

    /// Whether this handler is bound to `call_id`.
    pub async fn has_call_id(&self, call_id: &CallId) -> Result<bool, StoreError> {
        Ok(self.inner.get(call_id.as_str()).await?.is_some())
    }

    /// Bind this handler to `call_id`.
    pub async fn mark_call_id(&self, call_id: &CallId) -> Result<(), StoreError> {
        self.inner.set(call_id.as_str(), Value::Bool(true)).await
    }

    /// Release `call_id`, dropping any unread markup with it.
    pub async fn clear_call_id(&self, call_id: &CallId) -> Result<(), StoreError> {
        self.inner.remove(call_id.as_str()).await?;
        self.inner.remove(&call_id.markup_key()).await
    }

    /// Store markup for the next dispatch of `call_id`.
    pub async fn set_markup(&self, call_id: &CallId, markup: &str) -> Result<(), StoreError> {
        self.inner
            .set(&call_id.markup_key(), Value::String(markup.to_string()))
            .await
    }

    /// Drop any unread markup of `call_id`, keeping the binding.
    pub async fn clear_markup(&self, call_id: &CallId) -> Result<(), StoreError> {
        self.inner.remove(&call_id.markup_key()).await
    }

    /// Read and remove the markup of `call_id`.
    pub async fn take_markup(&self, call_id: &CallId) -> Result<Option<String>, StoreError> {
        let markup = self.peek_markup(call_id).await?;
        if markup.is_some() {
            self.inner.remove(&call_id.markup_key()).await?;
        }
        Ok(markup)
    }

    /// Read the markup of `call_id` without consuming it.
    ///
    /// Empty strings read as absent.
    pub async fn peek_markup(&self, call_id: &CallId) -> Result<Option<String>, StoreError> {
        let key = call_id.markup_key();
        match self.inner.get(&key).await? {
            None => Ok(None),
            Some(Value::String(markup)) if markup.is_empty() => Ok(None),
            Some(Value::String(markup)) => Ok(Some(markup)),
            Some(_) => Err(StoreError::Malformed { key }),
        }
    }
}
