//! Registry of live handler instances.
//!
//! The registry is owned by the process that serves callbacks and shared with
//! the [`Dispatcher`](crate::Dispatcher) through an `Arc`. Lookups take a
//! short read lock and return a snapshot, so a redeploy (`replace_all`) never
//! blocks an in-flight dispatch and vice versa.

use crate::handler::{
    AnsweredCallEvent, Application, DtmfMenu, HandlerInstance, IncomingCall, OutgoingCall,
};
use std::sync::{Arc, PoisonError, RwLock};
use voxroute_core::{ConfigError, HandlerId, HandlerKind};

/// Handler instances in registration order.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: RwLock<Vec<HandlerInstance>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Add a handler after the existing ones.
    pub fn register(&self, handler: HandlerInstance) -> Result<(), ConfigError> {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.iter().any(|h| h.id() == handler.id()) {
            return Err(ConfigError::DuplicateId(handler.id().to_string()));
        }
        tracing::debug!(handler = %handler.id(), kind = %handler.kind(), "handler registered");
        handlers.push(handler);
        Ok(())
    }

    /// Remove a handler, returning it if it was registered.
    pub fn deregister(&self, id: &HandlerId) -> Option<HandlerInstance> {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let index = handlers.iter().position(|h| h.id() == id)?;
        Some(handlers.remove(index))
    }

    /// Swap the whole handler set, as a flow redeploy does.
    pub fn replace_all(
        &self,
        replacement: impl IntoIterator<Item = HandlerInstance>,
    ) -> Result<(), ConfigError> {
        let mut next: Vec<HandlerInstance> = Vec::new();
        for handler in replacement {
            if next.iter().any(|h| h.id() == handler.id()) {
                return Err(ConfigError::DuplicateId(handler.id().to_string()));
            }
            next.push(handler);
        }
        tracing::info!(handlers = next.len(), "handler set replaced");
        *self.handlers.write().unwrap_or_else(PoisonError::into_inner) = next;
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look a handler up by id.
    pub fn get(&self, id: &HandlerId) -> Option<HandlerInstance> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|h| h.id() == id)
            .cloned()
    }

    /// All handlers of the given kinds, in registration order.
    pub fn find_by_kind(&self, kinds: &[HandlerKind]) -> Vec<HandlerInstance> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|h| kinds.contains(&h.kind()))
            .cloned()
            .collect()
    }

    /// First handler of the given kinds accepted by `predicate`.
    pub fn find_first(
        &self,
        kinds: &[HandlerKind],
        predicate: impl Fn(&HandlerInstance) -> bool,
    ) -> Option<HandlerInstance> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|h| kinds.contains(&h.kind()) && predicate(h))
            .cloned()
    }

    /// The coordinating application, if one is configured.
    pub fn application(&self) -> Option<Arc<Application>> {
        match self.find_first(&[HandlerKind::Application], |_| true)? {
            HandlerInstance::Application(app) => Some(app),
            _ => None,
        }
    }

    /// Incoming call receivers.
    pub fn incoming(&self) -> Vec<Arc<IncomingCall>> {
        self.find_by_kind(&[HandlerKind::Incoming])
            .into_iter()
            .filter_map(|h| match h {
                HandlerInstance::Incoming(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    /// Call originators.
    pub fn outgoing(&self) -> Vec<Arc<OutgoingCall>> {
        self.find_by_kind(&[HandlerKind::Outgoing])
            .into_iter()
            .filter_map(|h| match h {
                HandlerInstance::Outgoing(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    /// Digit menu actions.
    pub fn dtmf(&self) -> Vec<Arc<DtmfMenu>> {
        self.find_by_kind(&[HandlerKind::Digit])
            .into_iter()
            .filter_map(|h| match h {
                HandlerInstance::Dtmf(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    /// Answered call markup suppliers.
    pub fn answered(&self) -> Vec<Arc<AnsweredCallEvent>> {
        self.find_by_kind(&[HandlerKind::AnsweredEvent])
            .into_iter()
            .filter_map(|h| match h {
                HandlerInstance::AnsweredEvent(h) => Some(h),
                _ => None,
            })
            .collect()
    }
}
