//! Downstream outlets.
//!
//! An outlet is one output port of a handler. It feeds two kinds of
//! consumers:
//!
//! - **Taps** are the inputs of other handlers wired to the port. Each tap
//!   receives every notification on its own; a failing tap is logged and the
//!   next one still runs.
//! - **Chained hooks** are attached consumers that run in attachment order
//!   after the taps, until one returns `Stop` or fails.

use std::sync::{Arc, PoisonError, RwLock};
use voxroute_core::{BoxError, CallNotification, DynHook, Hook, HookResult};

type SharedHook = Arc<dyn DynHook<CallNotification>>;

#[derive(Default)]
struct Consumers {
    taps: Vec<SharedHook>,
    chain: Vec<SharedHook>,
}

/// Downstream consumers of one handler port.
#[derive(Clone)]
pub struct Outlet {
    name: &'static str,
    consumers: Arc<RwLock<Consumers>>,
}

impl std::fmt::Debug for Outlet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let consumers = self.consumers.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Outlet")
            .field("name", &self.name)
            .field("taps", &consumers.taps.len())
            .field("chain", &consumers.chain.len())
            .finish()
    }
}

impl Outlet {
    /// Create an outlet with no consumers.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            consumers: Arc::new(RwLock::new(Consumers::default())),
        }
    }

    /// Port name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Attach a consumer at the end of the chain.
    pub fn attach<H: Hook<CallNotification>>(&self, hook: H) {
        self.attach_shared(Arc::new(hook));
    }

    /// Attach an already shared consumer at the end of the chain.
    pub fn attach_shared(&self, hook: SharedHook) {
        self.consumers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .chain
            .push(hook);
    }

    /// Wire a consumer that receives every notification independently of the
    /// others.
    pub fn tap<H: Hook<CallNotification>>(&self, hook: H) {
        self.consumers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .taps
            .push(Arc::new(hook));
    }

    /// Number of consumers, taps and chained hooks together.
    pub fn len(&self) -> usize {
        let consumers = self.consumers.read().unwrap_or_else(PoisonError::into_inner);
        consumers.taps.len() + consumers.chain.len()
    }

    /// Whether nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a notification, returning how many consumers saw it.
    ///
    /// Every tap runs; then the chain runs until a hook stops it or fails.
    /// Failures are logged and never fail the callback that triggered the
    /// emit.
    pub async fn emit(&self, notification: &CallNotification) -> usize {
        let (taps, chain) = {
            let consumers = self.consumers.read().unwrap_or_else(PoisonError::into_inner);
            (consumers.taps.clone(), consumers.chain.clone())
        };

        let mut delivered = 0;
        for tap in taps {
            delivered += 1;
            if let Err(err) = tap.on_event_dyn(notification).await {
                self.consumer_failed(notification, &err);
            }
        }
        for hook in chain {
            delivered += 1;
            match hook.on_event_dyn(notification).await {
                Ok(HookResult::Next) => continue,
                Ok(HookResult::Stop) => break,
                Err(err) => {
                    self.consumer_failed(notification, &err);
                    break;
                }
            }
        }
        delivered
    }

    fn consumer_failed(&self, notification: &CallNotification, err: &BoxError) {
        tracing::error!(
            outlet = self.name,
            source = %notification.source,
            error = %err,
            "downstream consumer failed"
        );
    }
}
