//! Testing utilities for voxroute.
//!
//! Re-exports the standard test doubles and adds [`ScriptedCallout`], a
//! [`CalloutClient`] that answers from a script instead of the network.

pub use voxroute_std::testing::{FailingHook, FlakyStore, OutageSwitch, RecordingHook};

use crate::{
    callout::{CalloutBody, CalloutClient, CalloutReply},
    handler::ApplicationConfig,
};
use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use voxroute_core::{BoxError, CallId};

enum Scripted {
    Reply(CalloutReply),
    Transport(String),
}

#[derive(Default)]
struct Script {
    queue: VecDeque<Scripted>,
    sent: Vec<CalloutBody>,
}

/// A callout client replaying scripted answers.
///
/// Answers are consumed in order. Once the script is exhausted every request
/// succeeds with a generated call id (`call-1`, `call-2`, ...).
#[derive(Clone, Default)]
pub struct ScriptedCallout {
    script: Arc<Mutex<Script>>,
}

impl ScriptedCallout {
    /// Create a client that accepts every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful answer carrying `call_id`.
    pub fn accept_as(self, call_id: impl Into<CallId>) -> Self {
        self.push(Scripted::Reply(CalloutReply {
            call_id: Some(call_id.into()),
            ..Default::default()
        }))
    }

    /// Queue a platform refusal.
    pub fn reject(self, code: i64, message: &str) -> Self {
        self.push(Scripted::Reply(CalloutReply {
            call_id: None,
            error_code: Some(code),
            message: Some(message.to_string()),
        }))
    }

    /// Queue a transport failure.
    pub fn fail(self, message: &str) -> Self {
        self.push(Scripted::Transport(message.to_string()))
    }

    /// Bodies received so far.
    pub fn requests(&self) -> Vec<CalloutBody> {
        self.lock().sent.clone()
    }

    /// Number of requests received.
    pub fn count(&self) -> usize {
        self.lock().sent.len()
    }

    fn push(self, answer: Scripted) -> Self {
        self.lock().queue.push_back(answer);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CalloutClient for ScriptedCallout {
    async fn callout(
        &self,
        _credentials: &ApplicationConfig,
        body: &CalloutBody,
    ) -> Result<CalloutReply, BoxError> {
        let mut script = self.lock();
        script.sent.push(body.clone());
        match script.queue.pop_front() {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Transport(message)) => Err(message.into()),
            None => Ok(CalloutReply {
                call_id: Some(CallId::new(format!("call-{}", script.sent.len()))),
                ..Default::default()
            }),
        }
    }
}
