//! Call ownership lookups.
//!
//! Each function answers one question the dispatcher asks about a callback:
//! which handler owns this call, and for the digit and answered kinds, which
//! of several bound instances should answer. All scans follow registration
//! order and stop at the first match.

use crate::{
    handler::{
        AnsweredCallEvent, CallSession, DtmfMenu, HandlerInstance, IncomingCall, OutgoingCall,
        clear_bound, first_bound,
    },
    registry::HandlerRegistry,
};
use std::sync::Arc;
use voxroute_core::{CallId, Endpoint, HandlerKind, StoreError};

/// The originator that placed `call_id`.
pub async fn outgoing_for(
    registry: &HandlerRegistry,
    call_id: &CallId,
) -> Result<Option<Arc<OutgoingCall>>, StoreError> {
    first_bound(registry.outgoing(), call_id).await
}

/// The outgoing or incoming handler bound to `call_id`, whichever was
/// registered first.
pub async fn outgoing_or_incoming_for(
    registry: &HandlerRegistry,
    call_id: &CallId,
) -> Result<Option<HandlerInstance>, StoreError> {
    for handler in registry.find_by_kind(&[HandlerKind::Outgoing, HandlerKind::Incoming]) {
        if handler.has_call_id(call_id).await? {
            return Ok(Some(handler));
        }
    }
    Ok(None)
}

/// The digit menu bound to `call_id` whose action is the one selected.
pub async fn dtmf_for(
    registry: &HandlerRegistry,
    call_id: &CallId,
    action: Option<&str>,
) -> Result<Option<Arc<DtmfMenu>>, StoreError> {
    let candidates = registry
        .dtmf()
        .into_iter()
        .filter(|menu| menu.matches_action(action));
    first_bound(candidates, call_id).await
}

/// The incoming receiver for the dialed endpoint.
pub fn incoming_for(registry: &HandlerRegistry, to: Option<&Endpoint>) -> Option<Arc<IncomingCall>> {
    registry
        .incoming()
        .into_iter()
        .find(|incoming| incoming.matches_endpoint(to))
}

/// The answered markup supplier bound to `call_id`.
pub async fn answered_for(
    registry: &HandlerRegistry,
    call_id: &CallId,
) -> Result<Option<Arc<AnsweredCallEvent>>, StoreError> {
    first_bound(registry.answered(), call_id).await
}

/// Markup waiting for `call_id` in the first bound answered supplier that has
/// some. The markup stays in place.
pub async fn answered_markup(
    registry: &HandlerRegistry,
    call_id: &CallId,
) -> Result<Option<String>, StoreError> {
    for answered in registry.answered() {
        if !answered.core().session().has_call_id(call_id).await? {
            continue;
        }
        if let Some(markup) = answered.peek_markup(call_id).await? {
            return Ok(Some(markup));
        }
    }
    Ok(None)
}

/// Unbind `call_id` from every digit menu.
pub async fn clear_dtmf(registry: &HandlerRegistry, call_id: &CallId) -> Result<usize, StoreError> {
    clear_bound(registry.dtmf(), call_id).await
}

/// Unbind `call_id` from every answered supplier.
pub async fn clear_answered(
    registry: &HandlerRegistry,
    call_id: &CallId,
) -> Result<usize, StoreError> {
    clear_bound(registry.answered(), call_id).await
}
