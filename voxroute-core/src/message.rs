//! Message trait for notification types.

/// A marker trait for values delivered to downstream hooks.
///
/// Messages must be `Send + Sync + 'static` to be safe for async use.
/// Every such type is a message through the blanket implementation.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Message",
    label = "must be `Send + Sync + 'static`",
    note = "Notifications delivered to hooks must be thread-safe and static."
)]
pub trait Message: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Message for T {}
