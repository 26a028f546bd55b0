//! Standard hook implementations.

mod logging;

pub use logging::LoggingHook;
