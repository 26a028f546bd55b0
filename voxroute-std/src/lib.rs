//! # voxroute-std
//!
//! Standard implementations for the voxroute voice callback engine.
//!
//! This crate provides:
//! - **Stores**: [`MemoryStore`](store::MemoryStore), a concurrent in-process
//!   [`ContextStore`](voxroute_core::ContextStore) with optional expiry
//! - **Waiting**: [`BoundedWait`](wait::BoundedWait), the fixed-schedule poll
//!   used to pick up markup produced by another request
//! - **Standard hooks**: Logging
//! - **Testing utilities**: recording hooks and failing stores

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use voxroute_core;

// Modules
pub mod hooks;
pub mod store;
pub mod testing;
pub mod wait;
