//! Store backends.

mod memory;

pub use memory::MemoryStore;
