// ── Repository implementations ──

pub mod file;
pub mod memory;

pub use file::{FileStore, StateDocument};
pub use memory::MemoryStore;
