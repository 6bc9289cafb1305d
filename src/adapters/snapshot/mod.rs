//! Snapshot store adapters.

pub mod in_memory;
pub mod json_file;

pub use in_memory::InMemorySnapshotStore;
pub use json_file::JsonSnapshotStore;
