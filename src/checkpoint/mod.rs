//! 断点：存储抽象、内存实现、快照格式

pub mod memory;
pub mod snapshot;
pub mod store;

pub use memory::InMemoryCheckpointStore;
pub use snapshot::{CheckPoint, CHECKPOINT_VERSION};
pub use store::{CheckpointStore, ConflictPolicy};
