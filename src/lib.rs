// TaskFlow - Task list manager with local snapshot persistence

pub mod filter;
pub mod kv;
pub mod models;
pub mod snapshot;
pub mod sort;
pub mod store;

// Re-export main types for convenience
pub use filter::{FilterMode, filter_tasks};
pub use kv::{DirStore, KeyValueStore, MemoryStore};
pub use models::{Task, local_now, new_id, parse_due_date};
pub use sort::{SortKey, sort_tasks};
pub use store::{CORRUPT_SNAPSHOT_KEY, Notice, NoticeLevel, SNAPSHOT_KEY, Stats, TaskStore, ValidationError};
