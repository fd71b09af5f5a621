mod document;
mod key;
mod redb_storage;
mod storage;
mod store;

pub use document::{DocumentIssue, DraftBucket, DraftDocument, DraftEntry};
pub use key::{resolve_from, ContextKey, KeyResolver};
pub use redb_storage::RedbStorage;
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError, UpdateFn};
pub use store::{DraftStore, DEFAULT_STORAGE_KEY};
