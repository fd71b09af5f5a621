//! Embedded-database backing store.

use super::storage::{LocalStorage, StorageError, UpdateFn};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;

const LOCAL_STORAGE: TableDefinition<&str, &str> = TableDefinition::new("local_storage");

fn db_error(e: impl Into<redb::Error>) -> StorageError {
    StorageError::Database(e.into().to_string())
}

/// [`LocalStorage`] on a single redb table.
pub struct RedbStorage {
    db: Database,
}

impl RedbStorage {
    /// Open or create the database file and make sure the table exists.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let db = Database::create(path).map_err(db_error)?;
        let txn = db.begin_write().map_err(db_error)?;
        txn.open_table(LOCAL_STORAGE).map_err(db_error)?;
        txn.commit().map_err(db_error)?;
        Ok(Self { db })
    }
}

impl LocalStorage for RedbStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let txn = self.db.begin_read().map_err(db_error)?;
        let table = txn.open_table(LOCAL_STORAGE).map_err(db_error)?;
        let value = table.get(key).map_err(db_error)?;
        Ok(value.map(|v| v.value().to_string()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(db_error)?;
        {
            let mut table = txn.open_table(LOCAL_STORAGE).map_err(db_error)?;
            table.insert(key, value).map_err(db_error)?;
        }
        txn.commit().map_err(db_error)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(db_error)?;
        {
            let mut table = txn.open_table(LOCAL_STORAGE).map_err(db_error)?;
            table.remove(key).map_err(db_error)?;
        }
        txn.commit().map_err(db_error)?;
        Ok(())
    }

    /// Runs inside one write transaction; redb admits a single writer at a time.
    fn update(&self, key: &str, change: &mut UpdateFn<'_>) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(db_error)?;
        let changed = {
            let mut table = txn.open_table(LOCAL_STORAGE).map_err(db_error)?;
            let current = table
                .get(key)
                .map_err(db_error)?
                .map(|v| v.value().to_string());
            match change(current)? {
                Some(value) => {
                    table.insert(key, value.as_str()).map_err(db_error)?;
                    true
                }
                None => false,
            }
        };
        if changed {
            txn.commit().map_err(db_error)?;
        } else {
            txn.abort().map_err(db_error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redb_round_trip_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.redb");

        {
            let storage = RedbStorage::open(&path).unwrap();
            assert_eq!(storage.get_item("drafts").unwrap(), None);
            storage.set_item("drafts", r#"{"_draft":{}}"#).unwrap();
        }

        let storage = RedbStorage::open(&path).unwrap();
        assert_eq!(
            storage.get_item("drafts").unwrap().as_deref(),
            Some(r#"{"_draft":{}}"#)
        );
        storage.remove_item("drafts").unwrap();
        assert_eq!(storage.get_item("drafts").unwrap(), None);
    }

    #[test]
    fn test_redb_update_reads_inside_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let storage = RedbStorage::open(&dir.path().join("drafts.redb")).unwrap();

        storage.set_item("drafts", "a").unwrap();
        storage
            .update("drafts", &mut |current| {
                assert_eq!(current.as_deref(), Some("a"));
                Ok(Some("ab".to_string()))
            })
            .unwrap();
        storage.update("drafts", &mut |_| Ok(None)).unwrap();
        assert_eq!(storage.get_item("drafts").unwrap().as_deref(), Some("ab"));
    }
}
