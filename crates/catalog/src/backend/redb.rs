//! Redb backend for the catalog.
//!
//! Every call runs in its own transaction; writes are durable once the call
//! returns, so [`CatalogBackend::flush`] has nothing to do.
//!
//! ```yaml
//! catalog:
//!   backend: "redb"
//!   path: "/data/dex_catalog.redb"
//! ```

use crate::{CatalogBackend, CatalogError};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const CATALOG_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("dex_catalog");

/// Persistent catalog storage in a single redb file.
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open or create the database at `path` and make sure the table exists.
    ///
    /// ```no_run
    /// use catalog::RedbBackend;
    ///
    /// let backend = RedbBackend::open("/tmp/dex_catalog.redb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let db = Database::create(path).map_err(CatalogError::backend)?;
        let write_txn = db.begin_write().map_err(CatalogError::backend)?;
        {
            let _table = write_txn
                .open_table(CATALOG_TABLE)
                .map_err(CatalogError::backend)?;
        }
        write_txn.commit().map_err(CatalogError::backend)?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl CatalogBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), CatalogError> {
        self.batch(vec![(key.to_string(), value.to_vec())], Vec::new())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CatalogError> {
        let read_txn = self.db.begin_read().map_err(CatalogError::backend)?;
        let table = read_txn
            .open_table(CATALOG_TABLE)
            .map_err(CatalogError::backend)?;
        let value = table.get(key).map_err(CatalogError::backend)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn delete(&self, key: &str) -> Result<(), CatalogError> {
        self.batch(Vec::new(), vec![key.to_string()])
    }

    fn batch(&self, puts: Vec<(String, Vec<u8>)>, deletes: Vec<String>) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write().map_err(CatalogError::backend)?;
        {
            let mut table = write_txn
                .open_table(CATALOG_TABLE)
                .map_err(CatalogError::backend)?;
            for key in &deletes {
                table.remove(key.as_str()).map_err(CatalogError::backend)?;
            }
            for (key, value) in &puts {
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(CatalogError::backend)?;
            }
        }
        write_txn.commit().map_err(CatalogError::backend)?;
        Ok(())
    }

    fn scan_prefix(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), CatalogError>,
    ) -> Result<(), CatalogError> {
        let read_txn = self.db.begin_read().map_err(CatalogError::backend)?;
        let table = read_txn
            .open_table(CATALOG_TABLE)
            .map_err(CatalogError::backend)?;
        for item in table.range(prefix..).map_err(CatalogError::backend)? {
            let (key, value) = item.map_err(CatalogError::backend)?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            visitor(key, value.value())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn put_get_delete() {
        let temp_file = NamedTempFile::new().unwrap();
        let backend = RedbBackend::open(temp_file.path()).unwrap();

        backend.put("image/1", b"one").unwrap();
        assert_eq!(backend.get("image/1").unwrap(), Some(b"one".to_vec()));
        assert_eq!(backend.get("image/2").unwrap(), None);

        backend.delete("image/1").unwrap();
        assert_eq!(backend.get("image/1").unwrap(), None);
    }

    #[test]
    fn batch_is_applied_together() {
        let temp_file = NamedTempFile::new().unwrap();
        let backend = RedbBackend::open(temp_file.path()).unwrap();
        backend.put("content/1", b"old").unwrap();

        backend
            .batch(
                vec![("image/3".into(), b"three".to_vec())],
                vec!["content/1".into()],
            )
            .unwrap();

        assert_eq!(backend.get("content/1").unwrap(), None);
        assert_eq!(backend.get("image/3").unwrap(), Some(b"three".to_vec()));
    }

    #[test]
    fn scan_prefix_filters_other_groups() {
        let temp_file = NamedTempFile::new().unwrap();
        let backend = RedbBackend::open(temp_file.path()).unwrap();
        backend.put("image/1", b"a").unwrap();
        backend.put("image/2", b"b").unwrap();
        backend.put("content/1", b"c").unwrap();
        backend.put("imagf/1", b"d").unwrap();
        backend.put("meta/next_image_id", b"3").unwrap();

        let mut keys = Vec::new();
        backend
            .scan_prefix("image/", &mut |key, _| {
                keys.push(key.to_string());
                Ok(())
            })
            .unwrap();
        assert_eq!(keys, vec!["image/1".to_string(), "image/2".to_string()]);
    }

    #[test]
    fn data_survives_reopen() {
        let temp_file = NamedTempFile::new().unwrap();
        {
            let backend = RedbBackend::open(temp_file.path()).unwrap();
            backend.put("meta/next_image_id", b"7").unwrap();
        }
        let backend = RedbBackend::open(temp_file.path()).unwrap();
        assert_eq!(backend.get("meta/next_image_id").unwrap(), Some(b"7".to_vec()));
    }
}
