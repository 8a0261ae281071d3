use crate::CatalogError;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Key-value storage underneath the catalog.
///
/// Keys are UTF-8 strings grouped by a prefix (`image/`, `content/`,
/// `meta/`); values are encoded records. Implementations must be safe to
/// share between the request handlers and the scan threads.
pub trait CatalogBackend: Send + Sync {
    /// Insert or update a key-value pair.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), CatalogError>;
    /// Retrieve a value by key.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CatalogError>;
    /// Delete a key-value pair. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), CatalogError>;
    /// Apply several puts and deletes as one unit.
    fn batch(&self, puts: Vec<(String, Vec<u8>)>, deletes: Vec<String>) -> Result<(), CatalogError>;
    /// Visit every entry whose key starts with `prefix`, in key order.
    fn scan_prefix(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), CatalogError>,
    ) -> Result<(), CatalogError>;
    /// Flush any buffered writes to the backend.
    fn flush(&self) -> Result<(), CatalogError> {
        Ok(())
    }
}

/// Selects and builds a backend.
///
/// ```
/// use catalog::BackendConfig;
///
/// let config = BackendConfig::in_memory();
/// let config = BackendConfig::redb("/data/dex_catalog.redb");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackendConfig {
    /// Redb file at `path`. Requires the `backend-redb` feature (on by default).
    Redb { path: String },
    /// Ephemeral map, used by tests and the demo binary.
    #[default]
    InMemory,
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    pub fn build(&self) -> Result<Box<dyn CatalogBackend>, CatalogError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(CatalogError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

/// In-memory backend: an ordered map behind a `RwLock`.
pub struct InMemoryBackend {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBackend for InMemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), CatalogError> {
        self.records
            .write()
            .map_err(|_| CatalogError::backend("poisoned lock"))?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CatalogError> {
        let guard = self
            .records
            .read()
            .map_err(|_| CatalogError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), CatalogError> {
        self.records
            .write()
            .map_err(|_| CatalogError::backend("poisoned lock"))?
            .remove(key);
        Ok(())
    }

    fn batch(&self, puts: Vec<(String, Vec<u8>)>, deletes: Vec<String>) -> Result<(), CatalogError> {
        // One write guard for the whole batch so readers never see half of it.
        let mut guard = self
            .records
            .write()
            .map_err(|_| CatalogError::backend("poisoned lock"))?;
        for key in deletes {
            guard.remove(&key);
        }
        for (key, value) in puts {
            guard.insert(key, value);
        }
        Ok(())
    }

    fn scan_prefix(
        &self,
        prefix: &str,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), CatalogError>,
    ) -> Result<(), CatalogError> {
        let guard = self
            .records
            .read()
            .map_err(|_| CatalogError::backend("poisoned lock"))?;
        for (key, value) in guard.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            visitor(key, value)?;
        }
        Ok(())
    }
}

#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use self::redb::RedbBackend;
