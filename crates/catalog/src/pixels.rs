//! Resolving image locators to encoded raster bytes.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PixelError {
    #[error("no raster stored at '{locator}'")]
    NotFound { locator: String },
    #[error("locator '{locator}' is not a relative path inside the image root")]
    InvalidLocator { locator: String },
    #[error("i/o error on '{locator}': {message}")]
    Io { locator: String, message: String },
}

/// Storage for the encoded rasters behind [`crate::ReferenceImage::locator`].
pub trait PixelSource: Send + Sync {
    /// Encoded bytes for `locator`.
    fn load(&self, locator: &str) -> Result<Vec<u8>, PixelError>;

    /// Store bytes under `locator`, replacing what was there.
    fn store(&self, locator: &str, bytes: &[u8]) -> Result<(), PixelError>;

    /// Drop the bytes for `locator`. Missing entries are not an error.
    fn remove(&self, locator: &str) -> Result<(), PixelError>;
}

/// Files below a root directory; locators are relative paths.
#[derive(Debug, Clone)]
pub struct FsPixelSource {
    root: PathBuf,
}

impl FsPixelSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, locator: &str) -> Result<PathBuf, PixelError> {
        let relative = Path::new(locator);
        let clean = !locator.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !clean {
            return Err(PixelError::InvalidLocator {
                locator: locator.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }

    fn io_error(locator: &str, err: std::io::Error) -> PixelError {
        if err.kind() == ErrorKind::NotFound {
            PixelError::NotFound {
                locator: locator.to_string(),
            }
        } else {
            PixelError::Io {
                locator: locator.to_string(),
                message: err.to_string(),
            }
        }
    }
}

impl PixelSource for FsPixelSource {
    fn load(&self, locator: &str) -> Result<Vec<u8>, PixelError> {
        let path = self.resolve(locator)?;
        fs::read(&path).map_err(|e| Self::io_error(locator, e))
    }

    fn store(&self, locator: &str, bytes: &[u8]) -> Result<(), PixelError> {
        let path = self.resolve(locator)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(locator, e))?;
        }
        fs::write(&path, bytes).map_err(|e| Self::io_error(locator, e))
    }

    fn remove(&self, locator: &str) -> Result<(), PixelError> {
        let path = self.resolve(locator)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(locator, e)),
        }
    }
}

/// Rasters held in memory, keyed by locator.
#[derive(Debug, Default)]
pub struct MemoryPixelSource {
    images: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryPixelSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, locator: impl Into<String>, bytes: Vec<u8>) {
        if let Ok(mut guard) = self.images.write() {
            guard.insert(locator.into(), bytes);
        }
    }

    pub fn len(&self) -> usize {
        self.images.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned(locator: &str) -> PixelError {
        PixelError::Io {
            locator: locator.to_string(),
            message: "poisoned lock".to_string(),
        }
    }
}

impl PixelSource for MemoryPixelSource {
    fn load(&self, locator: &str) -> Result<Vec<u8>, PixelError> {
        let guard = self.images.read().map_err(|_| Self::poisoned(locator))?;
        guard
            .get(locator)
            .cloned()
            .ok_or_else(|| PixelError::NotFound {
                locator: locator.to_string(),
            })
    }

    fn store(&self, locator: &str, bytes: &[u8]) -> Result<(), PixelError> {
        self.images
            .write()
            .map_err(|_| Self::poisoned(locator))?
            .insert(locator.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, locator: &str) -> Result<(), PixelError> {
        self.images
            .write()
            .map_err(|_| Self::poisoned(locator))?
            .remove(locator);
        Ok(())
    }
}
