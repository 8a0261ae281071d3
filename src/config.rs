//! YAML configuration for the whole matching pipeline.
//!
//! One file carries every stage: engine, scan policy, classifier cutoffs,
//! delivery links and catalog storage. Sections that are left out keep
//! their defaults.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "print-campaigns"
//!
//! similarity:
//!   canonical_size: 64
//!   filter: triangle
//!   histogram_bins: 32
//!   edge_operator: sobel
//!   weights:
//!     pixel_error: 0.3
//!     structural: 0.3
//!     distribution: 0.2
//!     edge_pattern: 0.2
//!
//! scan:
//!   threshold: 0.7
//!   parallel: true
//!   max_candidates: 5000
//!   visibility: public_only
//!   noise:
//!     enabled: true
//!     seed: 42
//!     amplitude: 0.01
//!
//! classifier:
//!   high_above: 0.8
//!   medium_above: 0.6
//!   duplicate_above: 0.95
//!
//! delivery:
//!   base_url: "https://dex.example.com"
//!
//! catalog:
//!   backend: "redb"
//!   redb_path: "/data/dex_catalog.redb"
//!   image_root: "/data/extracted_images"
//! ```

use std::fs;
use std::path::Path;

use catalog::{BackendConfig, CatalogConfig};
use delivery::DeliveryConfig;
use matcher::{ClassifierConfig, ScanConfig};
use serde::{Deserialize, Serialize};
use similarity::SimilarityConfig;
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration for the matching pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct DexConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub similarity: SimilarityConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub catalog: CatalogYamlConfig,
}

impl DexConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: DexConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        let section = |name: &str, err: &dyn std::fmt::Display| {
            ConfigLoadError::Validation(format!("{name}: {err}"))
        };
        self.similarity
            .validate()
            .map_err(|e| section("similarity", &e))?;
        self.scan.validate().map_err(|e| section("scan", &e))?;
        self.classifier
            .validate()
            .map_err(|e| section("classifier", &e))?;
        self.delivery
            .validate()
            .map_err(|e| section("delivery", &e))?;
        self.catalog.validate()
    }
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            similarity: SimilarityConfig::default(),
            scan: ScanConfig::default(),
            classifier: ClassifierConfig::default(),
            delivery: DeliveryConfig::default(),
            catalog: CatalogYamlConfig::default(),
        }
    }
}

/// Catalog YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogYamlConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default)]
    pub redb_path: Option<String>,

    #[serde(default = "default_image_root")]
    pub image_root: String,
}

impl CatalogYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_backends = ["in_memory", "redb"];
        if !valid_backends.contains(&self.backend.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "catalog.backend must be one of: {valid_backends:?}"
            )));
        }

        if self.backend == "redb" && self.redb_path.is_none() {
            return Err(ConfigLoadError::Validation(
                "catalog.redb_path is required when backend is 'redb'".to_string(),
            ));
        }

        if self.image_root.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "catalog.image_root must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn to_catalog_config(&self) -> CatalogConfig {
        let backend = match (self.backend.as_str(), &self.redb_path) {
            ("redb", Some(path)) => BackendConfig::redb(path.clone()),
            _ => BackendConfig::in_memory(),
        };
        CatalogConfig::new()
            .with_backend(backend)
            .with_image_root(self.image_root.clone())
    }
}

impl Default for CatalogYamlConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redb_path: None,
            image_root: default_image_root(),
        }
    }
}

fn default_backend() -> String {
    "in_memory".to_string()
}
fn default_image_root() -> String {
    "extracted_images".to_string()
}
