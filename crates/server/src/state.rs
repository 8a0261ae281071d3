use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use catalog::{BusinessRef, Catalog, CatalogStore, PixelSource};
use dashmap::DashMap;
use delivery::ContentResolver;
use dexmatch::{DexConfig, MatchPipeline};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: API key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, Instant)>>,

    /// Catalog of reference images and their content
    pub catalog: Arc<Catalog>,

    /// Rasters behind the catalog's locators
    pub pixels: Arc<dyn PixelSource>,

    /// Match pipeline over `catalog` and `pixels`
    pub pipeline: Arc<MatchPipeline>,

    /// Delivery links and envelopes, configured like the pipeline's
    pub resolver: ContentResolver,

    /// Set when the state was built
    pub started_at: Instant,
}

impl ServerState {
    /// Open the catalog and pixel store named by the pipeline config.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let dex = config.dex_config()?;
        let catalog_cfg = dex.catalog.to_catalog_config();
        let catalog = Arc::new(catalog_cfg.open()?);
        let pixels: Arc<dyn PixelSource> = Arc::new(catalog_cfg.pixel_source());
        Self::with_parts(config, &dex, catalog, pixels)
    }

    /// Build state around an already opened catalog and pixel store.
    pub fn with_parts(
        config: ServerConfig,
        dex: &DexConfig,
        catalog: Arc<Catalog>,
        pixels: Arc<dyn PixelSource>,
    ) -> ServerResult<Self> {
        let store: Arc<dyn CatalogStore> = catalog.clone();
        let pipeline = MatchPipeline::new(dex, store, Arc::clone(&pixels))
            .map_err(|e| ServerError::Config(e.to_string()))?;
        let resolver = pipeline.resolver().clone();

        Ok(Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            catalog,
            pixels,
            pipeline: Arc::new(pipeline),
            resolver,
            started_at: Instant::now(),
        })
    }

    /// Check if API key is valid
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        self.config.api_keys.contains_key(key)
    }

    /// Business the key acts for, if the key is known.
    pub fn business_for_key(&self, key: &str) -> Option<BusinessRef> {
        self.config.api_keys.get(key).map(|entry| entry.business())
    }

    /// Check rate limit for API key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }

    /// Business behind `reference`: a configured key's entry wins, otherwise
    /// the name recorded on its cataloged images.
    pub fn find_business(&self, reference: &str) -> ServerResult<Option<BusinessRef>> {
        if let Some(entry) = self
            .config
            .api_keys
            .values()
            .find(|entry| entry.business_reference == reference)
        {
            return Ok(Some(entry.business()));
        }
        Ok(self
            .catalog
            .images_for_business(reference)?
            .into_iter()
            .next()
            .map(|image| BusinessRef::new(image.business_reference, image.business_name)))
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
