use catalog::ContentId;
use serde::{Deserialize, Serialize};

use crate::DeliveryError;

/// Where delivery links point.
///
/// Every link is `base_url` followed by one of the route prefixes. An empty
/// `base_url` yields host-relative links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub base_url: String,
    pub deliver_path: String,
    pub ar_path: String,
    pub qr_path: String,
    pub business_path: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            deliver_path: "/dex/deliver".into(),
            ar_path: "/dex/ar".into(),
            qr_path: "/dex/qr".into(),
            business_path: "/business".into(),
        }
    }
}

impl DeliveryConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn validate(&self) -> Result<(), DeliveryError> {
        for (name, path) in [
            ("deliver_path", &self.deliver_path),
            ("ar_path", &self.ar_path),
            ("qr_path", &self.qr_path),
            ("business_path", &self.business_path),
        ] {
            if !path.starts_with('/') || path.len() < 2 || path.ends_with('/') {
                return Err(DeliveryError::InvalidConfig(format!(
                    "{name} must look like '/segment', got '{path}'"
                )));
            }
        }
        if self.base_url.chars().any(char::is_whitespace) {
            return Err(DeliveryError::InvalidConfig(
                "base_url must not contain whitespace".into(),
            ));
        }
        Ok(())
    }
}

/// Builds the links embedded in envelopes.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base: String,
    cfg: DeliveryConfig,
}

impl LinkBuilder {
    pub fn new(cfg: DeliveryConfig) -> Self {
        let base = cfg.base_url.trim_end_matches('/').to_string();
        Self { base, cfg }
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.cfg
    }

    pub fn direct(&self, id: ContentId) -> String {
        format!("{}{}/{id}", self.base, self.cfg.deliver_path)
    }

    pub fn ar(&self, id: ContentId) -> String {
        format!("{}{}/{id}", self.base, self.cfg.ar_path)
    }

    pub fn qr(&self, id: ContentId) -> String {
        format!("{}{}/{id}", self.base, self.cfg.qr_path)
    }

    pub fn business_landing(&self, business_reference: &str) -> String {
        format!("{}{}/{business_reference}", self.base, self.cfg.business_path)
    }

    pub fn business_qr(&self, business_reference: &str) -> String {
        format!("{}{}/business/{business_reference}", self.base, self.cfg.qr_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_links_are_host_relative() {
        let links = LinkBuilder::new(DeliveryConfig::default());
        assert_eq!(links.direct(7), "/dex/deliver/7");
        assert_eq!(links.ar(7), "/dex/ar/7");
        assert_eq!(links.qr(7), "/dex/qr/7");
        assert_eq!(links.business_landing("acme"), "/business/acme");
        assert_eq!(links.business_qr("acme"), "/dex/qr/business/acme");
    }

    #[test]
    fn base_url_is_prefixed_once() {
        let links = LinkBuilder::new(DeliveryConfig::default().with_base_url("https://dex.example/"));
        assert_eq!(links.direct(3), "https://dex.example/dex/deliver/3");
    }

    #[test]
    fn malformed_paths_rejected() {
        let mut cfg = DeliveryConfig::default();
        cfg.ar_path = "dex/ar".into();
        assert!(cfg.validate().is_err());
        cfg.ar_path = "/dex/ar/".into();
        assert!(cfg.validate().is_err());
        assert!(DeliveryConfig::default().validate().is_ok());
        assert!(DeliveryConfig::default().with_base_url("http://a b").validate().is_err());
    }
}
