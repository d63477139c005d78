//! Configuration types for httpconsole.
//!
//! A YAML file provides the base; the binary layers CLI flags and environment
//! variables on top and calls [`Config::validate`] once everything is merged.

mod listen;
mod store;

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub use listen::ListenConfig;
pub use store::{RedisConfig, StoreBackend, StoreConfig};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub store: StoreConfig,
    /// Disable per-request access logging
    #[serde(default)]
    pub quiet: bool,
}

impl Config {
    /// Parse a YAML config file. Not validated, since overrides may follow.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.store.backend == StoreBackend::Redis {
            match &self.store.redis {
                Some(redis) if !redis.url.trim().is_empty() => {}
                _ => anyhow::bail!("no redis config"),
            }
        }

        if self.listen.port_mask == Some(0) {
            anyhow::bail!("listen.port_mask must be a non-zero port");
        }

        Ok(())
    }

    /// Port advertised in absolute URLs.
    pub fn public_port(&self) -> u16 {
        self.listen.public_port()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
listen:
  host: 127.0.0.1
  port: 3000
  port_mask: 80
store:
  backend: redis
  redis:
    url: "redis://localhost:6379"
quiet: true
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.listen.host, "127.0.0.1");
        assert_eq!(config.listen.port, 3000);
        assert_eq!(config.public_port(), 80);
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(
            config.store.redis.as_ref().unwrap().url,
            "redis://localhost:6379"
        );
        assert_eq!(config.store.redis.as_ref().unwrap().key_prefix, "");
        assert!(config.quiet);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.listen.host, "0.0.0.0");
        assert_eq!(config.listen.port, 8080);
        assert_eq!(config.public_port(), 8080);
        assert_eq!(config.listen.bind_address(), "0.0.0.0:8080");
        assert!(!config.quiet);
    }

    #[test]
    fn test_redis_backend_requires_url() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "no redis config");

        let mut config = Config::default();
        config.store.redis = Some(RedisConfig::new("  "));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inmemory_needs_no_redis() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Inmemory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_port_mask_rejected() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Inmemory;
        config.listen.port_mask = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "listen:\n  port: 9999\nstore:\n  backend: inmemory").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.listen.port, 9999);
        assert_eq!(config.store.backend, StoreBackend::Inmemory);
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
