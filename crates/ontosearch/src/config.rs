//! Search backend configuration.
//!
//! The configuration is a plain serde document. It is what the CLI writes
//! out after a successful activation, and what hosts load to build the
//! client and the service.
//!
//! # Example
//!
//! ```rust
//! use ontosearch::SearchConfig;
//!
//! let config = SearchConfig {
//!     hosts: vec!["http://search.internal:9200".to_string()],
//!     batch_size: 500,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::routing::RoutingTable;

/// Default engine endpoint.
pub const DEFAULT_HOST: &str = "http://localhost:9200";

/// Authentication against the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchAuth {
    /// Basic username/password authentication.
    Basic { username: String, password: String },
    /// Bearer token authentication.
    Bearer { token: String },
}

/// Edge n-gram bounds of the `autocomplete` analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteSettings {
    #[serde(default = "default_min_gram")]
    pub min_gram: u32,
    #[serde(default = "default_max_gram")]
    pub max_gram: u32,
}

impl Default for AutocompleteSettings {
    fn default() -> Self {
        Self {
            min_gram: default_min_gram(),
            max_gram: default_max_gram(),
        }
    }
}

/// Configuration of the search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Engine node URLs. Only the first one is used (single-node pool).
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    #[serde(default)]
    pub auth: Option<SearchAuth>,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Whether to disable certificate validation (default: false).
    /// Only use for development/testing.
    #[serde(default)]
    pub disable_certificate_validation: bool,

    /// Index definition file; the built-in definitions are used when unset.
    #[serde(default)]
    pub index_file: Option<PathBuf>,

    /// Documents per bulk request (default: 100).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_shards")]
    pub number_of_shards: u32,

    #[serde(default = "default_replicas")]
    pub number_of_replicas: u32,

    #[serde(default)]
    pub autocomplete: AutocompleteSettings,

    /// Resource type to index routing.
    #[serde(default)]
    pub routing: RoutingTable,
}

fn default_hosts() -> Vec<String> {
    vec![DEFAULT_HOST.to_string()]
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_batch_size() -> usize {
    100
}

fn default_shards() -> u32 {
    1
}

fn default_replicas() -> u32 {
    1
}

fn default_min_gram() -> u32 {
    1
}

fn default_max_gram() -> u32 {
    100
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            auth: None,
            request_timeout_ms: default_request_timeout_ms(),
            disable_certificate_validation: false,
            index_file: None,
            batch_size: default_batch_size(),
            number_of_shards: default_shards(),
            number_of_replicas: default_replicas(),
            autocomplete: AutocompleteSettings::default(),
            routing: RoutingTable::default(),
        }
    }
}

impl SearchConfig {
    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let raw = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(path, raw).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Replaces the engine host with `url`, appending `port` when the URL
    /// does not carry one already.
    pub fn with_host(mut self, url: &str, port: Option<u16>) -> Self {
        let url = url.trim_end_matches('/');
        let authority = url.split_once("://").map_or(url, |(_, rest)| rest);
        let host = match port {
            Some(port) if !authority.contains(':') => format!("{url}:{port}"),
            _ => url.to_string(),
        };
        self.hosts = vec![host];
        self
    }

    /// Returns the first configured host.
    pub fn primary_host(&self) -> &str {
        self.hosts.first().map(String::as_str).unwrap_or(DEFAULT_HOST)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.hosts.is_empty() {
            errors.push("at least one host is required".to_string());
        }

        if self.batch_size == 0 {
            errors.push("batch size cannot be 0".to_string());
        }

        if self.request_timeout_ms == 0 {
            errors.push("request timeout cannot be 0".to_string());
        }

        if self.autocomplete.min_gram == 0 || self.autocomplete.min_gram > self.autocomplete.max_gram {
            errors.push("autocomplete min_gram must be between 1 and max_gram".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.primary_host(), DEFAULT_HOST);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.autocomplete.max_gram, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: SearchConfig =
            serde_json::from_str(r#"{"hosts": ["http://es:9200"], "batch_size": 10}"#).unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.request_timeout_ms, 30000);
        assert_eq!(config.routing, RoutingTable::default());
    }

    #[test]
    fn test_with_host() {
        let config = SearchConfig::default().with_host("http://es", Some(9201));
        assert_eq!(config.primary_host(), "http://es:9201");

        let config = SearchConfig::default().with_host("http://es:9300/", Some(9201));
        assert_eq!(config.primary_host(), "http://es:9300");

        let config = SearchConfig::default().with_host("https://es", None);
        assert_eq!(config.primary_host(), "https://es");
    }

    #[test]
    fn test_validate_invalid() {
        let config = SearchConfig {
            batch_size: 0,
            hosts: vec![],
            ..Default::default()
        };
        let Err(ConfigError::Invalid(message)) = config.validate() else {
            panic!("expected invalid configuration");
        };
        assert!(message.contains("batch size"));
        assert!(message.contains("host"));
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.json");
        let config = SearchConfig {
            auth: Some(SearchAuth::Basic {
                username: "elastic".into(),
                password: "secret".into(),
            }),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(SearchConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(SearchConfig::load(&missing), Err(ConfigError::Io { .. })));

        let broken = dir.path().join("broken.json");
        std::fs::File::create(&broken)
            .unwrap()
            .write_all(b"{ not json")
            .unwrap();
        assert!(matches!(SearchConfig::load(&broken), Err(ConfigError::Parse { .. })));
    }
}
