use crate::address::LocaleRegistry;
use crate::error::{Result, ScraperError};
use crate::parser::ColumnMapping;
use crate::pipeline::FailurePolicy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
    pub table: ColumnMapping,
    /// Extra alternate spellings, merged over the built-in registry.
    pub aliases: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub catalog_url: String,
    pub listing_url: String,
    /// Form field carrying the region name in the listing request.
    pub region_field: String,
    pub timeout_seconds: u64,
    /// Pause before each real network fetch. Cache hits never wait.
    pub delay_ms: u64,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            catalog_url: crate::constants::CATALOG_URL.to_string(),
            listing_url: crate::constants::LISTING_URL.to_string(),
            region_field: crate::constants::REGION_FIELD.to_string(),
            timeout_seconds: 30,
            delay_ms: 500,
            user_agent: format!("phlpost_scraper/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub failure_policy: FailurePolicy,
}

impl Config {
    /// Load `config.toml` from the working directory, then apply environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// A missing file is not an error; built-in defaults are used instead.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                ScraperError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            Self::from_toml_str(&content)?
        } else {
            info!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PHLPOST_CATALOG_URL") {
            self.source.catalog_url = v;
        }
        if let Ok(v) = std::env::var("PHLPOST_LISTING_URL") {
            self.source.listing_url = v;
        }
        if let Ok(v) = std::env::var("PHLPOST_CACHE_DIR") {
            self.cache.dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PHLPOST_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(v);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.catalog_url.trim().is_empty() || self.source.listing_url.trim().is_empty() {
            return Err(ScraperError::Config(
                "source.catalog_url and source.listing_url must be set".to_string(),
            ));
        }
        if self.source.timeout_seconds == 0 {
            return Err(ScraperError::Config(
                "source.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        self.table.validate()
    }

    /// Built-in registry with the configured aliases merged in.
    pub fn locale_registry(&self) -> LocaleRegistry {
        let mut registry = LocaleRegistry::builtin();
        registry.extend(self.aliases.clone());
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.source.region_field, crate::constants::REGION_FIELD);
        assert_eq!(config.pipeline.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.table, ColumnMapping::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_sections_and_aliases() {
        let config = Config::from_toml_str(
            r#"
            [source]
            delay_ms = 0

            [pipeline]
            failure_policy = "isolate"

            [table]
            header_label = "Post Office Name"

            [aliases]
            "Cotabato City" = ["Cot. City"]
            "#,
        )
        .unwrap();

        assert_eq!(config.source.delay_ms, 0);
        assert_eq!(config.source.timeout_seconds, 30);
        assert_eq!(config.pipeline.failure_policy, FailurePolicy::Isolate);
        assert_eq!(config.table.header_label, "Post Office Name");

        let registry = config.locale_registry();
        let aliases: Vec<&str> = registry.aliases_for("Cotabato City").collect();
        assert!(aliases.contains(&"Cot. City"));
        assert!(aliases.contains(&"Cotabato Citu"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = Config::from_toml_str("[source]\ntimeout_seconds = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ScraperError::Config(_))));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.source.timeout_seconds, 30);
    }
}
