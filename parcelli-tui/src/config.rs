//! TOML configuration: shipments to follow, polling interval, and provider credentials.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use std::{env, fs, io};

use parcelli_core::{PortError, ShipmentRequest, ShipmentSource};
use regex::{Captures, Regex};
use serde::Deserialize;

const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_FETCH_INTERVAL_MS: u64 = 60 * 60 * 1000;

static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid variable pattern")
});

#[derive(thiserror::Error, Debug)]
pub(crate) enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("environment variable {0} is not set")]
    MissingVariable(String),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TrackerConfig {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_fetch_interval_ms")]
    pub fetch_interval_ms: u64,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub shipments: Vec<ShipmentRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ProvidersConfig {
    #[serde(default)]
    pub parcelsapp: ProviderCredentials,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ProviderCredentials {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_owned()
}

fn default_fetch_interval_ms() -> u64 {
    DEFAULT_FETCH_INTERVAL_MS
}

impl TrackerConfig {
    pub(crate) fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, |name| env::var(name).ok())
    }

    /// Parse a configuration, resolving `${VAR}` references through `lookup`.
    pub(crate) fn from_toml_str<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let substituted = substitute_vars(content, lookup)?;
        let config: Self = toml::from_str(&substituted)?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn fetch_interval(&self) -> Duration {
        Duration::from_millis(self.fetch_interval_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "fetch_interval_ms must be greater than zero".to_owned(),
            ));
        }

        let mut seen = HashSet::new();
        for shipment in &self.shipments {
            if shipment.code.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "shipment code must not be empty".to_owned(),
                ));
            }
            if !seen.insert(shipment.code.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "shipment code {} is declared twice",
                    shipment.code
                )));
            }
        }
        Ok(())
    }
}

fn substitute_vars<F>(content: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = None;
    let substituted = ENV_REFERENCE.replace_all(content, |caps: &Captures<'_>| {
        let name = caps.get(1).map_or("", |name| name.as_str());
        lookup(name).unwrap_or_else(|| {
            missing.get_or_insert_with(|| name.to_owned());
            String::new()
        })
    });
    match missing {
        Some(name) => Err(ConfigError::MissingVariable(name)),
        None => Ok(substituted.into_owned()),
    }
}

/// Re-reads the shipment list from the configuration file on every cycle.
pub(crate) struct FileShipmentSource {
    path: PathBuf,
}

impl FileShipmentSource {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ShipmentSource for FileShipmentSource {
    fn shipments(&self) -> Result<Vec<ShipmentRequest>, PortError> {
        TrackerConfig::from_file(&self.path)
            .map(|config| config.shipments)
            .map_err(|err| PortError::Configuration(err.to_string()))
    }
}
