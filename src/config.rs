//! Environment-backed configuration

use crate::amadeus::{AmadeusSettings, DEFAULT_BASE_URL};
use crate::catalog::{read_records, AirportCatalog, AirportRecord, CatalogError};
use crate::resolver::AliasTable;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for environment variable {var}: {reason}")]
    InvalidEnvValue { var: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub amadeus_client_id: Option<String>,
    pub amadeus_client_secret: Option<String>,
    pub amadeus_base_url: String,
    /// Seed file replacing the bundled airports
    pub catalog_path: Option<PathBuf>,
    /// Alias file replacing the bundled alias table
    pub aliases_path: Option<PathBuf>,
    pub request_timeout: Duration,
    /// Reject 3-letter inputs that are not in the catalog
    pub strict_codes: bool,
    pub log_dir: PathBuf,
    pub store_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            amadeus_client_id: None,
            amadeus_client_secret: None,
            amadeus_base_url: DEFAULT_BASE_URL.to_string(),
            catalog_path: None,
            aliases_path: None,
            request_timeout: Duration::from_secs(30),
            strict_codes: false,
            log_dir: PathBuf::from("logs"),
            store_path: PathBuf::from("data/catalog.sled"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let request_timeout = match get("FLIGHT_FINDER_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvValue {
                    var: "FLIGHT_FINDER_TIMEOUT_SECS".to_string(),
                    reason: e.to_string(),
                }
            })?),
            None => defaults.request_timeout,
        };

        let strict_codes = match get("FLIGHT_FINDER_STRICT_CODES") {
            Some(raw) => parse_bool("FLIGHT_FINDER_STRICT_CODES", &raw)?,
            None => defaults.strict_codes,
        };

        Ok(Self {
            amadeus_client_id: get("AMADEUS_CLIENT_ID"),
            amadeus_client_secret: get("AMADEUS_CLIENT_SECRET"),
            amadeus_base_url: get("AMADEUS_BASE_URL").unwrap_or(defaults.amadeus_base_url),
            catalog_path: get("FLIGHT_FINDER_CATALOG").map(PathBuf::from),
            aliases_path: get("FLIGHT_FINDER_ALIASES").map(PathBuf::from),
            request_timeout,
            strict_codes,
            log_dir: get("FLIGHT_FINDER_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            store_path: get("FLIGHT_FINDER_STORE")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
        })
    }

    /// Credentials are only required once a flight search is attempted.
    pub fn amadeus_settings(&self) -> Result<AmadeusSettings, ConfigError> {
        let client_id = self
            .amadeus_client_id
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("AMADEUS_CLIENT_ID".to_string()))?;
        let client_secret = self
            .amadeus_client_secret
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar("AMADEUS_CLIENT_SECRET".to_string()))?;

        Ok(AmadeusSettings {
            client_id,
            client_secret,
            base_url: self.amadeus_base_url.clone(),
            timeout: self.request_timeout,
        })
    }

    /// Catalog used by the searches.
    ///
    /// An explicit seed file wins. With the `sled-store` feature a seeded
    /// store at `store_path` comes next, then the bundled airports.
    pub fn load_catalog(&self) -> Result<AirportCatalog, CatalogError> {
        if let Some(path) = &self.catalog_path {
            return AirportCatalog::from_json_file(path);
        }

        if let Some(catalog) = self.load_stored_catalog()? {
            return Ok(catalog);
        }

        debug!("Using bundled airports");
        AirportCatalog::bundled()
    }

    #[cfg(feature = "sled-store")]
    fn load_stored_catalog(&self) -> Result<Option<AirportCatalog>, CatalogError> {
        if !self.store_path.exists() {
            return Ok(None);
        }
        let catalog = crate::store::CatalogStore::open(&self.store_path)?.load_catalog()?;
        if catalog.is_empty() {
            debug!(path = %self.store_path.display(), "Catalog store is empty");
            return Ok(None);
        }
        debug!(
            path = %self.store_path.display(),
            airports = catalog.len(),
            "Using seeded catalog store"
        );
        Ok(Some(catalog))
    }

    #[cfg(not(feature = "sled-store"))]
    fn load_stored_catalog(&self) -> Result<Option<AirportCatalog>, CatalogError> {
        Ok(None)
    }

    /// Records a seeding run writes: the seed file when set, else the bundled set
    pub fn load_seed_records(&self) -> Result<Vec<AirportRecord>, CatalogError> {
        match &self.catalog_path {
            Some(path) => read_records(path),
            None => AirportCatalog::bundled_records(),
        }
    }

    pub fn load_aliases(&self) -> Result<AliasTable, CatalogError> {
        match &self.aliases_path {
            Some(path) => AliasTable::from_json_file(path),
            None => AliasTable::bundled(),
        }
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvValue {
            var: var.to_string(),
            reason: format!("expected a boolean, got {:?}", other),
        }),
    }
}
