//! Airport catalog: the reference set of known airports
//!
//! The catalog keeps airports in seed order and indexes them by IATA code.
//! Seeding is an idempotent upsert keyed on the code.

use crate::IataCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const BUNDLED_AIRPORTS: &str = include_str!("data/airports.json");

/// Errors raised while loading or seeding reference data
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid IATA code in reference data: {0:?}")]
    InvalidCode(String),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "sled-store")]
    #[error("Catalog store error: {0}")]
    Store(#[from] sled::Error),
}

/// A single airport row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub iata_code: IataCode,
    pub name: String,
    pub city: String,
    pub country: String,
    pub popularity: i32,
}

/// Seed record as stored in JSON seed files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportRecord {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    #[serde(rename = "pop", alias = "popularity", default)]
    pub popularity: i32,
}

impl TryFrom<AirportRecord> for Airport {
    type Error = CatalogError;

    fn try_from(record: AirportRecord) -> Result<Self, Self::Error> {
        let iata_code =
            IataCode::parse(&record.code).map_err(|_| CatalogError::InvalidCode(record.code))?;
        Ok(Airport {
            iata_code,
            name: record.name,
            city: record.city,
            country: record.country,
            popularity: record.popularity,
        })
    }
}

impl From<&Airport> for AirportRecord {
    fn from(airport: &Airport) -> Self {
        AirportRecord {
            code: airport.iata_code.to_string(),
            name: airport.name.clone(),
            city: airport.city.clone(),
            country: airport.country.clone(),
            popularity: airport.popularity,
        }
    }
}

/// Outcome of a seeding run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    /// Rows that did not exist before
    pub inserted: usize,
    /// Existing rows whose fields were overwritten
    pub updated: usize,
}

/// In-memory airport catalog
#[derive(Debug, Clone, Default)]
pub struct AirportCatalog {
    airports: Vec<Airport>,
    index: HashMap<IataCode, usize>,
}

impl AirportCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog seeded with the airports bundled in the crate
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json_str(BUNDLED_AIRPORTS)
    }

    /// Seed records bundled in the crate
    pub fn bundled_records() -> Result<Vec<AirportRecord>, CatalogError> {
        parse_records(BUNDLED_AIRPORTS)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        catalog.seed(parse_records(json)?)?;
        Ok(catalog)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        catalog.seed(read_records(path)?)?;
        Ok(catalog)
    }

    /// Upsert every record keyed on its IATA code.
    ///
    /// All records are validated before any row is touched, so an invalid
    /// code leaves the catalog unchanged.
    pub fn seed<I>(&mut self, records: I) -> Result<SeedReport, CatalogError>
    where
        I: IntoIterator<Item = AirportRecord>,
    {
        let airports = records
            .into_iter()
            .map(Airport::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut report = SeedReport::default();
        for airport in airports {
            let code = airport.iata_code.clone();
            if self.upsert(airport) {
                debug!(code = %code, "Added airport");
                report.inserted += 1;
            } else {
                report.updated += 1;
            }
        }

        info!(
            inserted = report.inserted,
            updated = report.updated,
            total = self.airports.len(),
            "Catalog seeded"
        );
        Ok(report)
    }

    /// Insert the airport, or overwrite the mutable fields of an existing
    /// row with the same code. Returns `true` when a new row was created.
    pub fn upsert(&mut self, airport: Airport) -> bool {
        match self.index.get(&airport.iata_code) {
            Some(&i) => {
                self.airports[i] = airport;
                false
            }
            None => {
                self.index
                    .insert(airport.iata_code.clone(), self.airports.len());
                self.airports.push(airport);
                true
            }
        }
    }

    /// Look up an airport by code, ignoring case
    pub fn get(&self, code: &str) -> Option<&Airport> {
        let code = code.trim().to_uppercase();
        self.index.get(code.as_str()).map(|&i| &self.airports[i])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Display name for a code; unknown codes fall back to the code itself.
    pub fn display_name(&self, code: &str) -> String {
        match self.get(code) {
            Some(airport) => airport.name.clone(),
            None => {
                debug!(code = code, "Airport not in catalog, displaying raw code");
                code.to_string()
            }
        }
    }

    /// All airports in seed order
    pub fn airports(&self) -> &[Airport] {
        &self.airports
    }

    pub fn iter(&self) -> impl Iterator<Item = &Airport> {
        self.airports.iter()
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }
}

pub fn parse_records(json: &str) -> Result<Vec<AirportRecord>, CatalogError> {
    Ok(serde_json::from_str(json)?)
}

pub fn read_records(path: &Path) -> Result<Vec<AirportRecord>, CatalogError> {
    let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(&json)
}
