//! On-disk catalog persistence backed by a `sled` tree keyed by IATA code

use crate::catalog::{AirportCatalog, AirportRecord, CatalogError, SeedReport};
use crate::config::Config;
use crate::Airport;
use std::path::Path;
use tracing::{debug, info};

const AIRPORTS_TREE: &str = "airports";

pub struct CatalogStore {
    db: sled::Db,
    airports: sled::Tree,
}

impl CatalogStore {
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        info!(path = %path.display(), "Opening catalog store");
        Self::from_db(sled::open(path)?)
    }

    /// Store that is removed when dropped
    pub fn temporary() -> Result<Self, CatalogError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, CatalogError> {
        let airports = db.open_tree(AIRPORTS_TREE)?;
        Ok(Self { db, airports })
    }

    /// Upsert every record keyed on its code.
    ///
    /// All records are validated before anything is written, so a bad code
    /// leaves the store untouched.
    pub fn seed(&self, records: &[AirportRecord]) -> Result<SeedReport, CatalogError> {
        let airports = records
            .iter()
            .cloned()
            .map(Airport::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut report = SeedReport::default();
        for airport in &airports {
            let value = serde_json::to_vec(&AirportRecord::from(airport))?;
            match self.airports.insert(airport.iata_code.as_str(), value)? {
                Some(_) => report.updated += 1,
                None => report.inserted += 1,
            }
        }

        debug!(
            inserted = report.inserted,
            updated = report.updated,
            "Seeded catalog store"
        );
        Ok(report)
    }

    /// Build an in-memory catalog from the stored rows, in code order.
    pub fn load_catalog(&self) -> Result<AirportCatalog, CatalogError> {
        let mut records = Vec::with_capacity(self.airports.len());
        for entry in self.airports.iter() {
            let (_, value) = entry?;
            records.push(serde_json::from_slice::<AirportRecord>(&value)?);
        }

        let mut catalog = AirportCatalog::new();
        catalog.seed(records)?;
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    pub fn flush(&self) -> Result<(), CatalogError> {
        self.db.flush()?;
        Ok(())
    }
}

/// Seed the store at `config.store_path` with the configured records and
/// flush it to disk.
pub fn seed_from_config(config: &Config) -> Result<SeedReport, CatalogError> {
    let records = config.load_seed_records()?;
    info!(records = records.len(), "Loaded seed records");

    let store = CatalogStore::open(&config.store_path)?;
    let report = store.seed(&records)?;
    store.flush()?;
    info!(
        inserted = report.inserted,
        updated = report.updated,
        total = store.len(),
        "Catalog store seeded"
    );
    Ok(report)
}
