//! Free-text location resolution
//!
//! Maps city names, city abbreviations and country names to a single
//! canonical airport code. Matching is exact on the trimmed, lowercased
//! input; there is no fuzzy or partial matching.

use crate::catalog::{AirportCatalog, CatalogError};
use crate::IataCode;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const BUNDLED_ALIASES: &str = include_str!("data/aliases.json");

/// Immutable alias table: lowercase alias -> canonical airport code
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, IataCode>,
}

impl AliasTable {
    /// Alias table bundled in the crate
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json_str(BUNDLED_ALIASES)
    }

    /// Parse a JSON object of the form `{"alias": "CODE", ...}`
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        Self::from_pairs(raw)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut entries = HashMap::new();
        for (alias, code) in pairs {
            let code = IataCode::parse(code.as_ref())
                .map_err(|_| CatalogError::InvalidCode(code.as_ref().to_string()))?;
            entries.insert(alias.as_ref().trim().to_lowercase(), code);
        }
        Ok(Self { entries })
    }

    /// Exact lookup of an already-normalised alias
    pub fn get(&self, alias: &str) -> Option<&IataCode> {
        self.entries.get(alias)
    }

    /// Every alias pointing at `code`, sorted
    pub fn aliases_for(&self, code: &str) -> Vec<&str> {
        let mut aliases: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, c)| c.as_str().eq_ignore_ascii_case(code))
            .map(|(alias, _)| alias.as_str())
            .collect();
        aliases.sort_unstable();
        aliases
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves raw user input into airport codes using an injected alias table
#[derive(Debug, Clone)]
pub struct NameResolver {
    aliases: Arc<AliasTable>,
}

impl NameResolver {
    pub fn new(aliases: Arc<AliasTable>) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Resolve free text into an airport code.
    ///
    /// An exact alias match wins, even over a 3-character input that looks
    /// like a code: `nyc` resolves to `JFK`, not `NYC`. Otherwise any
    /// 3-character input is returned upper-cased as a code candidate without
    /// checking that such an airport exists; use
    /// [`NameResolver::resolve_checked`] when that matters.
    pub fn resolve(&self, input: Option<&str>) -> Option<IataCode> {
        let clean = input?.trim().to_lowercase();
        if clean.is_empty() {
            return None;
        }

        if let Some(code) = self.aliases.get(&clean) {
            debug!(input = %clean, code = %code, "Resolved location alias");
            return Some(code.clone());
        }

        if clean.chars().count() == 3 {
            debug!(input = %clean, "Treating input as airport code");
            return Some(IataCode::candidate(&clean));
        }

        debug!(input = %clean, "No airport found for location");
        None
    }

    /// Like [`NameResolver::resolve`], but a pass-through code must exist
    /// in the catalog.
    pub fn resolve_checked(&self, input: Option<&str>, catalog: &AirportCatalog) -> Option<IataCode> {
        let clean = input?.trim().to_lowercase();
        if let Some(code) = self.aliases.get(&clean) {
            return Some(code.clone());
        }
        self.resolve(Some(&clean))
            .filter(|code| catalog.contains(code.as_str()))
    }
}
