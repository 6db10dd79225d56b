//! # Flight Finder Library
//!
//! Resolves free-text locations ("london", "nyc", "KHI") into IATA airport
//! codes, backs an airport/city/country autocomplete over a small seeded
//! catalog, and looks up flight offers from the Amadeus API.

pub mod amadeus;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod offers;
pub mod orchestrator;
pub mod resolver;
pub mod search;
#[cfg(feature = "sled-store")]
pub mod store;

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Re-export main types for convenience
pub use amadeus::{AmadeusClient, AmadeusSettings, ExternalError};
pub use catalog::{Airport, AirportCatalog, AirportRecord, CatalogError, SeedReport};
pub use config::{Config, ConfigError};
pub use offers::{
    parse_duration, sort_offers, FlightDuration, FlightOffer, FlightOfferSource, OfferQuery,
    OfferSummary,
};
pub use orchestrator::{RawSearchInput, ResolvedSearch, SearchOrchestrator, SearchOutcome};
pub use resolver::{AliasTable, NameResolver};
pub use search::{search_airports, search_cities, AirportSearchResponse, CitySearchResponse};

/// Error types for the flight finder library
#[derive(Error, Debug)]
pub enum FlightError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Could not find an airport for {side} '{input}'")]
    UnresolvedLocation { side: LocationSide, input: String },

    #[error("Invalid date format: {0}")]
    DateParseError(String),

    #[error("Parsing failed: {0}")]
    ParseError(String),

    #[error("Flight offer lookup failed: {0}")]
    External(#[from] ExternalError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl FlightError {
    /// The message shown to an end user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            FlightError::MissingField(_) => "Please fill in all required fields.".to_string(),
            FlightError::UnresolvedLocation { input, .. } => format!(
                "Could not find an airport for '{}'. Please try a major city name or IATA code.",
                input
            ),
            FlightError::DateParseError(date) => {
                format!("Invalid departure date '{}'. Please use YYYY-MM-DD.", date)
            }
            FlightError::External(e) if e.is_client_error() => {
                "Invalid Request: Please use valid 3-letter IATA Airport Codes (e.g., KHI for Karachi, LHE for Lahore, LHR for London).".to_string()
            }
            FlightError::External(e) => format!("Error searching flights: {}", e),
            _ => "An unexpected error occurred.".to_string(),
        }
    }
}

/// Which end of the trip a location belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSide {
    Origin,
    Destination,
}

impl fmt::Display for LocationSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationSide::Origin => write!(f, "origin"),
            LocationSide::Destination => write!(f, "destination"),
        }
    }
}

/// Three-character uppercase airport identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IataCode(String);

impl IataCode {
    /// Parse a code strictly: exactly three ASCII letters, any case.
    pub fn parse(code: &str) -> Result<Self, FlightError> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(FlightError::ParseError(format!("Invalid IATA code: {}", code)))
        }
    }

    /// Upper-cased candidate built from free text without any validation.
    pub(crate) fn candidate(text: &str) -> Self {
        Self(text.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IataCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IataCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for IataCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for IataCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for IataCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl FromStr for IataCode {
    type Err = FlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Cabin class passed to the flight offer lookup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CabinClass {
    #[default]
    Economy,
    Business,
    First,
}

impl CabinClass {
    /// Lenient parse used for form input: anything unrecognised is Economy.
    pub fn from_label(label: Option<&str>) -> Self {
        label
            .and_then(|l| l.parse::<CabinClass>().ok())
            .unwrap_or_default()
    }

    /// Value of the `travelClass` enumeration in the offers API
    pub fn api_value(&self) -> &'static str {
        match self {
            CabinClass::Economy => "ECONOMY",
            CabinClass::Business => "BUSINESS",
            CabinClass::First => "FIRST",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CabinClass::Economy => "Economy",
            CabinClass::Business => "Business",
            CabinClass::First => "First Class",
        }
    }
}

impl FromStr for CabinClass {
    type Err = FlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "economy" => Ok(CabinClass::Economy),
            "business" => Ok(CabinClass::Business),
            "first class" | "first-class" | "first_class" | "first" => Ok(CabinClass::First),
            _ => Err(FlightError::ParseError(format!("Invalid cabin class: {}", s))),
        }
    }
}

/// Ordering applied to flight offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Total price ascending
    Cheapest,
    /// Itinerary duration ascending
    Fastest,
}

impl SortKey {
    /// Lenient parse of the `sort` request parameter; unknown keys mean no sorting.
    pub fn from_param(param: Option<&str>) -> Option<Self> {
        param.and_then(|p| p.parse().ok())
    }
}

impl FromStr for SortKey {
    type Err = FlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cheapest" => Ok(SortKey::Cheapest),
            "fastest" => Ok(SortKey::Fastest),
            _ => Err(FlightError::ParseError(format!("Invalid sort key: {}", s))),
        }
    }
}

/// Main public API function: resolve the input and fetch offers using
/// configuration from the environment.
///
/// # Example
/// ```rust,no_run
/// use flight_finder::{search_flights, RawSearchInput};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let input = RawSearchInput {
///     origin: Some("karachi".to_string()),
///     destination: Some("london".to_string()),
///     departure_date: Some("2025-08-15".to_string()),
///     sort: Some("cheapest".to_string()),
///     ..Default::default()
/// };
///
/// let outcome = search_flights(input).await?;
/// println!("Found {} flights", outcome.flights.len());
/// # Ok(())
/// # }
/// ```
pub async fn search_flights(input: RawSearchInput) -> Result<SearchOutcome, FlightError> {
    let config = Config::from_env()?;
    let orchestrator = SearchOrchestrator::from_config(&config)?;
    orchestrator.search(&input).await
}
