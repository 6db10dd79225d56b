//! Flight search request handling: validate raw input, resolve both
//! locations, then query the offer source

use crate::amadeus::AmadeusClient;
use crate::catalog::AirportCatalog;
use crate::config::Config;
use crate::offers::{sort_offers, FlightOfferSource, OfferQuery, OfferSummary};
use crate::resolver::NameResolver;
use crate::{CabinClass, FlightError, IataCode, LocationSide, SortKey};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Offers requested from the source per search
pub const MAX_OFFERS: u32 = 10;

/// Raw search form input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSearchInput {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_date: Option<String>,
    pub adults: Option<u32>,
    pub cabin_class: Option<String>,
    pub sort: Option<String>,
}

/// Search input after validation and location resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSearch {
    pub origin: IataCode,
    pub destination: IataCode,
    pub departure_date: NaiveDate,
    pub adults: u32,
    pub cabin_class: CabinClass,
    pub sort: Option<SortKey>,
}

impl ResolvedSearch {
    pub fn offer_query(&self, max_results: u32) -> OfferQuery {
        OfferQuery {
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            departure_date: self.departure_date,
            adults: self.adults,
            cabin_class: self.cabin_class,
            max_results,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub origin: IataCode,
    pub destination: IataCode,
    pub flights: Vec<OfferSummary>,
}

pub struct SearchOrchestrator<S> {
    resolver: NameResolver,
    catalog: Arc<AirportCatalog>,
    source: S,
    strict_codes: bool,
}

impl SearchOrchestrator<AmadeusClient> {
    /// Orchestrator backed by the Amadeus API using reference data and
    /// credentials from `config`
    pub fn from_config(config: &Config) -> Result<Self, FlightError> {
        let catalog = Arc::new(config.load_catalog()?);
        let resolver = NameResolver::new(Arc::new(config.load_aliases()?));
        let source = AmadeusClient::new(config.amadeus_settings()?)?;
        Ok(Self::new(resolver, catalog, source).with_strict_codes(config.strict_codes))
    }
}

impl<S: FlightOfferSource> SearchOrchestrator<S> {
    pub fn new(resolver: NameResolver, catalog: Arc<AirportCatalog>, source: S) -> Self {
        Self {
            resolver,
            catalog,
            source,
            strict_codes: false,
        }
    }

    /// Require pass-through codes to exist in the catalog
    pub fn with_strict_codes(mut self, strict_codes: bool) -> Self {
        self.strict_codes = strict_codes;
        self
    }

    pub fn catalog(&self) -> &AirportCatalog {
        &self.catalog
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Validate and resolve the raw input without touching the offer source.
    pub fn resolve_request(&self, raw: &RawSearchInput) -> Result<ResolvedSearch, FlightError> {
        let origin_text = required(&raw.origin, "origin")?;
        let destination_text = required(&raw.destination, "destination")?;
        let date_text = required(&raw.departure_date, "departure_date")?;

        let origin = self.resolve_side(origin_text, LocationSide::Origin)?;
        let destination = self.resolve_side(destination_text, LocationSide::Destination)?;

        let departure_date = NaiveDate::parse_from_str(date_text.trim(), "%Y-%m-%d")
            .map_err(|_| FlightError::DateParseError(date_text.to_string()))?;

        Ok(ResolvedSearch {
            origin,
            destination,
            departure_date,
            adults: raw.adults.filter(|&n| n > 0).unwrap_or(1),
            cabin_class: CabinClass::from_label(raw.cabin_class.as_deref()),
            sort: SortKey::from_param(raw.sort.as_deref()),
        })
    }

    fn resolve_side(&self, input: &str, side: LocationSide) -> Result<IataCode, FlightError> {
        let resolved = if self.strict_codes {
            self.resolver.resolve_checked(Some(input), &self.catalog)
        } else {
            self.resolver.resolve(Some(input))
        };

        resolved.ok_or_else(|| {
            warn!(side = %side, input = input, "Could not resolve location");
            FlightError::UnresolvedLocation {
                side,
                input: input.to_string(),
            }
        })
    }

    /// Resolve the input, fetch offers and return sorted summaries.
    #[instrument(level = "info", skip(self, raw))]
    pub async fn search(&self, raw: &RawSearchInput) -> Result<SearchOutcome, FlightError> {
        let resolved = self.resolve_request(raw)?;
        info!(
            origin = %resolved.origin,
            destination = %resolved.destination,
            date = %resolved.departure_date,
            adults = resolved.adults,
            cabin_class = resolved.cabin_class.label(),
            "Searching flight offers"
        );

        let offers = self
            .source
            .search_offers(&resolved.offer_query(MAX_OFFERS))
            .await?;

        let mut flights: Vec<OfferSummary> = offers
            .iter()
            .filter_map(|offer| {
                OfferSummary::from_offer(offer, &resolved.origin, &resolved.destination, &self.catalog)
            })
            .collect();
        sort_offers(&mut flights, resolved.sort);

        debug!(
            offers = offers.len(),
            summarised = flights.len(),
            sort = ?resolved.sort,
            "Flight search completed"
        );

        Ok(SearchOutcome {
            origin: resolved.origin,
            destination: resolved.destination,
            flights,
        })
    }
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, FlightError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(FlightError::MissingField(field)),
    }
}
