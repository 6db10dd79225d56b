//! Integration tests for flight-finder
//!
//! These run against the bundled airport catalog and alias table. Flight
//! searches use an in-process offer source, so no network access is needed.

use async_trait::async_trait;
use flight_finder::{
    search_airports, search_cities, AirportCatalog, AliasTable, FlightError, FlightOffer,
    FlightOfferSource, NameResolver, OfferQuery, RawSearchInput, SearchOrchestrator,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn catalog() -> AirportCatalog {
    AirportCatalog::bundled().expect("bundled catalog should load")
}

fn resolver() -> NameResolver {
    NameResolver::new(Arc::new(AliasTable::bundled().expect("bundled aliases should load")))
}

/// Offer source serving canned API JSON
struct CannedSource {
    body: &'static str,
    calls: AtomicUsize,
}

impl CannedSource {
    fn new(body: &'static str) -> Self {
        Self {
            body,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FlightOfferSource for CannedSource {
    async fn search_offers(&self, _query: &OfferQuery) -> Result<Vec<FlightOffer>, FlightError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::from_str(self.body)?)
    }
}

const OFFERS: &str = r#"[
    {"id": "1", "price": {"currency": "EUR", "total": "812.00"},
     "itineraries": [{"duration": "PT9H5M", "segments": [
        {"departure": {"iataCode": "KHI", "at": "2025-08-15T02:10:00"},
         "arrival": {"iataCode": "LHR", "at": "2025-08-15T06:15:00"},
         "carrierCode": "PK", "number": "785"}]}]},
    {"id": "2", "price": {"currency": "EUR", "total": "455.30"},
     "itineraries": [{"duration": "PT14H40M", "segments": [
        {"departure": {"iataCode": "KHI", "at": "2025-08-15T04:00:00"},
         "arrival": {"iataCode": "DXB", "at": "2025-08-15T05:15:00"},
         "carrierCode": "EK", "number": "601"},
        {"departure": {"iataCode": "DXB", "at": "2025-08-15T10:45:00"},
         "arrival": {"iataCode": "LHR", "at": "2025-08-15T15:40:00"},
         "carrierCode": "EK", "number": "3"}]}]},
    {"id": "3", "price": {"currency": "EUR", "total": "530.99"},
     "itineraries": [{"duration": "P1DT1H", "segments": [
        {"departure": {"iataCode": "KHI", "at": "2025-08-15T01:00:00"},
         "arrival": {"iataCode": "IST", "at": "2025-08-15T05:00:00"},
         "carrierCode": "TK", "number": "709"},
        {"departure": {"iataCode": "IST", "at": "2025-08-15T20:00:00"},
         "arrival": {"iataCode": "LHR", "at": "2025-08-16T02:00:00"},
         "carrierCode": "TK", "number": "1971"}]}]}
]"#;

#[test]
fn test_resolver_aliases_and_pass_through() {
    let resolver = resolver();

    for input in ["new york", "nyc", "New York City"] {
        assert_eq!(resolver.resolve(Some(input)).unwrap(), "JFK", "input {:?}", input);
    }
    for input in ["london", "uk", "United Kingdom "] {
        assert_eq!(resolver.resolve(Some(input)).unwrap(), "LHR", "input {:?}", input);
    }

    assert_eq!(resolver.resolve(Some("xyz")).unwrap(), "XYZ");
    assert!(resolver.resolve(Some("")).is_none());
    assert!(resolver.resolve(Some("   ")).is_none());
    assert!(resolver.resolve(None).is_none());
    assert!(resolver.resolve(Some("londn")).is_none());
}

#[test]
fn test_airport_search_for_london() {
    let catalog = catalog();
    let response = search_airports(&catalog, "lon");

    // Every airport whose code or name mentions the query is a direct match
    let expected: HashSet<&str> = catalog
        .iter()
        .filter(|a| {
            a.iata_code.as_str().to_lowercase().contains("lon")
                || a.name.to_lowercase().contains("lon")
        })
        .map(|a| a.iata_code.as_str())
        .collect();
    let direct: HashSet<&str> = response.airports.iter().map(|a| a.code.as_str()).collect();
    assert_eq!(direct, expected);
    assert!(direct.contains("BCN"));

    let london = response
        .cities
        .iter()
        .find(|g| g.name == "London" && g.country == "UK")
        .expect("London group");
    let codes: HashSet<&str> = london.airports.iter().map(|a| a.code.as_str()).collect();
    assert_eq!(codes, HashSet::from(["LHR", "LGW"]));
}

#[test]
fn test_airport_search_caps() {
    let catalog = catalog();
    for query in ["a", "e", "n"] {
        let response = search_airports(&catalog, query);
        assert!(response.airports.len() <= 10);
        assert!(response.cities.len() <= 10);
        assert!(response.countries.len() <= 10);
        assert!(response.countries.iter().all(|g| g.airports.len() <= 10));
    }

    assert_eq!(search_airports(&catalog, "  "), Default::default());
}

#[test]
fn test_city_search_collapses_london() {
    let response = search_cities(&catalog(), "london", "");
    assert_eq!(response.cities.len(), 1);
    assert_eq!(response.cities[0].code, "LHR");
    assert_eq!(response.cities[0].name, "London, UK");
}

#[test]
fn test_city_search_is_capped_and_distinct() {
    let catalog = catalog();
    let response = search_cities(&catalog, "", "");
    assert_eq!(response.cities.len(), 10);

    let keys: HashSet<(&str, &str)> = response
        .cities
        .iter()
        .map(|c| (c.city.as_str(), c.country.as_str()))
        .collect();
    assert_eq!(keys.len(), response.cities.len());

    let pakistan = search_cities(&catalog, "", "pakistan");
    assert!(!pakistan.cities.is_empty());
    assert!(pakistan.cities.iter().all(|c| c.country == "Pakistan"));
}

#[test]
fn test_seeding_twice_is_idempotent() {
    let records = AirportCatalog::bundled_records().unwrap();
    let mut catalog = AirportCatalog::new();

    let first = catalog.seed(records.clone()).unwrap();
    let second = catalog.seed(records.clone()).unwrap();

    assert_eq!(first.inserted, records.len());
    assert_eq!(second.inserted, 0);
    assert_eq!(catalog.len(), records.len());

    let codes: HashSet<&str> = catalog.iter().map(|a| a.iata_code.as_str()).collect();
    assert_eq!(codes.len(), catalog.len());
}

#[tokio::test]
async fn test_search_cheapest_and_fastest() {
    let orchestrator = SearchOrchestrator::new(
        resolver(),
        Arc::new(catalog()),
        CannedSource::new(OFFERS),
    );

    let mut input = RawSearchInput {
        origin: Some("Karachi".to_string()),
        destination: Some("uk".to_string()),
        departure_date: Some("2025-08-15".to_string()),
        sort: Some("cheapest".to_string()),
        ..Default::default()
    };

    let cheapest = orchestrator.search(&input).await.unwrap();
    assert_eq!(cheapest.origin, "KHI");
    assert_eq!(cheapest.destination, "LHR");
    let prices: Vec<f64> = cheapest.flights.iter().map(|f| f.price).collect();
    assert!(prices.windows(2).all(|w| w[0] <= w[1]), "{:?}", prices);

    input.sort = Some("fastest".to_string());
    let fastest = orchestrator.search(&input).await.unwrap();
    let minutes: Vec<u32> = fastest.flights.iter().map(|f| f.duration_minutes).collect();
    assert_eq!(minutes, vec![545, 880, 1500]);
    assert_eq!(fastest.flights[0].stops, "NON-STOP");
    assert_eq!(fastest.flights[2].duration, "25 Hrs 0 Min");
}

#[tokio::test]
async fn test_unresolvable_destination_skips_lookup() {
    let source = CannedSource::new(OFFERS);
    let orchestrator = SearchOrchestrator::new(resolver(), Arc::new(catalog()), source);

    let input = RawSearchInput {
        origin: Some("karachi".to_string()),
        destination: Some("middle of nowhere".to_string()),
        departure_date: Some("2025-08-15".to_string()),
        ..Default::default()
    };

    let err = orchestrator.search(&input).await.unwrap_err();
    assert!(matches!(err, FlightError::UnresolvedLocation { .. }));
    assert!(err.user_message().contains("middle of nowhere"));
    assert_eq!(orchestrator.source().calls.load(Ordering::SeqCst), 0);
}
