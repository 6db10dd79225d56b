//! Incremental airport search backing the autocomplete UI
//!
//! Every matcher is a case-insensitive substring test. Sorts are stable, so
//! airports that tie on the sort key keep catalog order.

use crate::catalog::{Airport, AirportCatalog};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cap on direct matches, groups, and airports inside a country group
pub const MAX_RESULTS: usize = 10;

/// Direct airport hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportMatch {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
}

/// Airports sharing a `(city, country)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityGroup {
    pub name: String,
    pub country: String,
    pub airports: Vec<CityGroupAirport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityGroupAirport {
    pub code: String,
    pub name: String,
}

/// Airports sharing a country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryGroup {
    pub name: String,
    pub airports: Vec<CountryGroupAirport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryGroupAirport {
    pub code: String,
    pub name: String,
    pub city: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirportSearchResponse {
    pub airports: Vec<AirportMatch>,
    pub cities: Vec<CityGroup>,
    pub countries: Vec<CountryGroup>,
}

/// One city-level result, represented by its most popular airport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityMatch {
    pub city: String,
    pub country: String,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitySearchResponse {
    pub cities: Vec<CityMatch>,
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn by_popularity_desc(a: &&Airport, b: &&Airport) -> std::cmp::Ordering {
    b.popularity.cmp(&a.popularity)
}

/// Search airports directly and grouped by city and by country.
///
/// The three passes are independent: each one runs against the full
/// catalog for the same query.
pub fn search_airports(catalog: &AirportCatalog, query: &str) -> AirportSearchResponse {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return AirportSearchResponse::default();
    }

    let response = AirportSearchResponse {
        airports: direct_matches(catalog, &q),
        cities: city_groups(catalog, &q),
        countries: country_groups(catalog, &q),
    };

    debug!(
        query = %q,
        airports = response.airports.len(),
        cities = response.cities.len(),
        countries = response.countries.len(),
        "Airport search completed"
    );
    response
}

fn direct_matches(catalog: &AirportCatalog, q: &str) -> Vec<AirportMatch> {
    let mut hits: Vec<&Airport> = catalog
        .iter()
        .filter(|a| contains_ci(a.iata_code.as_str(), q) || contains_ci(&a.name, q))
        .collect();
    hits.sort_by(by_popularity_desc);

    hits.into_iter()
        .take(MAX_RESULTS)
        .map(|a| AirportMatch {
            code: a.iata_code.to_string(),
            name: a.name.clone(),
            city: a.city.clone(),
            country: a.country.clone(),
        })
        .collect()
}

fn city_groups(catalog: &AirportCatalog, q: &str) -> Vec<CityGroup> {
    let mut hits: Vec<&Airport> = catalog.iter().filter(|a| contains_ci(&a.city, q)).collect();
    hits.sort_by(|a, b| a.city.cmp(&b.city).then_with(|| by_popularity_desc(a, b)));

    let mut groups: IndexMap<(&str, &str), CityGroup> = IndexMap::new();
    for airport in hits {
        let key = (airport.city.as_str(), airport.country.as_str());
        if !groups.contains_key(&key) && groups.len() == MAX_RESULTS {
            continue;
        }
        groups
            .entry(key)
            .or_insert_with(|| CityGroup {
                name: airport.city.clone(),
                country: airport.country.clone(),
                airports: Vec::new(),
            })
            .airports
            .push(CityGroupAirport {
                code: airport.iata_code.to_string(),
                name: airport.name.clone(),
            });
    }
    groups.into_values().collect()
}

fn country_groups(catalog: &AirportCatalog, q: &str) -> Vec<CountryGroup> {
    let mut hits: Vec<&Airport> = catalog
        .iter()
        .filter(|a| contains_ci(&a.country, q))
        .collect();
    hits.sort_by(|a, b| a.country.cmp(&b.country).then_with(|| by_popularity_desc(a, b)));

    let mut groups: IndexMap<&str, CountryGroup> = IndexMap::new();
    for airport in hits {
        let key = airport.country.as_str();
        if !groups.contains_key(&key) && groups.len() == MAX_RESULTS {
            continue;
        }
        let group = groups.entry(key).or_insert_with(|| CountryGroup {
            name: airport.country.clone(),
            airports: Vec::new(),
        });
        if group.airports.len() < MAX_RESULTS {
            group.airports.push(CountryGroupAirport {
                code: airport.iata_code.to_string(),
                name: airport.name.clone(),
                city: airport.city.clone(),
            });
        }
    }
    groups.into_values().collect()
}

/// Search cities, one entry per `(city, country)` pair.
///
/// The representative code of each city is its most popular airport that
/// survives the filters.
pub fn search_cities(catalog: &AirportCatalog, query: &str, country_filter: &str) -> CitySearchResponse {
    let q = query.trim().to_lowercase();
    let country = country_filter.trim().to_lowercase();

    let mut hits: Vec<&Airport> = catalog
        .iter()
        .filter(|a| country.is_empty() || contains_ci(&a.country, &country))
        .filter(|a| q.is_empty() || contains_ci(&a.city, &q) || contains_ci(a.iata_code.as_str(), &q))
        .collect();
    hits.sort_by(by_popularity_desc);

    let mut cities: IndexMap<(&str, &str), CityMatch> = IndexMap::new();
    for airport in hits {
        if cities.len() == MAX_RESULTS {
            break;
        }
        cities
            .entry((airport.city.as_str(), airport.country.as_str()))
            .or_insert_with(|| CityMatch {
                city: airport.city.clone(),
                country: airport.country.clone(),
                code: airport.iata_code.to_string(),
                name: format!("{}, {}", airport.city, airport.country),
            });
    }

    debug!(query = %q, country = %country, cities = cities.len(), "City search completed");
    CitySearchResponse {
        cities: cities.into_values().collect(),
    }
}
