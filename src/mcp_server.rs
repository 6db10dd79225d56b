// src/mcp_server.rs

use anyhow::Result;
use flight_finder::logging::init_file_logging;
use flight_finder::{
    search_airports as search_airports_internal, search_cities as search_cities_internal,
    AirportCatalog, AmadeusClient, Config, NameResolver, RawSearchInput, SearchOrchestrator,
};
use rmcp::{
    model::{ServerCapabilities, ServerInfo},
    schemars, tool,
    transport::stdio,
    ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Airport lookup and flight search MCP server
#[derive(Clone)]
pub struct FlightServer {
    catalog: Arc<AirportCatalog>,
    orchestrator: Option<Arc<SearchOrchestrator<AmadeusClient>>>,
    /// Why flight search is unavailable, when it is
    unavailable: Option<String>,
}

impl FlightServer {
    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = Arc::new(config.load_catalog()?);
        let resolver = NameResolver::new(Arc::new(config.load_aliases()?));
        info!(airports = catalog.len(), aliases = resolver.aliases().len(), "Loaded reference data");

        let source = config
            .amadeus_settings()
            .map_err(|e| e.to_string())
            .and_then(|settings| AmadeusClient::new(settings).map_err(|e| e.to_string()));

        let (orchestrator, unavailable) = match source {
            Ok(client) => {
                let orchestrator = SearchOrchestrator::new(resolver, catalog.clone(), client)
                    .with_strict_codes(config.strict_codes);
                (Some(Arc::new(orchestrator)), None)
            }
            Err(reason) => {
                warn!(reason = %reason, "Flight search disabled");
                (None, Some(reason))
            }
        };

        Ok(Self {
            catalog,
            orchestrator,
            unavailable,
        })
    }
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct AirportSearchParams {
    #[schemars(description = "Text matched against airport codes, airport names, cities and countries (e.g., lon, heathrow, pakistan)")]
    pub query: String,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct CitySearchParams {
    #[schemars(description = "Text matched against city names and airport codes")]
    pub query: Option<String>,
    #[schemars(description = "Only return cities whose country contains this text")]
    pub country: Option<String>,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct FlightSearchParams {
    #[schemars(description = "Origin city, alias or IATA code (e.g., Karachi, nyc, KHI)")]
    pub origin: String,
    #[schemars(description = "Destination city, alias or IATA code (e.g., London, LHR)")]
    pub destination: String,
    #[schemars(description = "Departure date in YYYY-MM-DD format")]
    pub departure_date: String,
    #[schemars(description = "Number of adult passengers (default: 1)")]
    pub adults: Option<u32>,
    #[schemars(description = "Cabin class: economy, business, first class")]
    pub cabin_class: Option<String>,
    #[schemars(description = "Sort order: cheapest or fastest")]
    pub sort: Option<String>,
}

impl From<FlightSearchParams> for RawSearchInput {
    fn from(params: FlightSearchParams) -> Self {
        RawSearchInput {
            origin: Some(params.origin),
            destination: Some(params.destination),
            departure_date: Some(params.departure_date),
            adults: params.adults,
            cabin_class: params.cabin_class,
            sort: params.sort,
        }
    }
}

#[tool(tool_box)]
impl FlightServer {
    #[tool(description = "Autocomplete airports: returns direct airport matches, matches grouped by city, and matches grouped by country.")]
    async fn search_airports(&self, #[tool(aggr)] params: AirportSearchParams) -> String {
        info!(query = params.query, "Airport search request received");
        let response = search_airports_internal(&self.catalog, &params.query);
        debug!(
            airports = response.airports.len(),
            cities = response.cities.len(),
            countries = response.countries.len(),
            "Airport search completed"
        );
        to_json(&response)
    }

    #[tool(description = "List distinct cities with their most popular airport, optionally filtered by country.")]
    async fn search_cities(&self, #[tool(aggr)] params: CitySearchParams) -> String {
        info!(
            query = params.query.as_deref(),
            country = params.country.as_deref(),
            "City search request received"
        );
        let response = search_cities_internal(
            &self.catalog,
            params.query.as_deref().unwrap_or(""),
            params.country.as_deref().unwrap_or(""),
        );
        to_json(&response)
    }

    #[tool(description = "Search one-way flight offers between two locations. Origin and destination may be city names, common aliases or IATA codes.")]
    async fn search_flights(&self, #[tool(aggr)] params: FlightSearchParams) -> String {
        info!(
            origin = params.origin,
            destination = params.destination,
            departure_date = params.departure_date,
            adults = params.adults.unwrap_or(1),
            cabin_class = params.cabin_class.as_deref().unwrap_or("economy"),
            sort = params.sort.as_deref(),
            "Flight search request received"
        );

        let Some(orchestrator) = &self.orchestrator else {
            let reason = self.unavailable.as_deref().unwrap_or("not configured");
            warn!(reason = reason, "Flight search requested while disabled");
            return error_json(&format!("Flight search is unavailable: {}", reason));
        };

        match orchestrator.search(&params.into()).await {
            Ok(outcome) => {
                info!(flights_found = outcome.flights.len(), "Flight search completed successfully");
                to_json(&outcome)
            }
            Err(e) => {
                error!("Flight search failed: {}", e);
                error_json(&e.user_message())
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| error_json(&format!("Failed to serialize results: {}", e)))
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

#[tool(tool_box)]
impl ServerHandler for FlightServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Airport autocomplete, city lookup and one-way flight offer search. Locations accept city names, common aliases (nyc, uk) or IATA codes. Results are JSON; failures are returned as {\"error\": ...}.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    if let Err(e) = init_file_logging(&config.log_dir, "flight-finder-mcp.log") {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!("Starting MCP Flight Finder server");
    let server = FlightServer::from_config(&config)?;
    let transport = stdio();

    let service = server.serve(transport).await?;
    info!("MCP service started, waiting for requests");

    service.waiting().await?;

    info!("MCP service shutting down");
    Ok(())
}
