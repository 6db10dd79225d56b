//! CLI interface for flight-finder

use clap::{Parser, Subcommand};
use flight_finder::logging::init_stderr_logging;
use flight_finder::{
    search_airports, search_cities, Config, NameResolver, RawSearchInput, SearchOrchestrator,
};
use serde::Serialize;
use std::fs;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "flight-finder")]
#[command(about = "Airport lookup and flight offer search")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Autocomplete over airports, cities and countries
    Airports {
        /// Text to match against codes, names, cities and countries
        query: String,
    },
    /// Distinct cities with their most popular airport
    Cities {
        /// Text to match against city names and codes
        query: Option<String>,
        /// Only keep cities whose country contains this text
        #[arg(short, long)]
        country: Option<String>,
    },
    /// Resolve a city name, alias or code to an airport code
    Resolve {
        /// Free-text location, e.g. "new york" or "lhr"
        input: String,
    },
    /// Search for one-way flight offers
    Search {
        /// Origin airport code or city
        #[arg(short, long)]
        from: String,
        /// Destination airport code or city
        #[arg(short, long)]
        to: String,
        /// Departure date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
        /// Number of adults
        #[arg(long, default_value = "1")]
        adults: u32,
        /// Cabin class (economy, business, first)
        #[arg(long, default_value = "economy")]
        class: String,
        /// Sort order (cheapest, fastest)
        #[arg(short, long)]
        sort: Option<String>,
        /// Output file for JSON results
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Seed the on-disk catalog store
    #[cfg(feature = "sled-store")]
    Seed,
}

#[derive(Serialize)]
struct Resolution<'a> {
    input: &'a str,
    code: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_stderr_logging("flight_finder=info")?;

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Airports { query } => {
            let catalog = config.load_catalog()?;
            print_json(&search_airports(&catalog, &query), None)?;
        }
        Commands::Cities { query, country } => {
            let catalog = config.load_catalog()?;
            let response = search_cities(
                &catalog,
                query.as_deref().unwrap_or(""),
                country.as_deref().unwrap_or(""),
            );
            print_json(&response, None)?;
        }
        Commands::Resolve { input } => {
            let resolver = NameResolver::new(Arc::new(config.load_aliases()?));
            let code = if config.strict_codes {
                resolver.resolve_checked(Some(input.as_str()), &config.load_catalog()?)
            } else {
                resolver.resolve(Some(input.as_str()))
            };
            print_json(
                &Resolution {
                    input: &input,
                    code: code.map(|c| c.to_string()),
                },
                None,
            )?;
        }
        Commands::Search {
            from,
            to,
            date,
            adults,
            class,
            sort,
            output,
        } => {
            let input = RawSearchInput {
                origin: Some(from),
                destination: Some(to),
                departure_date: Some(date),
                adults: Some(adults),
                cabin_class: Some(class),
                sort,
            };

            eprintln!("Searching for flights...");
            let orchestrator = SearchOrchestrator::from_config(&config)?;
            match orchestrator.search(&input).await {
                Ok(outcome) => {
                    print_json(&outcome, output.as_deref())?;

                    eprintln!("\nSummary:");
                    eprintln!("{} -> {}", outcome.origin, outcome.destination);
                    eprintln!("Found {} flights", outcome.flights.len());
                    if let Some(first) = outcome.flights.first() {
                        eprintln!(
                            "First: {} {} {:.2} {}",
                            first.flight_number, first.duration, first.price, first.currency
                        );
                    }
                }
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    std::process::exit(1);
                }
            }
        }
        #[cfg(feature = "sled-store")]
        Commands::Seed => {
            let report = flight_finder::store::seed_from_config(&config)?;
            print_json(&report, None)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T, output: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(output_file) => {
            fs::write(output_file, &json)?;
            eprintln!("Results saved to {}", output_file);
        }
        None => println!("{}", json),
    }
    Ok(())
}
