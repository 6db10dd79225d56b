//! Seeds the on-disk catalog store from the bundled airports or from the
//! file named by `FLIGHT_FINDER_CATALOG`.

use anyhow::{Context, Result};
use flight_finder::logging::init_stderr_logging;
use flight_finder::store::seed_from_config;
use flight_finder::Config;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_stderr_logging("flight_finder=info")?;

    let config = Config::from_env()?;
    let report = seed_from_config(&config)
        .with_context(|| format!("seeding store at {}", config.store_path.display()))?;

    println!("Seeded {}", config.store_path.display());
    println!("  inserted: {}", report.inserted);
    println!("  updated:  {}", report.updated);
    Ok(())
}
