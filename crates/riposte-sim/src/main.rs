//! # Riposte Sim
//!
//! Runs scripted combat scenarios and prints a JSON summary.
//!
//! Usage: `riposte-sim [config.toml]`. Item profiles are loaded from the
//! configured profile directory; the stock presets are used when it holds
//! none.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod scenario;

use anyhow::Result;
use riposte_combat::definitions::{ProfileLoader, ProfileRegistry};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{SimConfig, CONFIG_FILE};

fn load_profiles(config: &SimConfig) -> Result<ProfileRegistry> {
    let mut loader = ProfileLoader::new(&config.profile_dir);
    let count = loader.load_all()?;
    if count == 0 {
        warn!(
            "No combat profiles under {}, using presets",
            config.profile_dir.display()
        );
        return Ok(ProfileRegistry::with_presets()?);
    }
    Ok(loader.into_registry())
}

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("riposte=info".parse()?))
        .init();

    info!("Riposte sim {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_FILE.to_string());
    let config = SimConfig::load_from(&config_path);
    let registry = load_profiles(&config)?;
    info!("{} combat profiles available", registry.len());

    let reports = scenario::run_all(&config, &registry)?;
    println!("{}", serde_json::to_string_pretty(&reports)?);

    Ok(())
}
