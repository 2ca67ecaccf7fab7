//! Config Command
//!
//! Manage InsightSQL configuration.
//!
//! Usage:
//!   insightsql config show [-f json|yaml]
//!   insightsql config path
//!   insightsql config init [-g] [--force]

use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration
pub fn show(format: &str) -> Result<()> {
    let config = ConfigLoader::load()?;
    println!("{}", ConfigLoader::render(&config, format)?);
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Initialize global or project configuration
pub fn init(global: bool, force: bool) -> Result<()> {
    let dir = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };
    println!("✓ Initialized {} configuration", if global { "global" } else { "project" });
    println!("  Config: {}", dir.join("config.toml").display());
    Ok(())
}
