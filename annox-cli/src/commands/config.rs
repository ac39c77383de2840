//! Config command implementation - print or write the example configuration

use std::path::PathBuf;

use crate::config::Config;
use crate::error::{CliError, CliResult};

pub fn execute(config: &Config, example: bool, output: Option<PathBuf>) -> CliResult<()> {
    let content = if example {
        Config::example_toml().map_err(|e| CliError::config(e.to_string()))?
    } else {
        toml::to_string_pretty(config)?
    };

    match output {
        Some(path) => {
            std::fs::write(&path, content)?;
            log::info!("Configuration written to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
