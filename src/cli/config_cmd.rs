//! Config commands (show, init)

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::storage::{Config, PROJECT_CONFIG_FILE};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a config file with every default spelled out
    Init {
        /// Target file (defaults to ./cuesheet.toml)
        path: Option<PathBuf>,
    },
}

pub fn run(cmd: ConfigCommands, config: &Config, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(config, output),
        ConfigCommands::Init { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
            Config::write_defaults(&path)?;
            output.success(&format!("Wrote default configuration to {}", path.display()));
            Ok(())
        }
    }
}

fn show(config: &Config, output: &Output) -> Result<()> {
    let source = config
        .source
        .as_ref()
        .map(|p| p.display().to_string());

    if output.is_json() {
        output.data(&serde_json::json!({
            "source": source,
            "settings": config.settings,
        }));
    } else {
        match &source {
            Some(path) => println!("# Loaded from {}", path),
            None => println!("# Built-in defaults"),
        }
        print!("{}", config.to_toml()?);
    }

    Ok(())
}
