//! CLI argument definitions for the Flashcards server.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use flashcards_core::FlashcardsConfig;

/// Flashcards - notes, todos and an AI quiz tutor over HTTP.
#[derive(Parser, Debug)]
#[command(name = "flashcards", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Path to the SQLite database file.
    #[arg(short = 'd', long = "database")]
    pub database: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > FLASHCARDS_CONFIG env var > ./flashcards.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("FLASHCARDS_CONFIG") {
            if !p.trim().is_empty() {
                return PathBuf::from(p);
            }
        }
        PathBuf::from("flashcards.toml")
    }

    /// Overlay explicit flags onto an already env-resolved config.
    pub fn apply_to(&self, config: &mut FlashcardsConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref path) = self.database {
            config.database.path = path.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }
}
