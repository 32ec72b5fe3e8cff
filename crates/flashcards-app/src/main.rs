//! Flashcards application binary - composition root.
//!
//! 1. Parse CLI flags and load `.env`
//! 2. Resolve configuration (file, then environment, then flags)
//! 3. Open the SQLite database
//! 4. Build the model client and shared API state
//! 5. Start the axum REST API server

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use flashcards_api::state::AppState;
use flashcards_core::FlashcardsConfig;
use flashcards_quiz::OpenAiClient;
use flashcards_storage::Database;

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    // Config. Loaded before tracing so the configured log level applies;
    // the outcome is logged once the subscriber is up.
    let config_file = args.resolve_config_path();
    let loaded = FlashcardsConfig::load(&config_file);
    let mut config = match &loaded {
        Ok(c) => c.clone(),
        Err(_) => FlashcardsConfig::default(),
    };
    config.apply_env_overrides();
    args.apply_to(&mut config);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Flashcards v{}", env!("CARGO_PKG_VERSION"));
    if dotenv_loaded {
        tracing::debug!("Loaded environment from .env");
    }
    match loaded {
        Ok(_) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Err(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Using default configuration"
        ),
    }
    config.validate()?;

    // Storage.
    let db_path = Path::new(&config.database.path);
    let db = Database::new(db_path).inspect_err(|e| {
        tracing::error!(path = %db_path.display(), error = %e, "Failed to open database");
    })?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    // Model client.
    let model = OpenAiClient::new(&config.llm)?;
    tracing::info!(model = %model.model(), base_url = %config.llm.base_url, "Model client ready");

    let state = AppState::new(db, Arc::new(model));

    // === API server ===

    if let Err(e) = flashcards_api::start_server(&config.server, state).await {
        tracing::error!(
            port = config.server.port,
            error = %e,
            "API server stopped; is another instance running?"
        );
        return Err(e.into());
    }

    Ok(())
}
