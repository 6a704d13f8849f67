//! Main entry point for the literacy newspaper service.
//!
//! This module initializes logging, loads environment variables and
//! configuration, opens the task store and starts the HTTP API.
//!
//! Image generation goes through the Kie.ai job API when `KIE_API_KEY` is set.
//! Without a key the service either synthesizes placeholder images (mock mode)
//! or answers generation requests with 503, depending on configuration.

mod api;
mod cli;
mod config;
mod constants;
mod core;
mod errors;
mod provider;
mod store;
mod utils;

use crate::core::{PromptBuilder, TaskEngine};
use crate::errors::Error;
use crate::provider::{ImageProvider, KieClient};
use crate::store::{FileTaskStore, TaskStore};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Main entry point that initializes and runs the application.
///
/// # Initialization steps:
/// 1. Parse CLI arguments
/// 2. Initialize logging system
/// 3. Load environment variables and configuration
/// 4. Open the task store and build the task engine
/// 5. Serve the API until a shutdown signal arrives
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = cli::Cli::parse();
    utils::init_logging(&cli.logging_level, cli.log_to_file);

    if let Err(e) = dotenvy::dotenv() {
        warn!("Failed to load .env file: {}", e);
    }

    if let Err(e) = run(cli).await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: cli::Cli) -> Result<(), Error> {
    let mut config = config::load_service_config(cli.config.as_deref().map(Path::new))?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    let prompts = match &config.prompt_template_path {
        Some(path) => PromptBuilder::from_template_file(path)?,
        None => PromptBuilder::default(),
    };

    let provider: Option<Arc<dyn ImageProvider>> = match config.api_key() {
        Some(key) => Some(Arc::new(KieClient::new(key, &config.provider.base_url)?)),
        None => None,
    };
    let mock = config.mock_enabled();
    if provider.is_none() {
        if mock {
            warn!("KIE_API_KEY is not set, mock image generation is enabled (local development only)");
        } else {
            warn!("KIE_API_KEY is not set, generation endpoints will answer 503");
        }
    }

    let store = Arc::new(FileTaskStore::open(config.task_store_path.clone()));
    info!(
        path = %store.path().display(),
        tasks = store.list().len(),
        "Task store ready"
    );

    let engine = Arc::new(TaskEngine::new(
        store,
        provider,
        prompts,
        config.poll_policy(),
        mock,
    ));
    let resumed = engine.resume_interrupted();
    if resumed > 0 {
        info!(tasks = resumed, "Recovered tasks interrupted by the last shutdown");
    }

    api::server::launch_server(engine, &config).await
}
