//! # Modelhooks Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the document store
//! - Build the models and the manager integration
//! - Start the HTTP server

mod config;
mod models;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modelhooks_client::ManagerClient;
use modelhooks_hex::{
    inbound::{HttpServer, PipelineConfig},
    model::ManagerIntegration,
};
use modelhooks_repo::build_store;
use modelhooks_types::Environment;

fn init_tracing(environment: &Environment) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,modelhooks_app=debug,modelhooks_hex=debug".into());

    // Machine-readable logs in production, human-readable elsewhere.
    let (plain, json) = if *environment == Environment::Production {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(json)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::from_env()?;

    init_tracing(&config.environment);

    tracing::info!(
        "Starting modelhooks server on port {} ({})",
        config.port,
        config.environment
    );
    tracing::info!("Using database: {}", config.database_url);

    // Build store (handles connection and migration)
    let store = Arc::new(build_store(&config.database_url).await?);

    let mut client = ManagerClient::new(&config.manager.url);
    if let Some(token) = &config.manager.token {
        client = client.with_token(token);
    }
    if let Some(secret) = &config.manager.secret {
        client = client.with_secret(secret);
    }
    if config.manager.enabled {
        tracing::info!("Manager integration enabled: {}", config.manager.url);
    }
    let manager = ManagerIntegration::new(Arc::new(client), config.manager.enabled);

    let pipeline = PipelineConfig {
        environment: config.environment.clone(),
        enable_api_error_handler: config.enable_api_error_handler,
        ..PipelineConfig::default()
    };
    let pipeline = models::build_pipeline(store, pipeline, manager)?;

    // Create and run the HTTP server
    let server = HttpServer::new(pipeline);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    Ok(())
}
