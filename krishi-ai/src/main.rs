//! krishi-ai - Crop Leaf Disease Inference Service
//!
//! Accepts leaf photos over HTTP, classifies them through the configured
//! providers (local ONNX model, Hugging Face, Gemini) and answers with a
//! canonical diagnosis plus treatment advice.

use anyhow::{Context, Result};
use clap::Parser;
use krishi_ai::db::SqliteScanRecorder;
use krishi_ai::knowledge::{self, StaticKnowledgeBase};
use krishi_ai::{providers, AppState, AttemptPolicy, Orchestrator};
use krishi_common::config::{self, RootFolderInitializer, RootFolderResolver, TomlConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "krishi-ai", version, about = "Crop leaf disease inference service")]
struct Cli {
    /// Path to krishi.toml
    #[arg(long, env = "KRISHI_CONFIG")]
    config: Option<PathBuf>,

    /// Data folder holding the scan history database
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = config::config_path(cli.config.as_deref());
    let config =
        TomlConfig::load_from(config_path.as_deref()).context("Failed to load configuration")?;
    krishi_common::logging::init_tracing(&config.logging)?;

    match &config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => warn!("No configuration file found, using built-in defaults"),
    }

    info!("Starting krishi-ai (Leaf Disease Inference)");
    info!(
        "Version: {} ({}, {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );

    // Step 1: Resolve and create root folder
    let resolver = RootFolderResolver::new(cli.root_folder.as_deref(), config.root_folder.as_deref());
    let initializer = RootFolderInitializer::new(resolver.resolve());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    // Step 2: Open or create database
    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = krishi_ai::db::init_database_pool(&db_path).await?;

    // Step 3: Knowledge base must cover the whole catalog
    let kb = StaticKnowledgeBase::bundled()?;
    knowledge::verify_catalog_coverage(&kb)?;
    info!("Knowledge base loaded ({} diseases)", kb.len());

    // Step 4: Providers in priority order
    let provider_list = providers::build_providers(&config);
    let orchestrator = Orchestrator::new(provider_list, AttemptPolicy::from_config(&config.providers));
    info!("Provider order: {:?}", orchestrator.provider_order());

    let state = AppState::new(
        Arc::new(orchestrator),
        Arc::new(kb),
        Arc::new(SqliteScanRecorder::new(db_pool)),
    );
    let app = krishi_ai::build_router(state);

    let bind = cli.bind.unwrap_or(config.bind_address);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
