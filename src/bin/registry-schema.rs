// Copyright (c) 2025 - Cowboy AI, Inc.
//! Registry Schema Tool
//!
//! Prepares a Neo4j database for the federation registry: creates the
//! uniqueness constraints, lookup indexes and the registry lock node, then
//! verifies the database answers.
//!
//! Run with: cargo run --bin registry-schema --features neo4j [init|check]
//!
//! Configuration (environment):
//! - NEO4J_URI (default: bolt://localhost:7687)
//! - NEO4J_USER / NEO4J_PASSWORD
//! - NEO4J_DATABASE (default: neo4j)
//! - FED_REG_READ_RETRIES / FED_REG_READ_BACKOFF_MS
//! - FED_REG_MAX_PAGE_SIZE

use anyhow::{bail, Context, Result};
use fed_registry::graph::GraphStore;
use fed_registry::{FederationRegistry, Neo4jConfig, Neo4jGraphStore, RegistryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "init".to_string());

    let neo4j = Neo4jConfig::from_env().context("Invalid Neo4j configuration")?;
    let config = RegistryConfig::from_env().context("Invalid registry configuration")?;
    info!("Connecting to {} (database {})", neo4j.uri, neo4j.database());

    let store = Neo4jGraphStore::connect(&neo4j)
        .await
        .context("Failed to connect to Neo4j")?;

    match command.as_str() {
        "init" => {
            let registry = FederationRegistry::with_config(store, config);
            registry
                .initialize()
                .await
                .context("Failed to initialize registry schema")?;
            info!("Registry schema is in place");
        }
        "check" => {
            store
                .health_check()
                .await
                .context("Neo4j health check failed")?;
            info!("Neo4j is reachable");
        }
        other => bail!("unknown command '{}', expected 'init' or 'check'", other),
    }

    Ok(())
}
