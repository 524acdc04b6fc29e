use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod attributes;
mod auth;
mod aws_clients;
mod config;
mod daily;
mod domain;
mod errors;
mod handlers;
mod likes;
mod memory;
mod models;
mod repositories;
mod routes;
mod startup;

use crate::auth::JwtVerifier;
use crate::aws_clients::{create_dynamodb_client, create_sdk_config};
use crate::config::{Config, StoreBackend};
use crate::domain::{ArtifactRepository, DailyPickRepository, IdentityVerifier};
use crate::errors::AppError;
use crate::memory::{InMemoryArtifactRepository, InMemoryDailyPickRepository};
use crate::repositories::{DynamoDbArtifactRepository, DynamoDbDailyPickRepository};

/// AppState holds shared resources for the web server.
pub struct AppState {
    pub artifact_repo: Arc<dyn ArtifactRepository>,
    pub pick_repo: Arc<dyn DailyPickRepository>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub featured_limit: usize,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "histotrack=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(bind_address = %config.bind_address, backend = ?config.store_backend, "Configuration loaded");

    let (artifact_repo, pick_repo): (Arc<dyn ArtifactRepository>, Arc<dyn DailyPickRepository>) =
        match config.store_backend {
            StoreBackend::DynamoDb => {
                let sdk_config = create_sdk_config(&config).await;
                let client = create_dynamodb_client(&sdk_config);
                // The server listens whether or not the store is reachable yet.
                startup::spawn_init_resources(client.clone(), config.clone());
                (
                    Arc::new(DynamoDbArtifactRepository::new(client.clone(), config.artifacts_table.clone())),
                    Arc::new(DynamoDbDailyPickRepository::new(client, config.daily_picks_table.clone())),
                )
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                (
                    Arc::new(InMemoryArtifactRepository::new()),
                    Arc::new(InMemoryDailyPickRepository::new()),
                )
            }
        };

    let state = Arc::new(AppState {
        artifact_repo,
        pick_repo,
        verifier: Arc::new(JwtVerifier::new(&config.jwt_secret, config.jwt_issuer.as_deref())),
        featured_limit: config.featured_limit,
    });

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .map_err(|e| AppError::InitError(format!("Failed to bind {}: {}", config.bind_address, e)))?;
    tracing::info!("Server listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Server error: {}", e)))?;

    Ok(())
}
