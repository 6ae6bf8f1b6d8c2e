//! # confab-api — Binary Entry Point
//!
//! Builds configuration from the environment, assembles the OpenAPI
//! document (failing fast on schema errors), seeds default role groups,
//! and serves the Axum application.

use std::sync::Arc;

use confab_api::config::{AppConfig, EnvMode};
use confab_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8080);
    let environment = std::env::var("ENVIRONMENT").ok();
    let env_mode = EnvMode::from_environment(environment.as_deref());
    let config = AppConfig { port, env_mode };

    // Schemas are built exactly once; malformed shape-specs abort boot here.
    let document = confab_api::openapi::build_document().map_err(|err| {
        tracing::error!("OpenAPI document build failed: {err}");
        err
    })?;

    let state = AppState::new(config);
    confab_api::bootstrap::seed_role_groups(&state);

    if let (Ok(username), Ok(password)) = (
        std::env::var("ADMIN_USERNAME"),
        std::env::var("ADMIN_PASSWORD"),
    ) {
        confab_api::bootstrap::seed_admin(&state, &username, &password);
    }

    let app = confab_api::app(state, Arc::new(document));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(mode = ?env_mode, "Confab API listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
