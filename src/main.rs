//! shopdesk - Main Application Entry Point
//!
//! REST API backing a small-business marketing dashboard: shops (tenants),
//! CRM customers imported from Square, email campaigns with a scheduled
//! dispatcher, coupons, automations, and OAuth integrations. Accounts sign in
//! with a password and an optional TOTP second factor.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries), or an in-memory store
//! - **Authentication**: signed session tokens in a cookie or bearer header
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Initialize logging
//! 2. Load configuration from environment variables
//! 3. Open the store (PostgreSQL pool + migrations, or memory)
//! 4. Wire providers and build the HTTP router
//! 5. Start server on configured port

mod app;
mod config;
mod cookies;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod providers;
mod services;
mod state;
mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::store::{Store, memory::MemoryStore, postgres::PgStore};

fn init_tracing() {
    // RUST_LOG wins; otherwise our crate and the HTTP trace layer at info.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("shopdesk=info,tower_http=info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let store: Arc<dyn Store> = if config.uses_memory_store() {
        tracing::warn!("DATABASE_URL=memory, data will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        let pool = db::create_pool(&config.database_url).await?;
        tracing::info!("Database pool created");

        db::run_migrations(&pool).await?;
        tracing::info!("Database migrations complete");

        Arc::new(PgStore::new(pool))
    };

    let port = config.server_port;
    let state = state::AppState::init(config, store)?;
    let app = app::build_app(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
