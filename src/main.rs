// src/main.rs
mod routes;
mod handlers;
mod models;
mod store;
mod middleware;
mod state;
mod dtos;
mod error;
mod auth;
mod config;
mod media;
mod seed;

use tracing_subscriber::fmt::init as tracing_init;
use tokio::net::TcpListener;
use dotenvy::dotenv;
use std::net::SocketAddr;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_init();

    // Load environment variables
    dotenv().ok();

    let config = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    // Open the persistence backend once; it is shared by every request
    let store = match store::connect(&config).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open storage backend");
            std::process::exit(1);
        }
    };
    tracing::info!(backend = store.backend_name(), "Storage ready");

    seed::seed(store.as_ref()).await;

    let host = config.host;
    let base_port = config.port;
    let app_state = state::AppState::new(store, config);
    let app = routes::app(app_state);

    // Try base_port..base_port+20 to avoid crash when address is in use
    let listener = {
        let mut bound = None;
        for offset in 0u16..=20 {
            let port = base_port.saturating_add(offset);
            let addr = SocketAddr::from((host, port));
            match TcpListener::bind(addr).await {
                Ok(l) => { bound = Some((l, addr)); break; }
                Err(e) => {
                    if offset == 0 { tracing::warn!(%addr, error=%e, "Port in use, trying next"); }
                }
            }
        }
        match bound {
            Some((l, addr)) => {
                tracing::info!("Server running on http://{}", addr);
                tracing::info!("Catalog: http://{}/api/products", addr);
                tracing::info!("Admin: http://{}/admin/login", addr);
                l
            }
            None => {
                tracing::error!("Failed to bind to any port starting at {} on {}", base_port, host);
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error=%e, "Server error");
    }
}
