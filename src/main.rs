//! Dealerdesk server.
//!
//! # API Endpoints
//!
//! - `POST /track` - Record a tracking event
//! - `POST /leads` - Capture a lead
//! - `PATCH /leads/:id` - Update a lead's status
//! - `GET /analytics` - Dashboard report
//! - `POST /photos/validate` - Check a photo filename
//! - `POST /photos` - Register a vehicle photo
//! - `GET /photos` - A vehicle's photos in display order
//! - `GET /health` - Health check

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dealerdesk::api::{AppState, router};
use dealerdesk::config::Config;
use dealerdesk::storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("dealerdesk=info".parse()?))
        .init();

    let config = Config::from_env();

    info!(
        port = config.port,
        db_url = %config.database_url,
        dealer_id = %config.dealer_id,
        "Starting Dealerdesk server"
    );

    let catalog = config.load_catalog()?;
    info!(models = catalog.len(), "Model catalog loaded");

    let storage = Storage::new(&config.database_url).await?;
    info!("Database initialized");

    let state = AppState {
        storage,
        catalog: Arc::new(catalog),
        dealer_id: Arc::from(config.dealer_id.as_str()),
    };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Dealerdesk is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
