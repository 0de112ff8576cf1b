//! # HTTP Server for Label Printing
//!
//! A thin web surface over the printer facade and template store.
//!
//! ## Endpoints
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | POST | `/api/print` | Print a base64-encoded raster |
//! | POST | `/api/print/dynamic` | Render a stored template + data, print |
//! | POST | `/api/render/dynamic` | Same render path, returned as PNG |
//! | GET | `/api/templates` | List stored templates, newest first |
//! | POST | `/api/templates` | Create a template (server mints the id) |
//! | PUT | `/api/templates/:id` | Overwrite a template |
//! | DELETE | `/api/templates/:id` | Delete a template |
//!
//! ## Usage
//!
//! ```bash
//! minilabel serve --listen 0.0.0.0:12134 --templates templates --assets assets
//! ```

mod handlers;
mod state;

pub use state::{AppState, ServerConfig};

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use log::info;
use tower_http::trace::TraceLayer;

use crate::error::MiniLabelError;
use crate::printer::{PrinterConfig, PrinterService};
use crate::template::TemplateStore;

/// Build the application router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/print", post(handlers::print_static))
        .route("/api/print/dynamic", post(handlers::print_dynamic))
        .route("/api/render/dynamic", post(handlers::render_dynamic))
        .route(
            "/api/templates",
            get(handlers::list_templates).post(handlers::create_template),
        )
        .route(
            "/api/templates/:id",
            put(handlers::update_template).delete(handlers::delete_template),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server over the host's Bluetooth adapter.
pub async fn serve(config: ServerConfig) -> Result<(), MiniLabelError> {
    let printer =
        PrinterService::with_system_ble(PrinterConfig::MINI_PRINTER, config.assets_root.clone())
            .await?;
    let store = TemplateStore::open(&config.templates_dir)?;
    let state = Arc::new(AppState { printer, store });

    info!("minilabel server starting");
    info!("listening on: {}", config.listen_addr);
    info!("templates: {}", config.templates_dir.display());
    info!("assets: {}", config.assets_root.display());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}
