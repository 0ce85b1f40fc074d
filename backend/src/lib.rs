//! Stock Ledger backend
//!
//! Imports warehouse stock exports, fans them out to team warehouses and
//! reconciles team stock against the canonical OPEN SI warehouse.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod services;

pub use config::Config;

use repository::StockRepository;
use services::PipelineLock;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn StockRepository>,
    pub config: Arc<Config>,
    /// Single-flight guard shared by import and reconciliation
    pub pipeline: PipelineLock,
}

impl AppState {
    pub fn new(repo: Arc<dyn StockRepository>, config: Config) -> Self {
        Self {
            repo,
            config: Arc::new(config),
            pipeline: PipelineLock::new(),
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Stock Ledger API v1.0"
}
