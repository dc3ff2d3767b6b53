pub mod health;
pub mod profit;

use crate::config::Config;
use crate::engine::ProfitEngine;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProfitEngine>,
    pub config: Config,
}

impl AppState {
    pub fn new(engine: Arc<ProfitEngine>, config: Config) -> Self {
        Self { engine, config }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/positions/profit", post(profit::post_profit))
        .layer(cors)
        .with_state(state)
}
