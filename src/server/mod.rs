//! HTTP surface of the service: a single `/predict` endpoint plus `/health`
//! and `/info`, all returning JSON.

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::PredictionResponse;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::web;
use serde::Serialize;

use crate::classifier::Predictor;
use crate::reference::ReferenceTable;

/// Process-wide immutable state, constructed during startup and shared by
/// reference with every worker. Handlers take their dependencies from here
/// rather than from ambient globals.
pub struct AppState {
    pub predictor: Arc<dyn Predictor>,
    pub table: Arc<ReferenceTable>,
    pub info: ServiceInfo,
}

/// Static service metadata reported by `GET /info`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub backbone: String,
    pub num_classes: usize,
    pub embedding_size: usize,
    pub table_rows: usize,
}

/// Cross-origin requests are permitted from any origin.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/predict", web::post().to(handlers::predict))
        .route("/health", web::get().to(handlers::health))
        .route("/info", web::get().to(handlers::info));
}
