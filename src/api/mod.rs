// HTTP surface: health, readiness and the two segmentation routes

mod error;
mod form;
mod handlers;

pub use error::ApiError;
pub use handlers::ReadyResponse;

use crate::segmentation::PredictorService;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictorService>,
}

impl AppState {
    pub fn new(service: PredictorService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Create the HTTP router
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/v1/segment", post(handlers::segment_image))
        .route("/v1/segment/video", post(handlers::segment_video))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
