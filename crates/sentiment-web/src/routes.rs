//! Route definitions for the web interface

use crate::{
    handlers::{pages, upload},
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

/// Build the complete web application router
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Page routes
        .route("/", get(pages::index))
        .route("/help/:topic", get(pages::help))
        // Static assets
        .route("/static/app.js", get(pages::app_js))
        .route("/static/style.css", get(pages::style_css))
        // Analysis
        .route("/upload", post(upload::upload))
        .route("/upload/cancel", post(upload::cancel))
        // Health check
        .route("/health", get(pages::health_check))
}
