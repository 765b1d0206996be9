use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
    http::{HeaderValue, header},
};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod classifier;
pub mod db;
pub mod notifier;
pub mod routes;

use classifier::GenerativeModel;

#[derive(Clone)]
pub struct AppState {
    pub db: db::DbPool,
    /// Absent when no AI credentials are configured; classification then
    /// runs on the keyword cascade alone.
    pub ai: Option<Arc<dyn GenerativeModel>>,
}

/// Builds the full router. Rate limiting and CORS are attached in `main`,
/// where their env-driven configuration lives, so tests can drive this
/// router directly.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Public category suggestion
        .route("/ai-category/", get(routes::classify::ai_category))
        // Account routes
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/me", get(auth::me))
        // Donor routes
        .route("/api/donations", get(routes::donations::my_donations).post(routes::donations::create_donation))
        // Admin console
        .route("/api/admin/donations", get(routes::admin::list_donations))
        .route("/api/admin/donations/export", get(routes::admin::export_csv))
        .route("/api/admin/donations/{id}/status", put(routes::admin::set_status))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
