//! HTTP routes for inbound messages.

pub mod health;
pub mod inbound;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/inbound", post(inbound::inbound_json))
        .route("/sms", post(inbound::inbound_sms))
}
