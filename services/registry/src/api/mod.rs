//! HTTP API handlers and routing.

pub mod auth;
pub mod error;
mod health;
mod tags;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Create the main API router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(Any);

    Router::new()
        .merge(health::routes())
        .route("/", post(tags::create_tags))
        .route(
            "/{code}",
            get(tags::redirect_tag).put(tags::claim_tag),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
