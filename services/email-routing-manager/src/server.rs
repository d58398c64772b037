//! Axum router setup.

use std::any::Any;
use std::sync::Arc;

use axum::http::{header, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cloudflare::EmailRoutingApi;
use crate::error::AppError;
use crate::handlers::{configs, email_routing, zones};
use crate::store::Store;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub cloudflare: Arc<dyn EmailRoutingApi>,
    pub max_configs: usize,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route(
            "/api/configs",
            get(configs::list_configs)
                .post(configs::create_config)
                .put(configs::update_config)
                .delete(configs::delete_config),
        )
        .route("/api/configs/:id", get(configs::get_config))
        .route("/api/zones", get(zones::list_zones))
        .route(
            "/api/email-routing",
            get(email_routing::list_rules).post(email_routing::create_rule),
        )
        .route("/api/email-routing/:id", delete(email_routing::delete_rule))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn health() -> &'static str {
    "Email Routing Manager API is running!"
}

async fn not_found() -> AppError {
    AppError::NotFound("Not Found".to_string())
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    AppError::Internal("handler panicked".to_string()).into_response()
}
