//! HTTP surface.
//!
//! # Routes
//!
//! - `POST /guards` - issue a guard for the caller
//! - `PATCH /guards/:id` - refresh a guard
//! - `DELETE /guards/:id` - revoke a guard
//! - `GET /health` - store reachability
//!
//! The caller is identified by a request header (`x-user-id` by default).

pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::core::config::HttpConfig;
use crate::guard::GuardManager;
use anyhow::{Context, Result};
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: GuardManager,
    pub user_id_header: HeaderName,
}

/// Build the application router.
pub fn create_router(manager: GuardManager, config: &HttpConfig) -> Result<Router> {
    let user_id_header = HeaderName::from_bytes(config.user_id_header.as_bytes())
        .with_context(|| format!("invalid user id header: {}", config.user_id_header))?;
    let cors = cors_layer(config, user_id_header.clone())?;

    let state = AppState {
        manager,
        user_id_header,
    };

    Ok(Router::new()
        .route("/guards", post(handlers::issue_handler))
        .route(
            "/guards/:id",
            patch(handlers::refresh_handler).delete(handlers::revoke_handler),
        )
        .route("/health", get(handlers::health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn cors_layer(config: &HttpConfig, user_id_header: HeaderName) -> Result<CorsLayer> {
    let origin = if config.cors_allowed_origin == "*" {
        AllowOrigin::any()
    } else {
        let value = HeaderValue::from_str(&config.cors_allowed_origin).with_context(|| {
            format!("invalid CORS origin: {}", config.cors_allowed_origin)
        })?;
        AllowOrigin::exact(value)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, user_id_header]))
}
