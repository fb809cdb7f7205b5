//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api::{conflicts, health, maintenance, roster_rules, shift_overrides};
use crate::state::AppState;
use crate::{api, auth};

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let app = Router::new()
        .route("/health", get(health::health))
        // Roster
        .route("/schedule-conflict-check", post(conflicts::check_conflict))
        .route(
            "/roster-rules",
            get(roster_rules::list_rules).post(roster_rules::create_rule),
        )
        .route(
            "/roster-rules/{id}",
            get(roster_rules::get_rule)
                .patch(roster_rules::update_rule)
                .delete(roster_rules::delete_rule),
        )
        .route(
            "/shift-overrides",
            get(shift_overrides::list_overrides).post(shift_overrides::create_override),
        )
        .route(
            "/shift-overrides/{id}",
            get(shift_overrides::get_override)
                .patch(shift_overrides::update_override)
                .delete(shift_overrides::delete_override),
        )
        .route("/instructors/{id}/shifts", get(conflicts::instructor_shifts))
        // Maintenance
        .route("/maintenance/components", get(maintenance::list_components))
        .route("/maintenance/components/{id}", get(maintenance::get_component))
        .route(
            "/maintenance/components/{id}/status",
            get(maintenance::component_status),
        )
        .route(
            "/maintenance/components/{id}/extension",
            put(maintenance::set_extension),
        )
        .route(
            "/maintenance/visits",
            get(maintenance::list_visits).post(maintenance::create_visit),
        )
        .route("/maintenance/visits/{id}", axum::routing::patch(maintenance::update_visit));

    // `serve` refuses a bad origin at startup; anything else built from such a
    // config gets no cross-origin access at all.
    let cors = cors_layer(&state.config.server.cors_origin).unwrap_or_else(|e| {
        warn!(error = %e, "cross-origin requests disabled");
        CorsLayer::new()
    });

    app.layer(from_fn_with_state(state.clone(), auth::authorize))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}

/// `CORS_ORIGIN` that is neither `*` nor a single `scheme://host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid CORS origin '{0}': expected '*' or scheme://host[:port]")]
pub struct InvalidCorsOrigin(pub String);

/// CORS for the configured origin: `*` allows any origin.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, InvalidCorsOrigin> {
    let origin = origin.trim();
    if origin == "*" {
        return Ok(CorsLayer::permissive());
    }
    let invalid = || InvalidCorsOrigin(origin.to_string());
    let host = origin
        .strip_prefix("https://")
        .or_else(|| origin.strip_prefix("http://"))
        .ok_or_else(invalid)?;
    if host.is_empty() || host.contains(['/', ' ', ',']) {
        return Err(invalid());
    }
    let value = HeaderValue::from_str(origin).map_err(|_| invalid())?;
    Ok(CorsLayer::new()
        .allow_origin(value)
        .allow_methods(Any)
        .allow_headers(Any))
}
