use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::debug;

use super::capability::{required_access, Access};
use super::{session, AuthError, Principal, SESSION_COOKIE};
use crate::api::common::ApiError;
use crate::state::AppState;

/// Bearer header first, then the session cookie.
fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|t| !t.is_empty())
}

/// Authenticate the caller and enforce the route's capability before any
/// handler runs.
pub async fn authorize(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let access = required_access(req.method(), req.uri().path());
    if access == Access::Public {
        return next.run(req).await;
    }

    let claims = match session_token(req.headers()) {
        Some(token) => session::open(&state.session_key, token, Utc::now()),
        None => Err(AuthError::Missing),
    };
    let principal = match claims {
        Ok(claims) => Principal::from(claims),
        Err(e) => {
            debug!(path = %req.uri().path(), error = %e, "rejected unauthenticated request");
            return ApiError::Unauthorized(e.to_string()).into_response();
        }
    };

    if let Access::Requires(capability) = access {
        if !principal.role.can(capability) {
            debug!(
                user_id = %principal.user_id,
                role = %principal.role,
                %capability,
                "rejected request lacking capability"
            );
            return ApiError::Forbidden(format!("{} role lacks {}", principal.role, capability)).into_response();
        }
    }

    req.extensions_mut().insert(principal);
    next.run(req).await
}
