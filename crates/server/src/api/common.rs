//! Error type and helpers shared by every endpoint.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use flightdeck_core::{FieldError, ValidationErrors};
use flightdeck_maintenance::MaintenanceError;
use flightdeck_roster::ConflictingShift;
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::state::AppState;
use crate::store::StoreError;

pub(crate) type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("validation failed")]
    Validation(ValidationErrors),

    #[error("{message}")]
    Conflict {
        message: String,
        shifts: Vec<ConflictingShift>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("internal server error")]
    Internal,
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_shifts: Option<Vec<ConflictingShift>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();
        let body = match self {
            Self::Validation(errors) => ErrorBody {
                error,
                details: Some(errors.errors),
                conflicting_shifts: None,
            },
            Self::Conflict { shifts, .. } if !shifts.is_empty() => ErrorBody {
                error,
                details: None,
                conflicting_shifts: Some(shifts),
            },
            _ => ErrorBody {
                error,
                details: None,
                conflicting_shifts: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        Self::Validation(e)
    }
}

impl From<MaintenanceError> for ApiError {
    fn from(e: MaintenanceError) -> Self {
        match e {
            MaintenanceError::AlreadyCompleted(_) => Self::Conflict {
                message: e.to_string(),
                shifts: Vec::new(),
            },
            MaintenanceError::InvalidExtension(_) => {
                Self::Validation(ValidationErrors::single("extension_limit_percent", e.to_string()))
            }
            MaintenanceError::MissingVisitHours(_) => {
                Self::Validation(ValidationErrors::single("hours_at_visit", e.to_string()))
            }
            MaintenanceError::MissingIntervalHours(_)
            | MaintenanceError::MissingIntervalDays(_)
            | MaintenanceError::DateOutOfRange(_) => Self::Validation(ValidationErrors::single("component_id", e.to_string())),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => Self::NotFound(e.to_string()),
            StoreError::Conflict(shifts) => Self::Conflict {
                message: format!("schedule conflict with {} existing shift(s)", shifts.len()),
                shifts,
            },
            StoreError::Invalid(errors) => Self::Validation(errors),
            StoreError::Maintenance(e) => e.into(),
            StoreError::Database(e) => {
                error!(error = %e, "database error");
                Self::Internal
            }
            StoreError::Corrupt { .. } => {
                error!(error = %e, "stored row failed validation");
                Self::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected request body");
        Self::Validation(ValidationErrors::single("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(ValidationErrors::single("query", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(ValidationErrors::single("path", rejection.body_text()))
    }
}

// ── Helpers ─────────────────────────────────────────────────────

pub(crate) fn require_pg(state: &AppState) -> ApiResult<&sqlx::PgPool> {
    state
        .pg_pool
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("PostgreSQL not configured".into()))
}

/// Parse an optional query parameter, recording a field error when it is
/// malformed.
pub(crate) fn optional<T, E: std::fmt::Display>(
    errors: &mut ValidationErrors,
    field: &str,
    raw: Option<&str>,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Option<T> {
    raw.and_then(|raw| errors.capture(field, parse(raw.trim())))
}

pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Parse an id from a path or query parameter as a field-level error.
pub(crate) fn parse_id(field: &str, raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|e| ValidationErrors::single(field, format!("{field} must be a UUID: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_errors_carry_details() {
        let response = ApiError::from(ValidationErrors::single("start_time", "bad time")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["details"][0]["field"], "start_time");
        assert!(json.get("conflicting_shifts").is_none());
    }

    #[tokio::test]
    async fn already_completed_is_a_bare_conflict() {
        let response = ApiError::from(MaintenanceError::AlreadyCompleted(Uuid::nil())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("already completed"));
        assert!(json.get("conflicting_shifts").is_none());
    }

    #[test]
    fn store_errors_map_to_statuses() {
        let not_found = StoreError::NotFound {
            entity: "roster rule",
            id: Uuid::nil(),
        };
        assert_eq!(ApiError::from(not_found).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(StoreError::Database(sqlx::Error::PoolTimedOut)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::from(StoreError::Conflict(Vec::new())).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn ids_are_field_errors() {
        match parse_id("instructor_id", "nope") {
            Err(ApiError::Validation(e)) => assert!(e.has_field("instructor_id")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
