//! Maintenance component and visit endpoints.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use flightdeck_core::time::parse_date;
use flightdeck_core::ValidationErrors;
use flightdeck_maintenance::{
    classify, ComponentDueStatus, ExtensionRequest, MaintenanceComponent, MaintenanceVisit, VisitFields, VisitPatch,
    VisitStatus,
};
use serde::Deserialize;
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::auth::Principal;
use crate::state::AppState;
use crate::store::maintenance::VisitOutcome;
use crate::store::MaintenanceStore;

use super::common::{optional, parse_id, require_pg, today, ApiResult, ErrorBody};

// ── Components ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ComponentListParams {
    pub aircraft_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/maintenance/components",
    tag = "Maintenance",
    params(ComponentListParams),
    responses(
        (status = 200, description = "Components", body = Vec<MaintenanceComponent>),
        (status = 400, description = "Invalid filter", body = ErrorBody)
    )
)]
pub async fn list_components(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ComponentListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<MaintenanceComponent>>> {
    let Query(params) = params?;
    let aircraft_id = params
        .aircraft_id
        .as_deref()
        .map(|raw| parse_id("aircraft_id", raw))
        .transpose()?;
    let pool = require_pg(&state)?;
    Ok(Json(MaintenanceStore::list_components(pool, aircraft_id).await?))
}

#[utoipa::path(
    get,
    path = "/maintenance/components/{id}",
    tag = "Maintenance",
    params(("id" = String, Path, description = "Component id")),
    responses(
        (status = 200, description = "The component", body = MaintenanceComponent),
        (status = 404, description = "Component not found", body = ErrorBody)
    )
)]
pub async fn get_component(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MaintenanceComponent>> {
    let id = parse_id("id", &id)?;
    let pool = require_pg(&state)?;
    Ok(Json(MaintenanceStore::get_component(pool, id).await?))
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusParams {
    /// Current hour-meter reading. Without it the hours dimension is skipped.
    pub current_hours: Option<f64>,
    /// Date to classify against (`YYYY-MM-DD`); defaults to today.
    pub date: Option<String>,
}

impl StatusParams {
    fn validate(&self) -> Result<(Option<f64>, Option<chrono::NaiveDate>), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(h) = self.current_hours {
            if !h.is_finite() || h < 0.0 {
                errors.error("current_hours", "current_hours must be a non-negative number");
            }
        }
        let date = optional(&mut errors, "date", self.date.as_deref(), parse_date);
        errors.into_result()?;
        Ok((self.current_hours, date))
    }
}

/// Classify how close a component is to its due point.
#[utoipa::path(
    get,
    path = "/maintenance/components/{id}/status",
    tag = "Maintenance",
    params(("id" = String, Path, description = "Component id"), StatusParams),
    responses(
        (status = 200, description = "Due status", body = ComponentDueStatus),
        (status = 400, description = "Invalid reading or date", body = ErrorBody),
        (status = 404, description = "Component not found", body = ErrorBody)
    )
)]
pub async fn component_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    params: Result<Query<StatusParams>, QueryRejection>,
) -> ApiResult<Json<ComponentDueStatus>> {
    let id = parse_id("id", &id)?;
    let Query(params) = params?;
    let (current_hours, date) = params.validate()?;
    let pool = require_pg(&state)?;

    let component = MaintenanceStore::get_component(pool, id).await?;
    let status = classify(&component, current_hours, date.unwrap_or_else(today), state.thresholds);
    debug!(component_id = %id, status = ?status.status, "classified component");
    Ok(Json(status))
}

/// Grant, change or withdraw (`null`) a percentage extension.
#[utoipa::path(
    put,
    path = "/maintenance/components/{id}/extension",
    tag = "Maintenance",
    params(("id" = String, Path, description = "Component id")),
    request_body = ExtensionRequest,
    responses(
        (status = 200, description = "Updated component", body = MaintenanceComponent),
        (status = 400, description = "Percentage out of range", body = ErrorBody),
        (status = 404, description = "Component not found", body = ErrorBody)
    )
)]
pub async fn set_extension(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<ExtensionRequest>, JsonRejection>,
) -> ApiResult<Json<MaintenanceComponent>> {
    let id = parse_id("id", &id)?;
    let Json(request) = payload?;
    let percent = request.validate()?;
    let pool = require_pg(&state)?;
    let component = MaintenanceStore::set_extension(pool, id, percent)
        .instrument(principal.span())
        .await?;
    Ok(Json(component))
}

// ── Visits ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VisitListParams {
    pub component_id: Option<String>,
    /// `scheduled` or `completed`.
    pub status: Option<String>,
}

#[utoipa::path(
    get,
    path = "/maintenance/visits",
    tag = "Maintenance",
    params(VisitListParams),
    responses(
        (status = 200, description = "Visits, newest first", body = Vec<MaintenanceVisit>),
        (status = 400, description = "Invalid filter", body = ErrorBody)
    )
)]
pub async fn list_visits(
    State(state): State<Arc<AppState>>,
    params: Result<Query<VisitListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<MaintenanceVisit>>> {
    let Query(params) = params?;
    let mut errors = ValidationErrors::new();
    let component_id = optional(&mut errors, "component_id", params.component_id.as_deref(), Uuid::parse_str);
    let status = optional(&mut errors, "status", params.status.as_deref(), str::parse::<VisitStatus>);
    errors.into_result()?;
    let pool = require_pg(&state)?;

    Ok(Json(MaintenanceStore::list_visits(pool, component_id, status).await?))
}

/// Record a visit. A completed visit advances the component's due point.
#[utoipa::path(
    post,
    path = "/maintenance/visits",
    tag = "Maintenance",
    request_body = VisitFields,
    responses(
        (status = 201, description = "Visit recorded", body = VisitOutcome),
        (status = 400, description = "Invalid visit", body = ErrorBody),
        (status = 404, description = "Component not found", body = ErrorBody)
    )
)]
pub async fn create_visit(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<VisitFields>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<VisitOutcome>)> {
    let Json(fields) = payload?;
    let draft = fields.validate()?;
    let pool = require_pg(&state)?;
    let outcome = MaintenanceStore::create_visit(pool, &draft).instrument(principal.span()).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Update a visit. Completing it advances the component's due point; a
/// completed visit only accepts note edits.
#[utoipa::path(
    patch,
    path = "/maintenance/visits/{id}",
    tag = "Maintenance",
    params(("id" = String, Path, description = "Visit id")),
    request_body = VisitPatch,
    responses(
        (status = 200, description = "Visit updated", body = VisitOutcome),
        (status = 400, description = "Invalid update", body = ErrorBody),
        (status = 404, description = "Visit not found", body = ErrorBody),
        (status = 409, description = "Visit already completed", body = ErrorBody)
    )
)]
pub async fn update_visit(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<VisitPatch>, JsonRejection>,
) -> ApiResult<Json<VisitOutcome>> {
    let id = parse_id("id", &id)?;
    let Json(patch) = payload?;
    patch.validate_fields()?;
    let pool = require_pg(&state)?;
    let outcome = MaintenanceStore::update_visit(pool, id, patch)
        .instrument(principal.span())
        .await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_reading_is_rejected() {
        let params = StatusParams {
            current_hours: Some(-1.0),
            date: Some("2026-13-01".into()),
        };
        let errors = params.validate().unwrap_err();
        assert!(errors.has_field("current_hours"));
        assert!(errors.has_field("date"));
    }

    #[test]
    fn status_defaults_leave_date_open() {
        let (hours, date) = StatusParams {
            current_hours: Some(495.0),
            date: None,
        }
        .validate()
        .unwrap();
        assert_eq!(hours, Some(495.0));
        assert!(date.is_none());
    }
}
