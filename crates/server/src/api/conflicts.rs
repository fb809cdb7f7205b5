//! Schedule checks: the ad-hoc conflict check and an instructor's effective
//! shifts on a date.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use flightdeck_core::time::parse_date;
use flightdeck_core::ValidationErrors;
use flightdeck_roster::{ConflictCheckFields, ConflictReport, EffectiveShift};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;
use crate::store::RosterStore;

use super::common::{require_pg, ApiResult, ErrorBody};

/// Would this window overlap the instructor's existing shifts on `date`?
#[utoipa::path(
    post,
    path = "/schedule-conflict-check",
    tag = "Roster",
    request_body = ConflictCheckFields,
    responses(
        (status = 200, description = "Conflict report", body = ConflictReport),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 503, description = "PostgreSQL not configured", body = ErrorBody)
    )
)]
pub async fn check_conflict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConflictCheckFields>, JsonRejection>,
) -> ApiResult<Json<ConflictReport>> {
    let Json(fields) = payload?;
    let query = fields.validate()?;
    let pool = require_pg(&state)?;

    let conflicts = RosterStore::check_conflicts(pool, &query).await?;
    debug!(instructor_id = %query.instructor_id, conflicts = conflicts.len(), "conflict check");
    Ok(Json(ConflictReport::from_conflicts(conflicts)))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShiftsParams {
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
}

/// Resolve the shifts an instructor works on a date after overrides.
#[utoipa::path(
    get,
    path = "/instructors/{id}/shifts",
    tag = "Roster",
    params(("id" = String, Path, description = "Instructor id"), ShiftsParams),
    responses(
        (status = 200, description = "Effective shifts ordered by start time", body = Vec<EffectiveShift>),
        (status = 400, description = "Invalid id or date", body = ErrorBody)
    )
)]
pub async fn instructor_shifts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    params: Result<Query<ShiftsParams>, QueryRejection>,
) -> ApiResult<Json<Vec<EffectiveShift>>> {
    let Query(params) = params?;
    let mut errors = ValidationErrors::new();
    let instructor_id = errors.capture("id", Uuid::parse_str(id.trim()));
    let date = errors
        .require("date", params.date.as_deref())
        .and_then(|raw| errors.capture("date", parse_date(raw)));
    let (Some(instructor_id), Some(date)) = (instructor_id, date) else {
        return Err(errors.into());
    };
    let pool = require_pg(&state)?;

    Ok(Json(RosterStore::shifts_on(pool, instructor_id, date).await?))
}
