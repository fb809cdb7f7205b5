//! Shift override CRUD endpoints.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::NaiveDate;
use flightdeck_core::time::{format_time, parse_date};
use flightdeck_core::ValidationErrors;
use flightdeck_roster::{OverrideFields, OverrideKind, OverridePatch, ShiftOverride};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::Principal;
use crate::state::AppState;
use crate::store::roster::OverrideFilter;
use crate::store::RosterStore;

use super::common::{optional, parse_id, require_pg, ApiResult, ErrorBody};

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ShiftOverrideView {
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub date: NaiveDate,
    pub override_type: OverrideKind,
    #[schema(example = "14:00")]
    pub start_time: Option<String>,
    #[schema(example = "17:00")]
    pub end_time: Option<String>,
    pub replaces_rule_id: Option<Uuid>,
    pub notes: Option<String>,
}

impl From<ShiftOverride> for ShiftOverrideView {
    fn from(ov: ShiftOverride) -> Self {
        let window = ov.shape.window();
        Self {
            id: ov.id,
            instructor_id: ov.instructor_id,
            date: ov.date,
            override_type: ov.kind(),
            start_time: window.map(|w| format_time(w.start())),
            end_time: window.map(|w| format_time(w.end())),
            replaces_rule_id: ov.shape.replaces_rule_id(),
            notes: ov.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OverrideListParams {
    pub instructor_id: Option<String>,
    /// Exact date (`YYYY-MM-DD`).
    pub date: Option<String>,
    /// Inclusive range start.
    pub from: Option<String>,
    /// Inclusive range end.
    pub to: Option<String>,
    /// `add`, `replace` or `cancel`.
    pub override_type: Option<String>,
}

impl OverrideListParams {
    fn validate(&self) -> Result<OverrideFilter, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let filter = OverrideFilter {
            instructor_id: optional(&mut errors, "instructor_id", self.instructor_id.as_deref(), Uuid::parse_str),
            date: optional(&mut errors, "date", self.date.as_deref(), parse_date),
            from: optional(&mut errors, "from", self.from.as_deref(), parse_date),
            to: optional(&mut errors, "to", self.to.as_deref(), parse_date),
            kind: optional(&mut errors, "override_type", self.override_type.as_deref(), str::parse),
        };
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if to < from {
                errors.error("to", "to must not be before from");
            }
        }
        errors.into_result()?;
        Ok(filter)
    }
}

/// List live shift overrides.
#[utoipa::path(
    get,
    path = "/shift-overrides",
    tag = "Roster",
    params(OverrideListParams),
    responses(
        (status = 200, description = "Matching overrides", body = Vec<ShiftOverrideView>),
        (status = 400, description = "Invalid filter", body = ErrorBody)
    )
)]
pub async fn list_overrides(
    State(state): State<Arc<AppState>>,
    params: Result<Query<OverrideListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<ShiftOverrideView>>> {
    let Query(params) = params?;
    let filter = params.validate()?;
    let pool = require_pg(&state)?;

    let overrides = RosterStore::list_overrides(pool, &filter).await?;
    Ok(Json(overrides.into_iter().map(ShiftOverrideView::from).collect()))
}

#[utoipa::path(
    get,
    path = "/shift-overrides/{id}",
    tag = "Roster",
    params(("id" = String, Path, description = "Override id")),
    responses(
        (status = 200, description = "The override", body = ShiftOverrideView),
        (status = 404, description = "No live override with this id", body = ErrorBody)
    )
)]
pub async fn get_override(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ShiftOverrideView>> {
    let id = parse_id("id", &id)?;
    let pool = require_pg(&state)?;
    Ok(Json(RosterStore::get_override(pool, id).await?.into()))
}

/// Create an add, replace or cancel override for one date.
///
/// Add and replace overrides are checked for conflicts; a replacement is not
/// compared with the rule it replaces.
#[utoipa::path(
    post,
    path = "/shift-overrides",
    tag = "Roster",
    request_body = OverrideFields,
    responses(
        (status = 201, description = "Override created", body = ShiftOverrideView),
        (status = 400, description = "Invalid override", body = ErrorBody),
        (status = 404, description = "Replaced rule not found", body = ErrorBody),
        (status = 409, description = "Overlaps an existing shift", body = ErrorBody)
    )
)]
pub async fn create_override(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<OverrideFields>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ShiftOverrideView>)> {
    let Json(fields) = payload?;
    let draft = fields.validate()?;
    let pool = require_pg(&state)?;

    let ov = RosterStore::create_override(pool, &draft).instrument(principal.span()).await?;
    Ok((StatusCode::CREATED, Json(ov.into())))
}

#[utoipa::path(
    patch,
    path = "/shift-overrides/{id}",
    tag = "Roster",
    params(("id" = String, Path, description = "Override id")),
    request_body = OverridePatch,
    responses(
        (status = 200, description = "Override updated", body = ShiftOverrideView),
        (status = 400, description = "Invalid update", body = ErrorBody),
        (status = 404, description = "Override or replaced rule not found", body = ErrorBody),
        (status = 409, description = "Overlaps an existing shift", body = ErrorBody)
    )
)]
pub async fn update_override(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<OverridePatch>, JsonRejection>,
) -> ApiResult<Json<ShiftOverrideView>> {
    let id = parse_id("id", &id)?;
    let Json(patch) = payload?;
    patch.validate_fields()?;
    let pool = require_pg(&state)?;

    let ov = RosterStore::update_override(pool, id, patch)
        .instrument(principal.span())
        .await?;
    Ok(Json(ov.into()))
}

#[utoipa::path(
    delete,
    path = "/shift-overrides/{id}",
    tag = "Roster",
    params(("id" = String, Path, description = "Override id")),
    responses(
        (status = 204, description = "Override voided"),
        (status = 404, description = "No live override with this id", body = ErrorBody)
    )
)]
pub async fn delete_override(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id("id", &id)?;
    let pool = require_pg(&state)?;
    RosterStore::void_override(pool, id).instrument(principal.span()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use flightdeck_core::Lifecycle;
    use flightdeck_roster::{OverrideShape, TimeWindow};

    use super::*;

    #[test]
    fn view_flattens_the_shape() {
        let rule_id = Uuid::new_v4();
        let window = TimeWindow::new(
            chrono::NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            chrono::NaiveTime::from_hms_opt(17, 30, 0).unwrap(),
        )
        .unwrap();
        let ov = ShiftOverride {
            id: Uuid::new_v4(),
            instructor_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            shape: OverrideShape::Replace {
                window,
                replaces_rule_id: rule_id,
            },
            notes: None,
            lifecycle: Lifecycle::Active,
        };
        let json = serde_json::to_value(ShiftOverrideView::from(ov)).unwrap();
        assert_eq!(json["override_type"], "replace");
        assert_eq!(json["start_time"], "14:00");
        assert_eq!(json["end_time"], "17:30");
        assert_eq!(json["replaces_rule_id"], rule_id.to_string());
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let params = OverrideListParams {
            from: Some("2026-10-20".into()),
            to: Some("2026-10-19".into()),
            override_type: Some("swap".into()),
            ..Default::default()
        };
        let errors = params.validate().unwrap_err();
        assert!(errors.has_field("to"));
        assert!(errors.has_field("override_type"));
    }
}
