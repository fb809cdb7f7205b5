//! Roster rule CRUD endpoints.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{NaiveDate, NaiveTime};
use flightdeck_core::time::parse_date;
use flightdeck_core::ValidationErrors;
use flightdeck_roster::{RosterRule, RuleFields, RulePatch};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::Principal;
use crate::state::AppState;
use crate::store::roster::RuleFilter;
use crate::store::RosterStore;

use super::common::{optional, parse_id, require_pg, today, ApiResult, ErrorBody};

// ── Types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RosterRuleView {
    pub id: Uuid,
    pub instructor_id: Uuid,
    /// 0 = Sunday … 6 = Saturday.
    pub day_of_week: u8,
    #[serde(with = "flightdeck_core::time::hhmm")]
    #[schema(value_type = String, example = "09:00")]
    pub start_time: NaiveTime,
    #[serde(with = "flightdeck_core::time::hhmm")]
    #[schema(value_type = String, example = "12:00")]
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub effective_from: NaiveDate,
    pub effective_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl From<RosterRule> for RosterRuleView {
    fn from(rule: RosterRule) -> Self {
        Self {
            id: rule.id,
            instructor_id: rule.instructor_id,
            day_of_week: rule.day_of_week,
            start_time: rule.window.start(),
            end_time: rule.window.end(),
            is_active: rule.is_active,
            effective_from: rule.effective_from,
            effective_until: rule.effective_until,
            notes: rule.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RuleListParams {
    pub instructor_id: Option<String>,
    /// 0 = Sunday … 6 = Saturday.
    pub day_of_week: Option<i64>,
    pub is_active: Option<bool>,
    /// Only rules in effect on this date (`YYYY-MM-DD`).
    pub effective_on: Option<String>,
}

impl RuleListParams {
    fn validate(&self) -> Result<RuleFilter, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let instructor_id = optional(&mut errors, "instructor_id", self.instructor_id.as_deref(), Uuid::parse_str);
        let effective_on = optional(&mut errors, "effective_on", self.effective_on.as_deref(), parse_date);
        let day_of_week = match self.day_of_week {
            Some(d) if (0..=6).contains(&d) => Some(d as u8),
            Some(_) => {
                errors.error("day_of_week", "day_of_week must be between 0 (Sunday) and 6 (Saturday)");
                None
            }
            None => None,
        };
        errors.into_result()?;
        Ok(RuleFilter {
            instructor_id,
            day_of_week,
            is_active: self.is_active,
            effective_on,
        })
    }
}

// ── Handlers ─────────────────────────────────────────────────────

/// List live roster rules.
#[utoipa::path(
    get,
    path = "/roster-rules",
    tag = "Roster",
    params(RuleListParams),
    responses(
        (status = 200, description = "Matching rules", body = Vec<RosterRuleView>),
        (status = 400, description = "Invalid filter", body = ErrorBody),
        (status = 503, description = "PostgreSQL not configured", body = ErrorBody)
    )
)]
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RuleListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<RosterRuleView>>> {
    let Query(params) = params?;
    let filter = params.validate()?;
    let pool = require_pg(&state)?;

    let rules = RosterStore::list_rules(pool, &filter).await?;
    Ok(Json(rules.into_iter().map(RosterRuleView::from).collect()))
}

/// Get one roster rule.
#[utoipa::path(
    get,
    path = "/roster-rules/{id}",
    tag = "Roster",
    params(("id" = String, Path, description = "Rule id")),
    responses(
        (status = 200, description = "The rule", body = RosterRuleView),
        (status = 404, description = "No live rule with this id", body = ErrorBody)
    )
)]
pub async fn get_rule(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<RosterRuleView>> {
    let id = parse_id("id", &id)?;
    let pool = require_pg(&state)?;
    Ok(Json(RosterStore::get_rule(pool, id).await?.into()))
}

/// Create a weekly rule. Rejected with 409 if it overlaps existing shifts.
#[utoipa::path(
    post,
    path = "/roster-rules",
    tag = "Roster",
    request_body = RuleFields,
    responses(
        (status = 201, description = "Rule created", body = RosterRuleView),
        (status = 400, description = "Invalid rule", body = ErrorBody),
        (status = 409, description = "Overlaps an existing shift", body = ErrorBody)
    )
)]
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<RuleFields>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RosterRuleView>)> {
    let Json(fields) = payload?;
    let draft = fields.validate(today())?;
    let pool = require_pg(&state)?;

    let rule = RosterStore::create_rule(pool, &draft).instrument(principal.span()).await?;
    Ok((StatusCode::CREATED, Json(rule.into())))
}

/// Partially update a rule. The merged rule is re-validated and re-checked.
#[utoipa::path(
    patch,
    path = "/roster-rules/{id}",
    tag = "Roster",
    params(("id" = String, Path, description = "Rule id")),
    request_body = RulePatch,
    responses(
        (status = 200, description = "Rule updated", body = RosterRuleView),
        (status = 400, description = "Invalid update", body = ErrorBody),
        (status = 404, description = "No live rule with this id", body = ErrorBody),
        (status = 409, description = "Overlaps an existing shift", body = ErrorBody)
    )
)]
pub async fn update_rule(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<RulePatch>, JsonRejection>,
) -> ApiResult<Json<RosterRuleView>> {
    let id = parse_id("id", &id)?;
    let Json(patch) = payload?;
    patch.validate_fields()?;
    let pool = require_pg(&state)?;

    let rule = RosterStore::update_rule(pool, id, patch, today())
        .instrument(principal.span())
        .await?;
    Ok(Json(rule.into()))
}

/// Void a rule. It stops counting for conflicts and listings.
#[utoipa::path(
    delete,
    path = "/roster-rules/{id}",
    tag = "Roster",
    params(("id" = String, Path, description = "Rule id")),
    responses(
        (status = 204, description = "Rule voided"),
        (status = 404, description = "No live rule with this id", body = ErrorBody)
    )
)]
pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id("id", &id)?;
    let pool = require_pg(&state)?;
    RosterStore::void_rule(pool, id).instrument(principal.span()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_report_every_bad_filter() {
        let params = RuleListParams {
            instructor_id: Some("x".into()),
            day_of_week: Some(9),
            effective_on: Some("tomorrow".into()),
            ..Default::default()
        };
        let errors = params.validate().unwrap_err();
        for field in ["instructor_id", "day_of_week", "effective_on"] {
            assert!(errors.has_field(field), "missing {field}");
        }
    }

    #[test]
    fn empty_list_params_mean_no_filter() {
        let filter = RuleListParams::default().validate().unwrap();
        assert!(filter.instructor_id.is_none() && filter.day_of_week.is_none());
    }
}
