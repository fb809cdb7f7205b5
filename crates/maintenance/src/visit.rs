//! Maintenance visits and their scheduled → completed transition.

use std::str::FromStr;

use chrono::NaiveDate;
use flightdeck_core::patch::present;
use flightdeck_core::time::{parse_date, DATE_FORMAT};
use flightdeck_core::ValidationErrors;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::due::Completion;
use crate::error::{MaintenanceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Scheduled,
    Completed,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for VisitStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown visit status '{}': must be scheduled or completed", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MaintenanceVisit {
    pub id: Uuid,
    pub component_id: Uuid,
    pub visit_date: NaiveDate,
    pub hours_at_visit: Option<f64>,
    pub status: VisitStatus,
    pub notes: Option<String>,
}

impl MaintenanceVisit {
    pub fn completion(&self) -> Completion {
        Completion {
            hours: self.hours_at_visit,
            date: self.visit_date,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VisitFields {
    pub component_id: Option<String>,
    #[schema(example = "2026-10-18")]
    pub visit_date: Option<String>,
    pub hours_at_visit: Option<f64>,
    /// `scheduled` (default) or `completed`.
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct VisitPatch {
    pub visit_date: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub hours_at_visit: Option<Option<f64>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisitDraft {
    pub component_id: Uuid,
    pub visit_date: NaiveDate,
    pub hours_at_visit: Option<f64>,
    pub status: VisitStatus,
    pub notes: Option<String>,
}

impl VisitDraft {
    pub fn completion(&self) -> Completion {
        Completion {
            hours: self.hours_at_visit,
            date: self.visit_date,
        }
    }
}

/// What a validated update does to a stored visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitChange {
    /// Fields change, status does not.
    Edit,
    /// scheduled → completed; the component must be recomputed.
    Complete,
}

impl VisitFields {
    pub fn from_visit(visit: &MaintenanceVisit) -> Self {
        Self {
            component_id: Some(visit.component_id.to_string()),
            visit_date: Some(visit.visit_date.format(DATE_FORMAT).to_string()),
            hours_at_visit: visit.hours_at_visit,
            status: Some(visit.status.as_str().to_string()),
            notes: visit.notes.clone(),
        }
    }

    pub fn apply(mut self, patch: VisitPatch) -> Self {
        if patch.visit_date.is_some() {
            self.visit_date = patch.visit_date;
        }
        if let Some(hours) = patch.hours_at_visit {
            self.hours_at_visit = hours;
        }
        if patch.status.is_some() {
            self.status = patch.status;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        self
    }

    pub fn validate(&self) -> std::result::Result<VisitDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let component_id = errors
            .require("component_id", self.component_id.as_deref())
            .and_then(|raw| errors.capture("component_id", Uuid::parse_str(raw.trim())));
        let visit_date = errors
            .require("visit_date", self.visit_date.as_deref())
            .and_then(|raw| errors.capture("visit_date", parse_date(raw)));
        let status = match self.status.as_deref() {
            Some(raw) => errors.capture("status", raw.parse::<VisitStatus>()),
            None => Some(VisitStatus::Scheduled),
        };
        if let Some(h) = self.hours_at_visit {
            if !h.is_finite() || h < 0.0 {
                errors.error("hours_at_visit", "hours_at_visit must be a non-negative number");
            }
        }

        errors.into_result()?;

        match (component_id, visit_date, status) {
            (Some(component_id), Some(visit_date), Some(status)) => Ok(VisitDraft {
                component_id,
                visit_date,
                hours_at_visit: self.hours_at_visit,
                status,
                notes: self.notes.clone().filter(|n| !n.trim().is_empty()),
            }),
            _ => Err(ValidationErrors::single("body", "incomplete visit")),
        }
    }
}

impl VisitPatch {
    /// Check the format of every field the patch carries.
    pub fn validate_fields(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(raw) = &self.visit_date {
            errors.capture("visit_date", parse_date(raw));
        }
        if let Some(raw) = &self.status {
            errors.capture("status", raw.parse::<VisitStatus>());
        }
        if let Some(Some(h)) = self.hours_at_visit {
            if !h.is_finite() || h < 0.0 {
                errors.error("hours_at_visit", "hours_at_visit must be a non-negative number");
            }
        }
        errors.into_result()
    }
}

/// Decide how `draft` may replace `stored`.
///
/// Completed visits are final: their readings already fed the component's
/// due point, so only notes may change afterwards.
pub fn plan_update(stored: &MaintenanceVisit, draft: &VisitDraft) -> Result<VisitChange> {
    match (stored.status, draft.status) {
        (VisitStatus::Scheduled, VisitStatus::Completed) => Ok(VisitChange::Complete),
        (VisitStatus::Scheduled, VisitStatus::Scheduled) => Ok(VisitChange::Edit),
        (VisitStatus::Completed, VisitStatus::Completed)
            if draft.component_id == stored.component_id
                && draft.visit_date == stored.visit_date
                && draft.hours_at_visit == stored.hours_at_visit
                && draft.notes != stored.notes =>
        {
            Ok(VisitChange::Edit)
        }
        (VisitStatus::Completed, _) => Err(MaintenanceError::AlreadyCompleted(stored.id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPONENT: &str = "7f1c1a2e-3333-4a5b-9c3d-000000000003";

    fn fields() -> VisitFields {
        VisitFields {
            component_id: Some(COMPONENT.into()),
            visit_date: Some("2026-10-18".into()),
            hours_at_visit: Some(498.2),
            ..Default::default()
        }
    }

    fn stored(status: VisitStatus) -> MaintenanceVisit {
        let draft = fields().validate().unwrap();
        MaintenanceVisit {
            id: Uuid::new_v4(),
            component_id: draft.component_id,
            visit_date: draft.visit_date,
            hours_at_visit: draft.hours_at_visit,
            status,
            notes: None,
        }
    }

    #[test]
    fn status_defaults_to_scheduled() {
        let draft = fields().validate().unwrap();
        assert_eq!(draft.status, VisitStatus::Scheduled);
        assert_eq!(draft.completion().hours, Some(498.2));
    }

    #[test]
    fn bad_fields_are_reported_together() {
        let errors = VisitFields {
            component_id: Some("nope".into()),
            visit_date: Some("18.10.2026".into()),
            hours_at_visit: Some(-1.0),
            status: Some("done".into()),
            notes: None,
        }
        .validate()
        .unwrap_err();
        for field in ["component_id", "visit_date", "hours_at_visit", "status"] {
            assert!(errors.has_field(field), "missing {field}");
        }
    }

    #[test]
    fn completing_a_scheduled_visit() {
        let visit = stored(VisitStatus::Scheduled);
        let patch: VisitPatch = serde_json::from_str(r#"{"status": "completed"}"#).unwrap();
        let draft = VisitFields::from_visit(&visit).apply(patch).validate().unwrap();
        assert_eq!(plan_update(&visit, &draft), Ok(VisitChange::Complete));
    }

    #[test]
    fn completing_twice_is_rejected() {
        let visit = stored(VisitStatus::Completed);
        let patch: VisitPatch = serde_json::from_str(r#"{"status": "completed"}"#).unwrap();
        let draft = VisitFields::from_visit(&visit).apply(patch).validate().unwrap();
        assert_eq!(plan_update(&visit, &draft), Err(MaintenanceError::AlreadyCompleted(visit.id)));
    }

    #[test]
    fn completed_visits_only_accept_note_edits() {
        let visit = stored(VisitStatus::Completed);

        let notes: VisitPatch = serde_json::from_str(r#"{"notes": "signed off"}"#).unwrap();
        let draft = VisitFields::from_visit(&visit).apply(notes).validate().unwrap();
        assert_eq!(plan_update(&visit, &draft), Ok(VisitChange::Edit));

        let hours: VisitPatch = serde_json::from_str(r#"{"hours_at_visit": 510}"#).unwrap();
        let draft = VisitFields::from_visit(&visit).apply(hours).validate().unwrap();
        assert!(plan_update(&visit, &draft).is_err());

        let reopen: VisitPatch = serde_json::from_str(r#"{"status": "scheduled"}"#).unwrap();
        let draft = VisitFields::from_visit(&visit).apply(reopen).validate().unwrap();
        assert!(plan_update(&visit, &draft).is_err());
    }

    #[test]
    fn patch_formats_are_checked_up_front() {
        let patch: VisitPatch =
            serde_json::from_str(r#"{"status": "finished", "hours_at_visit": -3}"#).unwrap();
        let errors = patch.validate_fields().unwrap_err();
        assert!(errors.has_field("status"));
        assert!(errors.has_field("hours_at_visit"));
    }
}
