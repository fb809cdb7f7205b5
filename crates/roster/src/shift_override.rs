//! One-off, date-scoped exceptions layered over roster rules.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use flightdeck_core::patch::present;
use flightdeck_core::Lifecycle;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conflict::{ConflictQuery, ConflictTarget};
use crate::error::RosterError;
use crate::time::{format_time, parse_date, parse_time, DATE_FORMAT};
use crate::validation::ValidationErrors;
use crate::window::TimeWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OverrideKind {
    /// Extra shift on top of the regular roster.
    Add,
    /// Swap one rule's hours for different hours on this date only.
    Replace,
    /// No regular coverage on this date.
    Cancel,
}

impl OverrideKind {
    pub const ALL: [OverrideKind; 3] = [Self::Add, Self::Replace, Self::Cancel];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Replace => "replace",
            Self::Cancel => "cancel",
        }
    }
}

impl FromStr for OverrideKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| format!("unknown override type '{}': must be one of add, replace, cancel", s))
    }
}

impl std::fmt::Display for OverrideKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The valid combinations of kind, times and rule reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "override_type", rename_all = "snake_case")]
pub enum OverrideShape {
    Add { window: TimeWindow },
    Replace { window: TimeWindow, replaces_rule_id: Uuid },
    Cancel,
}

impl OverrideShape {
    /// Rebuild a shape from flat columns, enforcing the same invariants as
    /// request validation.
    pub fn from_parts(
        kind: OverrideKind,
        start: Option<NaiveTime>,
        end: Option<NaiveTime>,
        replaces_rule_id: Option<Uuid>,
    ) -> Result<Self, RosterError> {
        let invalid = |msg: &str| RosterError::Validation(ValidationErrors::single("override_type", msg));
        match (kind, start, end, replaces_rule_id) {
            (OverrideKind::Add, Some(s), Some(e), None) => Ok(Self::Add { window: TimeWindow::new(s, e)? }),
            (OverrideKind::Replace, Some(s), Some(e), Some(rule_id)) => Ok(Self::Replace {
                window: TimeWindow::new(s, e)?,
                replaces_rule_id: rule_id,
            }),
            (OverrideKind::Cancel, None, None, None) => Ok(Self::Cancel),
            (OverrideKind::Cancel, ..) => Err(invalid("cancel overrides carry no times and no rule reference")),
            (OverrideKind::Add, _, _, Some(_)) => Err(invalid("add overrides must not reference a rule")),
            (OverrideKind::Replace, _, _, None) => Err(invalid("replace overrides must reference a rule")),
            _ => Err(invalid("add and replace overrides need both start and end times")),
        }
    }

    pub fn kind(&self) -> OverrideKind {
        match self {
            Self::Add { .. } => OverrideKind::Add,
            Self::Replace { .. } => OverrideKind::Replace,
            Self::Cancel => OverrideKind::Cancel,
        }
    }

    pub fn window(&self) -> Option<TimeWindow> {
        match self {
            Self::Add { window } | Self::Replace { window, .. } => Some(*window),
            Self::Cancel => None,
        }
    }

    pub fn replaces_rule_id(&self) -> Option<Uuid> {
        match self {
            Self::Replace { replaces_rule_id, .. } => Some(*replaces_rule_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftOverride {
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub date: NaiveDate,
    pub shape: OverrideShape,
    pub notes: Option<String>,
    pub lifecycle: Lifecycle,
}

impl ShiftOverride {
    pub fn kind(&self) -> OverrideKind {
        self.shape.kind()
    }

    pub fn is_live(&self) -> bool {
        self.lifecycle.is_active()
    }

    /// The window this override puts the instructor on shift for, if any.
    /// Cancels and voided overrides never occupy time.
    pub fn occupied_window(&self) -> Option<TimeWindow> {
        if !self.is_live() {
            return None;
        }
        self.shape.window()
    }
}

// ── Input ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OverrideFields {
    pub instructor_id: Option<String>,
    #[schema(example = "2026-10-19")]
    pub date: Option<String>,
    /// `add`, `replace` or `cancel`.
    pub override_type: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub replaces_rule_id: Option<String>,
    pub notes: Option<String>,
}

/// Partial update; nullable fields accept an explicit `null` to clear them.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct OverridePatch {
    pub date: Option<String>,
    pub override_type: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub start_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub end_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub replaces_rule_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverrideDraft {
    pub instructor_id: Uuid,
    pub date: NaiveDate,
    pub shape: OverrideShape,
    pub notes: Option<String>,
}

impl OverrideFields {
    pub fn from_override(ov: &ShiftOverride) -> Self {
        let window = ov.shape.window();
        Self {
            instructor_id: Some(ov.instructor_id.to_string()),
            date: Some(ov.date.format(DATE_FORMAT).to_string()),
            override_type: Some(ov.kind().as_str().to_string()),
            start_time: window.map(|w| format_time(w.start())),
            end_time: window.map(|w| format_time(w.end())),
            replaces_rule_id: ov.shape.replaces_rule_id().map(|id| id.to_string()),
            notes: ov.notes.clone(),
        }
    }

    pub fn apply(mut self, patch: OverridePatch) -> Self {
        if patch.date.is_some() {
            self.date = patch.date;
        }
        if patch.override_type.is_some() {
            self.override_type = patch.override_type;
        }
        if let Some(v) = patch.start_time {
            self.start_time = v;
        }
        if let Some(v) = patch.end_time {
            self.end_time = v;
        }
        if let Some(v) = patch.replaces_rule_id {
            self.replaces_rule_id = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
        self
    }

    pub fn validate(&self) -> Result<OverrideDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let instructor_id = errors
            .require("instructor_id", self.instructor_id.as_deref())
            .and_then(|raw| errors.capture("instructor_id", Uuid::parse_str(raw.trim())));
        let date = errors
            .require("date", self.date.as_deref())
            .and_then(|raw| errors.capture("date", parse_date(raw)));
        let kind = errors
            .require("override_type", self.override_type.as_deref())
            .and_then(|raw| errors.capture("override_type", raw.parse::<OverrideKind>()));

        let start = self
            .start_time
            .as_deref()
            .and_then(|raw| errors.capture("start_time", parse_time(raw)));
        let end = self
            .end_time
            .as_deref()
            .and_then(|raw| errors.capture("end_time", parse_time(raw)));
        let replaces_rule_id = self
            .replaces_rule_id
            .as_deref()
            .and_then(|raw| errors.capture("replaces_rule_id", Uuid::parse_str(raw.trim())));

        let shape = match kind {
            Some(OverrideKind::Cancel) => {
                if self.start_time.is_some() {
                    errors.error("start_time", "cancel overrides must not carry a start time");
                }
                if self.end_time.is_some() {
                    errors.error("end_time", "cancel overrides must not carry an end time");
                }
                if self.replaces_rule_id.is_some() {
                    errors.error("replaces_rule_id", "cancel overrides must not reference a rule");
                }
                Some(OverrideShape::Cancel)
            }
            Some(kind @ (OverrideKind::Add | OverrideKind::Replace)) => {
                if self.start_time.is_none() {
                    errors.error("start_time", format!("start_time is required for {} overrides", kind));
                }
                if self.end_time.is_none() {
                    errors.error("end_time", format!("end_time is required for {} overrides", kind));
                }
                let window = match (start, end) {
                    (Some(s), Some(e)) => errors.capture("end_time", TimeWindow::new(s, e)),
                    _ => None,
                };
                match kind {
                    OverrideKind::Add => {
                        if self.replaces_rule_id.is_some() {
                            errors.error("replaces_rule_id", "add overrides must not reference a rule");
                        }
                        window.map(|window| OverrideShape::Add { window })
                    }
                    _ => {
                        if self.replaces_rule_id.is_none() {
                            errors.error("replaces_rule_id", "replaces_rule_id is required for replace overrides");
                        }
                        match (window, replaces_rule_id) {
                            (Some(window), Some(replaces_rule_id)) => {
                                Some(OverrideShape::Replace { window, replaces_rule_id })
                            }
                            _ => None,
                        }
                    }
                }
            }
            None => None,
        };

        errors.into_result()?;

        match (instructor_id, date, shape) {
            (Some(instructor_id), Some(date), Some(shape)) => Ok(OverrideDraft {
                instructor_id,
                date,
                shape,
                notes: self.notes.clone().filter(|n| !n.trim().is_empty()),
            }),
            _ => Err(ValidationErrors::single("body", "incomplete override")),
        }
    }
}

impl OverridePatch {
    /// Check the format of every field the patch carries.
    pub fn validate_fields(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(raw) = &self.date {
            errors.capture("date", parse_date(raw));
        }
        if let Some(raw) = &self.override_type {
            errors.capture("override_type", raw.parse::<OverrideKind>());
        }
        for (field, raw) in [("start_time", &self.start_time), ("end_time", &self.end_time)] {
            if let Some(Some(raw)) = raw {
                errors.capture(field, parse_time(raw));
            }
        }
        if let Some(Some(raw)) = &self.replaces_rule_id {
            errors.capture("replaces_rule_id", Uuid::parse_str(raw.trim()));
        }
        errors.into_result()
    }
}

impl OverrideDraft {
    /// Conflict query for add/replace drafts; `None` for cancels, which only
    /// remove availability and cannot collide with anything.
    ///
    /// A replacement is never compared against the rule it replaces.
    pub fn conflict_query(&self, exclude_override_id: Option<Uuid>) -> Option<ConflictQuery> {
        let window = self.shape.window()?;
        Some(ConflictQuery {
            instructor_id: self.instructor_id,
            target: ConflictTarget::Date(self.date),
            window,
            exclude_rule_id: self.shape.replaces_rule_id(),
            exclude_override_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTRUCTOR: &str = "7f1c1a2e-1111-4a5b-9c3d-000000000001";
    const RULE: &str = "7f1c1a2e-2222-4a5b-9c3d-000000000002";

    fn fields(kind: &str) -> OverrideFields {
        OverrideFields {
            instructor_id: Some(INSTRUCTOR.into()),
            date: Some("2026-10-19".into()),
            override_type: Some(kind.into()),
            ..Default::default()
        }
    }

    #[test]
    fn add_with_times_is_valid() {
        let mut f = fields("add");
        f.start_time = Some("14:00".into());
        f.end_time = Some("16:00".into());
        let draft = f.validate().unwrap();
        assert_eq!(draft.shape.kind(), OverrideKind::Add);
        assert!(draft.conflict_query(None).is_some());
    }

    #[test]
    fn cancel_with_times_is_rejected() {
        let mut f = fields("cancel");
        f.start_time = Some("09:00".into());
        f.end_time = Some("12:00".into());
        let errors = f.validate().unwrap_err();
        assert!(errors.has_field("start_time"));
        assert!(errors.has_field("end_time"));
    }

    #[test]
    fn cancel_without_times_skips_the_conflict_check() {
        let draft = fields("cancel").validate().unwrap();
        assert_eq!(draft.shape, OverrideShape::Cancel);
        assert!(draft.conflict_query(None).is_none());
    }

    #[test]
    fn cancel_referencing_a_rule_is_rejected() {
        let mut f = fields("cancel");
        f.replaces_rule_id = Some(RULE.into());
        assert!(f.validate().unwrap_err().has_field("replaces_rule_id"));
    }

    #[test]
    fn replace_without_rule_reference_is_rejected() {
        let mut f = fields("replace");
        f.start_time = Some("10:00".into());
        f.end_time = Some("11:00".into());
        let errors = f.validate().unwrap_err();
        assert!(errors.has_field("replaces_rule_id"));
    }

    #[test]
    fn replace_excludes_the_replaced_rule_from_its_check() {
        let mut f = fields("replace");
        f.start_time = Some("10:00".into());
        f.end_time = Some("11:00".into());
        f.replaces_rule_id = Some(RULE.into());
        let query = f.validate().unwrap().conflict_query(None).unwrap();
        assert_eq!(query.exclude_rule_id, Some(Uuid::parse_str(RULE).unwrap()));
    }

    #[test]
    fn add_referencing_a_rule_is_rejected() {
        let mut f = fields("add");
        f.start_time = Some("10:00".into());
        f.end_time = Some("11:00".into());
        f.replaces_rule_id = Some(RULE.into());
        assert!(f.validate().unwrap_err().has_field("replaces_rule_id"));
    }

    #[test]
    fn add_missing_times_and_bad_kind_are_reported() {
        assert!(fields("add").validate().unwrap_err().has_field("start_time"));
        assert!(fields("swap").validate().unwrap_err().has_field("override_type"));
    }

    #[test]
    fn patch_to_cancel_must_clear_times() {
        let mut f = fields("add");
        f.start_time = Some("14:00".into());
        f.end_time = Some("16:00".into());
        let draft = f.validate().unwrap();
        let ov = ShiftOverride {
            id: Uuid::new_v4(),
            instructor_id: draft.instructor_id,
            date: draft.date,
            shape: draft.shape,
            notes: None,
            lifecycle: Lifecycle::Active,
        };

        let keep_times: OverridePatch = serde_json::from_str(r#"{"override_type": "cancel"}"#).unwrap();
        assert!(OverrideFields::from_override(&ov).apply(keep_times).validate().is_err());

        let clear_times: OverridePatch = serde_json::from_str(
            r#"{"override_type": "cancel", "start_time": null, "end_time": null}"#,
        )
        .unwrap();
        let merged = OverrideFields::from_override(&ov).apply(clear_times).validate().unwrap();
        assert_eq!(merged.shape, OverrideShape::Cancel);
    }

    #[test]
    fn shape_from_columns_enforces_invariants() {
        let s = NaiveTime::from_hms_opt(9, 0, 0);
        let e = NaiveTime::from_hms_opt(10, 0, 0);
        assert!(OverrideShape::from_parts(OverrideKind::Cancel, None, None, None).is_ok());
        assert!(OverrideShape::from_parts(OverrideKind::Cancel, s, e, None).is_err());
        assert!(OverrideShape::from_parts(OverrideKind::Replace, s, e, None).is_err());
        assert!(OverrideShape::from_parts(OverrideKind::Add, e, s, None).is_err());
    }

    #[test]
    fn patch_formats_are_checked_up_front() {
        let patch: OverridePatch =
            serde_json::from_str(r#"{"override_type": "swap", "end_time": "25:00", "replaces_rule_id": "x"}"#)
                .unwrap();
        let errors = patch.validate_fields().unwrap_err();
        for field in ["override_type", "end_time", "replaces_rule_id"] {
            assert!(errors.has_field(field), "missing {field}");
        }
    }
}
