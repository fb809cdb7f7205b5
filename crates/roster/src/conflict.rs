//! Schedule conflict detection for one instructor.
//!
//! A proposed window conflicts with every live roster rule and every live
//! add/replace override that occupies overlapping time on the same day.
//! Cancel overrides only remove availability, so they never conflict.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rule::{ranges_intersect, RosterRule};
use crate::shift_override::{OverrideKind, ShiftOverride};
use crate::time::{parse_date, parse_time, weekday_index};
use crate::validation::ValidationErrors;
use crate::window::TimeWindow;

/// Which day(s) the proposed window lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictTarget {
    /// A single calendar date (override or ad-hoc check).
    Date(NaiveDate),
    /// Every matching weekday inside an effective range (roster rule).
    Weekly {
        day_of_week: u8,
        effective_from: NaiveDate,
        effective_until: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictQuery {
    pub instructor_id: Uuid,
    pub target: ConflictTarget,
    pub window: TimeWindow,
    /// The rule being edited, or the rule a replacement stands in for.
    pub exclude_rule_id: Option<Uuid>,
    /// The override being edited.
    pub exclude_override_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShiftKind {
    Regular,
    Add,
    Replace,
}

impl ShiftKind {
    /// Overrides that occupy time; `None` for cancels.
    fn of_override(kind: OverrideKind) -> Option<Self> {
        match kind {
            OverrideKind::Add => Some(Self::Add),
            OverrideKind::Replace => Some(Self::Replace),
            OverrideKind::Cancel => None,
        }
    }
}

/// An existing entry that collides with the proposed window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConflictingShift {
    pub id: Uuid,
    #[serde(with = "crate::time::hhmm")]
    #[schema(value_type = String, example = "09:00")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::time::hhmm")]
    #[schema(value_type = String, example = "12:00")]
    pub end_time: NaiveTime,
    #[serde(rename = "type")]
    pub kind: ShiftKind,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConflictReport {
    pub has_conflict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicting_shifts: Option<Vec<ConflictingShift>>,
}

impl ConflictReport {
    pub fn from_conflicts(conflicts: Vec<ConflictingShift>) -> Self {
        if conflicts.is_empty() {
            Self {
                has_conflict: false,
                conflicting_shifts: None,
            }
        } else {
            Self {
                has_conflict: true,
                conflicting_shifts: Some(conflicts),
            }
        }
    }
}

/// Body of an ad-hoc conflict check against a single date.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConflictCheckFields {
    pub instructor_id: Option<String>,
    #[schema(example = "2026-10-19")]
    pub date: Option<String>,
    #[schema(example = "11:00")]
    pub start_time: Option<String>,
    #[schema(example = "13:00")]
    pub end_time: Option<String>,
    pub exclude_rule_id: Option<String>,
    pub exclude_override_id: Option<String>,
}

impl ConflictCheckFields {
    pub fn validate(&self) -> Result<ConflictQuery, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let instructor_id = errors
            .require("instructor_id", self.instructor_id.as_deref())
            .and_then(|raw| errors.capture("instructor_id", Uuid::parse_str(raw.trim())));
        let date = errors
            .require("date", self.date.as_deref())
            .and_then(|raw| errors.capture("date", parse_date(raw)));
        let start = errors
            .require("start_time", self.start_time.as_deref())
            .and_then(|raw| errors.capture("start_time", parse_time(raw)));
        let end = errors
            .require("end_time", self.end_time.as_deref())
            .and_then(|raw| errors.capture("end_time", parse_time(raw)));
        let window = match (start, end) {
            (Some(s), Some(e)) => errors.capture("end_time", TimeWindow::new(s, e)),
            _ => None,
        };
        let exclude_rule_id = self
            .exclude_rule_id
            .as_deref()
            .and_then(|raw| errors.capture("exclude_rule_id", Uuid::parse_str(raw.trim())));
        let exclude_override_id = self
            .exclude_override_id
            .as_deref()
            .and_then(|raw| errors.capture("exclude_override_id", Uuid::parse_str(raw.trim())));

        errors.into_result()?;

        match (instructor_id, date, window) {
            (Some(instructor_id), Some(date), Some(window)) => Ok(ConflictQuery {
                instructor_id,
                target: ConflictTarget::Date(date),
                window,
                exclude_rule_id,
                exclude_override_id,
            }),
            _ => Err(ValidationErrors::single("body", "incomplete conflict check")),
        }
    }
}

impl ConflictQuery {
    fn rule_collides(&self, rule: &RosterRule) -> bool {
        if rule.instructor_id != self.instructor_id
            || Some(rule.id) == self.exclude_rule_id
            || !rule.is_live()
        {
            return false;
        }
        let same_day = match self.target {
            ConflictTarget::Date(date) => rule.applies_on(date),
            ConflictTarget::Weekly {
                day_of_week,
                effective_from,
                effective_until,
            } => rule.day_of_week == day_of_week && rule.shares_a_date_with(effective_from, effective_until),
        };
        same_day && rule.window.overlaps(&self.window)
    }

    fn override_collides(&self, ov: &ShiftOverride) -> bool {
        if ov.instructor_id != self.instructor_id || Some(ov.id) == self.exclude_override_id {
            return false;
        }
        // When editing a rule, its date replacements stand in for it.
        if matches!(self.target, ConflictTarget::Weekly { .. })
            && self.exclude_rule_id.is_some()
            && ov.shape.replaces_rule_id() == self.exclude_rule_id
        {
            return false;
        }
        let Some(window) = ov.occupied_window() else {
            return false;
        };
        let same_day = match self.target {
            ConflictTarget::Date(date) => ov.date == date,
            ConflictTarget::Weekly {
                day_of_week,
                effective_from,
                effective_until,
            } => {
                weekday_index(ov.date) == day_of_week
                    && ranges_intersect(effective_from, effective_until, ov.date, Some(ov.date))
            }
        };
        same_day && window.overlaps(&self.window)
    }
}

/// Scan candidate rules and overrides for collisions with `query`.
///
/// Candidates may include other instructors, voided rows and cancels; they
/// are filtered here so callers can pass a coarse pre-selection. Results are
/// ordered by start time, regular shifts first on ties.
pub fn find_conflicts(
    query: &ConflictQuery,
    rules: &[RosterRule],
    overrides: &[ShiftOverride],
) -> Vec<ConflictingShift> {
    let mut conflicts: Vec<ConflictingShift> = rules
        .iter()
        .filter(|r| query.rule_collides(r))
        .map(|r| ConflictingShift {
            id: r.id,
            start_time: r.window.start(),
            end_time: r.window.end(),
            kind: ShiftKind::Regular,
            notes: r.notes.clone(),
        })
        .collect();

    conflicts.extend(
        overrides
            .iter()
            .filter(|o| query.override_collides(o))
            .filter_map(|o| {
                let kind = ShiftKind::of_override(o.kind())?;
                let window = o.occupied_window()?;
                Some(ConflictingShift {
                    id: o.id,
                    start_time: window.start(),
                    end_time: window.end(),
                    kind,
                    notes: o.notes.clone(),
                })
            }),
    );

    conflicts.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| (a.kind != ShiftKind::Regular).cmp(&(b.kind != ShiftKind::Regular)))
    });
    conflicts
}

#[cfg(test)]
mod tests;
