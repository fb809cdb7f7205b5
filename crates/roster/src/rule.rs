//! Recurring weekly availability windows ("roster rules").

use chrono::{Days, NaiveDate};
use flightdeck_core::patch::present;
use flightdeck_core::Lifecycle;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conflict::{ConflictQuery, ConflictTarget};
use crate::time::{format_time, parse_date, parse_time, weekday_index, DATE_FORMAT};
use crate::validation::ValidationErrors;
use crate::window::TimeWindow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterRule {
    pub id: Uuid,
    pub instructor_id: Uuid,
    /// 0 = Sunday … 6 = Saturday.
    pub day_of_week: u8,
    pub window: TimeWindow,
    pub is_active: bool,
    pub effective_from: NaiveDate,
    pub effective_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lifecycle: Lifecycle,
}

impl RosterRule {
    /// Active flag set and not voided.
    pub fn is_live(&self) -> bool {
        self.is_active && self.lifecycle.is_active()
    }

    pub fn in_effect_on(&self, date: NaiveDate) -> bool {
        self.effective_from <= date && self.effective_until.map_or(true, |until| until >= date)
    }

    /// Whether this rule puts the instructor on shift on `date`.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.is_live() && weekday_index(date) == self.day_of_week && self.in_effect_on(date)
    }

    /// Whether this rule and a rule for the same weekday effective
    /// `from..=until` would both apply on at least one date.
    pub fn shares_a_date_with(&self, from: NaiveDate, until: Option<NaiveDate>) -> bool {
        let start = self.effective_from.max(from);
        let end = match (self.effective_until, until) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let offset = (7 + u64::from(self.day_of_week) - u64::from(weekday_index(start))) % 7;
        let Some(first) = start.checked_add_days(Days::new(offset)) else {
            return false;
        };
        end.map_or(true, |end| first <= end)
    }
}

pub(crate) fn ranges_intersect(
    a_from: NaiveDate,
    a_until: Option<NaiveDate>,
    b_from: NaiveDate,
    b_until: Option<NaiveDate>,
) -> bool {
    a_until.map_or(true, |u| b_from <= u) && b_until.map_or(true, |u| a_from <= u)
}

// ── Input ────────────────────────────────────────────────────────────

/// Raw rule fields as received on the wire. Everything is optional so that
/// missing and malformed fields are reported together.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RuleFields {
    pub instructor_id: Option<String>,
    pub day_of_week: Option<i64>,
    #[schema(example = "09:00")]
    pub start_time: Option<String>,
    #[schema(example = "12:00")]
    pub end_time: Option<String>,
    pub is_active: Option<bool>,
    #[schema(example = "2026-01-01")]
    pub effective_from: Option<String>,
    pub effective_until: Option<String>,
    pub notes: Option<String>,
}

/// Partial update. `effective_until` and `notes` distinguish "absent" from
/// an explicit `null` that clears the stored value.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct RulePatch {
    pub day_of_week: Option<i64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_active: Option<bool>,
    pub effective_from: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub effective_until: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

/// A validated rule ready to be checked for conflicts and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDraft {
    pub instructor_id: Uuid,
    pub day_of_week: u8,
    pub window: TimeWindow,
    pub is_active: bool,
    pub effective_from: NaiveDate,
    pub effective_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl RuleFields {
    /// Rebuild the wire form of a stored rule, so a patch can be merged and
    /// the result validated exactly like a create.
    pub fn from_rule(rule: &RosterRule) -> Self {
        Self {
            instructor_id: Some(rule.instructor_id.to_string()),
            day_of_week: Some(rule.day_of_week as i64),
            start_time: Some(format_time(rule.window.start())),
            end_time: Some(format_time(rule.window.end())),
            is_active: Some(rule.is_active),
            effective_from: Some(rule.effective_from.format(DATE_FORMAT).to_string()),
            effective_until: rule
                .effective_until
                .map(|d| d.format(DATE_FORMAT).to_string()),
            notes: rule.notes.clone(),
        }
    }

    pub fn apply(mut self, patch: RulePatch) -> Self {
        if patch.day_of_week.is_some() {
            self.day_of_week = patch.day_of_week;
        }
        if patch.start_time.is_some() {
            self.start_time = patch.start_time;
        }
        if patch.end_time.is_some() {
            self.end_time = patch.end_time;
        }
        if patch.is_active.is_some() {
            self.is_active = patch.is_active;
        }
        if patch.effective_from.is_some() {
            self.effective_from = patch.effective_from;
        }
        if let Some(until) = patch.effective_until {
            self.effective_until = until;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        self
    }

    /// Validate every field. `effective_from` defaults to `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<RuleDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let instructor_id = errors
            .require("instructor_id", self.instructor_id.as_deref())
            .and_then(|raw| errors.capture("instructor_id", Uuid::parse_str(raw.trim())));

        let day_of_week = errors
            .require("day_of_week", self.day_of_week)
            .and_then(|d| match u8::try_from(d) {
                Ok(d) if d <= 6 => Some(d),
                _ => {
                    errors.error("day_of_week", "day_of_week must be between 0 (Sunday) and 6 (Saturday)");
                    None
                }
            });

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

        let effective_from = match self.effective_from.as_deref() {
            Some(raw) => errors.capture("effective_from", parse_date(raw)),
            None => Some(today),
        };
        let effective_until = match self.effective_until.as_deref() {
            Some(raw) => errors.capture("effective_until", parse_date(raw)).map(Some),
            None => Some(None),
        };
        if let (Some(from), Some(Some(until))) = (effective_from, effective_until) {
            if until < from {
                errors.error("effective_until", "effective_until must not be before effective_from");
            }
        }

        errors.into_result()?;

        match (instructor_id, day_of_week, window, effective_from, effective_until) {
            (Some(instructor_id), Some(day_of_week), Some(window), Some(effective_from), Some(effective_until)) => {
                Ok(RuleDraft {
                    instructor_id,
                    day_of_week,
                    window,
                    is_active: self.is_active.unwrap_or(true),
                    effective_from,
                    effective_until,
                    notes: self.notes.clone().filter(|n| !n.trim().is_empty()),
                })
            }
            _ => Err(ValidationErrors::single("body", "incomplete rule")),
        }
    }
}

impl RulePatch {
    /// Check the format of every field the patch carries. Cross-field rules
    /// are checked once the patch is merged over the stored rule.
    pub fn validate_fields(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(d) = self.day_of_week {
            if !(0..=6).contains(&d) {
                errors.error("day_of_week", "day_of_week must be between 0 (Sunday) and 6 (Saturday)");
            }
        }
        for (field, raw) in [("start_time", &self.start_time), ("end_time", &self.end_time)] {
            if let Some(raw) = raw {
                errors.capture(field, parse_time(raw));
            }
        }
        if let Some(raw) = &self.effective_from {
            errors.capture("effective_from", parse_date(raw));
        }
        if let Some(Some(raw)) = &self.effective_until {
            errors.capture("effective_until", parse_date(raw));
        }
        errors.into_result()
    }
}

impl RuleDraft {
    /// Conflict query for this draft. Pass the rule's own id when updating.
    pub fn conflict_query(&self, exclude_rule_id: Option<Uuid>) -> ConflictQuery {
        ConflictQuery {
            instructor_id: self.instructor_id,
            target: ConflictTarget::Weekly {
                day_of_week: self.day_of_week,
                effective_from: self.effective_from,
                effective_until: self.effective_until,
            },
            window: self.window,
            exclude_rule_id,
            exclude_override_id: None,
        }
    }
}
