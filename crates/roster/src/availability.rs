//! Effective shifts for one instructor on one date.
//!
//! Regular shifts come from roster rules that apply on the date. Overrides on
//! the same date are layered on top: a cancel drops every regular shift, a
//! replace swaps out the rule it names, and an add is appended.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rule::RosterRule;
use crate::shift_override::{OverrideShape, ShiftOverride};

/// Where an effective shift came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ShiftSource {
    Regular { rule_id: Uuid },
    Added { override_id: Uuid },
    Replacement { override_id: Uuid, rule_id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EffectiveShift {
    #[serde(with = "crate::time::hhmm")]
    #[schema(value_type = String, example = "09:00")]
    pub start_time: NaiveTime,
    #[serde(with = "crate::time::hhmm")]
    #[schema(value_type = String, example = "12:00")]
    pub end_time: NaiveTime,
    #[serde(flatten)]
    pub source: ShiftSource,
    pub notes: Option<String>,
}

/// Resolve the shifts `instructor_id` works on `date`.
///
/// Rows for other instructors, other dates and voided rows are ignored.
pub fn shifts_on(
    instructor_id: Uuid,
    date: NaiveDate,
    rules: &[RosterRule],
    overrides: &[ShiftOverride],
) -> Vec<EffectiveShift> {
    let todays: Vec<&ShiftOverride> = overrides
        .iter()
        .filter(|o| o.instructor_id == instructor_id && o.date == date && o.is_live())
        .collect();

    let cancelled = todays.iter().any(|o| o.shape == OverrideShape::Cancel);
    let replaced: Vec<Uuid> = todays.iter().filter_map(|o| o.shape.replaces_rule_id()).collect();

    let mut shifts: Vec<EffectiveShift> = if cancelled {
        Vec::new()
    } else {
        rules
            .iter()
            .filter(|r| r.instructor_id == instructor_id && r.applies_on(date))
            .filter(|r| !replaced.contains(&r.id))
            .map(|r| EffectiveShift {
                start_time: r.window.start(),
                end_time: r.window.end(),
                source: ShiftSource::Regular { rule_id: r.id },
                notes: r.notes.clone(),
            })
            .collect()
    };

    for ov in todays {
        let source = match ov.shape {
            OverrideShape::Add { .. } => ShiftSource::Added { override_id: ov.id },
            // A cancel also removes replacement hours for regular shifts.
            OverrideShape::Replace { .. } if cancelled => continue,
            OverrideShape::Replace { replaces_rule_id, .. } => ShiftSource::Replacement {
                override_id: ov.id,
                rule_id: replaces_rule_id,
            },
            OverrideShape::Cancel => continue,
        };
        if let Some(window) = ov.occupied_window() {
            shifts.push(EffectiveShift {
                start_time: window.start(),
                end_time: window.end(),
                source,
                notes: ov.notes.clone(),
            });
        }
    }

    shifts.sort_by_key(|s| (s.start_time, s.end_time));
    shifts
}
