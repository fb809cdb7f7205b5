//! Instructor roster logic: weekly rules, date overrides, and conflict checks.
//!
//! This crate is pure: it validates input, answers overlap questions and
//! resolves the shifts an instructor works on a date. Loading candidate rows
//! and persisting results is the server crate's job.

pub mod availability;
pub mod conflict;
pub mod error;
pub mod rule;
pub mod shift_override;
pub mod window;

pub use flightdeck_core::{time, validation};
pub use flightdeck_core::{FieldError, ValidationErrors};

pub use availability::{shifts_on, EffectiveShift, ShiftSource};
pub use conflict::{find_conflicts, ConflictCheckFields, ConflictQuery, ConflictReport, ConflictTarget, ConflictingShift, ShiftKind};
pub use error::RosterError;
pub use rule::{RosterRule, RuleDraft, RuleFields, RulePatch};
pub use shift_override::{OverrideDraft, OverrideFields, OverrideKind, OverridePatch, OverrideShape, ShiftOverride};
pub use window::TimeWindow;
