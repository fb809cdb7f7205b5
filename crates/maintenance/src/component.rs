//! Maintainable aircraft components and their service intervals.

use std::str::FromStr;

use chrono::NaiveDate;
use flightdeck_core::ValidationErrors;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MaintenanceError;

/// Which dimensions a component's service interval is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntervalType {
    Hours,
    Calendar,
    Both,
}

impl IntervalType {
    pub const ALL: [IntervalType; 3] = [Self::Hours, Self::Calendar, Self::Both];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hours => "hours",
            Self::Calendar => "calendar",
            Self::Both => "both",
        }
    }

    pub fn tracks_hours(&self) -> bool {
        matches!(self, Self::Hours | Self::Both)
    }

    pub fn tracks_calendar(&self) -> bool {
        matches!(self, Self::Calendar | Self::Both)
    }
}

impl FromStr for IntervalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| format!("unknown interval type '{}'", s))
    }
}

impl std::fmt::Display for IntervalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MaintenanceComponent {
    pub id: Uuid,
    pub aircraft_id: Uuid,
    pub name: String,
    pub interval_type: IntervalType,
    pub interval_hours: Option<f64>,
    pub interval_days: Option<i64>,
    pub last_completed_hours: Option<f64>,
    pub last_completed_date: Option<NaiveDate>,
    /// Hours reading at which the next service is due.
    pub current_due_hours: Option<f64>,
    pub current_due_date: Option<NaiveDate>,
    /// Single-use grace period as a percentage of the interval.
    pub extension_limit_percent: Option<f64>,
}

impl MaintenanceComponent {
    pub(crate) fn positive_interval_hours(&self) -> Result<f64, MaintenanceError> {
        self.interval_hours
            .filter(|h| h.is_finite() && *h > 0.0)
            .ok_or(MaintenanceError::MissingIntervalHours(self.id))
    }

    pub(crate) fn positive_interval_days(&self) -> Result<i64, MaintenanceError> {
        self.interval_days
            .filter(|d| *d > 0)
            .ok_or(MaintenanceError::MissingIntervalDays(self.id))
    }
}

/// Check an extension percentage: `0 < p <= 100`.
pub fn check_extension_percent(p: f64) -> Result<f64, MaintenanceError> {
    if p.is_finite() && p > 0.0 && p <= 100.0 {
        Ok(p)
    } else {
        Err(MaintenanceError::InvalidExtension(p))
    }
}

/// Body of an extension grant. `null` withdraws a previous grant.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct ExtensionRequest {
    #[serde(default, deserialize_with = "flightdeck_core::patch::present")]
    #[schema(value_type = Option<f64>, example = 20.0)]
    pub extension_limit_percent: Option<Option<f64>>,
}

impl ExtensionRequest {
    /// The percentage to store, or `None` to clear it.
    pub fn validate(&self) -> Result<Option<f64>, ValidationErrors> {
        match self.extension_limit_percent {
            None => Err(ValidationErrors::single(
                "extension_limit_percent",
                "extension_limit_percent is required (null clears it)",
            )),
            Some(None) => Ok(None),
            Some(Some(p)) => check_extension_percent(p)
                .map(Some)
                .map_err(|e| ValidationErrors::single("extension_limit_percent", e.to_string())),
        }
    }
}
