//! Due-status classifier.
//!
//! Pure: the same component, readings and thresholds always produce the same
//! status and message. Nothing here is persisted.

use chrono::{Days, NaiveDate};
use flightdeck_core::config::MaintenanceConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::component::MaintenanceComponent;

/// Ordered by severity, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DueStatus {
    Ok,
    DueSoon,
    WithinExtension,
    Overdue,
}

/// Lookahead windows for `due_soon`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DueThresholds {
    pub hours: f64,
    pub days: i64,
}

impl Default for DueThresholds {
    fn default() -> Self {
        MaintenanceConfig::default().into()
    }
}

impl From<MaintenanceConfig> for DueThresholds {
    fn from(config: MaintenanceConfig) -> Self {
        Self {
            hours: config.due_soon_hours,
            days: config.due_soon_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HoursStatus {
    pub status: DueStatus,
    pub due_hours: f64,
    pub extended_due_hours: Option<f64>,
    /// Negative once the due point has passed.
    pub remaining_hours: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CalendarStatus {
    pub status: DueStatus,
    pub due_date: NaiveDate,
    pub extended_due_date: Option<NaiveDate>,
    /// Negative once the due date has passed.
    pub remaining_days: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ComponentDueStatus {
    pub component_id: Uuid,
    /// Most severe of the evaluated dimensions.
    pub status: DueStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<HoursStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar: Option<CalendarStatus>,
}

pub fn classify_hours(
    current_hours: f64,
    due_hours: f64,
    interval_hours: Option<f64>,
    extension_percent: Option<f64>,
    thresholds: DueThresholds,
) -> HoursStatus {
    let remaining = due_hours - current_hours;
    let extended = extension_percent
        .zip(interval_hours)
        .map(|(pct, interval)| due_hours + interval * (pct / 100.0));

    let (status, message) = if current_hours > due_hours {
        let over = current_hours - due_hours;
        match extended {
            Some(limit) if current_hours <= limit => (
                DueStatus::WithinExtension,
                format!("Overdue by {over:.1} hours, within extension to {limit:.1} hours"),
            ),
            Some(limit) => (
                DueStatus::Overdue,
                format!("Overdue by {over:.1} hours, extension to {limit:.1} hours exceeded"),
            ),
            None => (DueStatus::Overdue, format!("Overdue by {over:.1} hours")),
        }
    } else if remaining <= thresholds.hours {
        (DueStatus::DueSoon, format!("Due in {remaining:.1} hours"))
    } else {
        (DueStatus::Ok, format!("{remaining:.1} hours remaining"))
    };

    HoursStatus {
        status,
        due_hours,
        extended_due_hours: extended,
        remaining_hours: remaining,
        message,
    }
}

/// Extended calendar allowance is whole days, rounded down.
pub fn classify_calendar(
    today: NaiveDate,
    due_date: NaiveDate,
    interval_days: Option<i64>,
    extension_percent: Option<f64>,
    thresholds: DueThresholds,
) -> CalendarStatus {
    let remaining = (due_date - today).num_days();
    let extended = extension_percent
        .zip(interval_days)
        .and_then(|(pct, days)| {
            let extra = (days as f64 * pct / 100.0).floor();
            due_date.checked_add_days(Days::new(extra.max(0.0) as u64))
        });

    let (status, message) = if today > due_date {
        let over = -remaining;
        match extended {
            Some(limit) if today <= limit => (
                DueStatus::WithinExtension,
                format!("Overdue by {over} days, within extension to {limit}"),
            ),
            Some(limit) => (
                DueStatus::Overdue,
                format!("Overdue by {over} days, extension to {limit} exceeded"),
            ),
            None => (DueStatus::Overdue, format!("Overdue by {over} days")),
        }
    } else if remaining <= thresholds.days {
        (DueStatus::DueSoon, format!("Due in {remaining} days"))
    } else {
        (DueStatus::Ok, format!("{remaining} days remaining"))
    };

    CalendarStatus {
        status,
        due_date,
        extended_due_date: extended,
        remaining_days: remaining,
        message,
    }
}

/// Classify every dimension the component tracks.
///
/// The hours dimension is skipped when no `current_hours` reading is given or
/// the component has no hours due point; likewise for calendar.
pub fn classify(
    component: &MaintenanceComponent,
    current_hours: Option<f64>,
    today: NaiveDate,
    thresholds: DueThresholds,
) -> ComponentDueStatus {
    let ext = component.extension_limit_percent;

    let hours = if component.interval_type.tracks_hours() {
        current_hours
            .zip(component.current_due_hours)
            .map(|(current, due)| classify_hours(current, due, component.interval_hours, ext, thresholds))
    } else {
        None
    };
    let calendar = if component.interval_type.tracks_calendar() {
        component
            .current_due_date
            .map(|due| classify_calendar(today, due, component.interval_days, ext, thresholds))
    } else {
        None
    };

    let worst = [
        hours.as_ref().map(|h| (h.status, &h.message)),
        calendar.as_ref().map(|c| (c.status, &c.message)),
    ]
    .into_iter()
    .flatten()
    .fold(None::<(DueStatus, &String)>, |acc, (status, message)| match acc {
        Some((s, _)) if s >= status => acc,
        _ => Some((status, message)),
    });

    let (status, message) = match worst {
        Some((status, message)) => (status, message.clone()),
        None => (DueStatus::Ok, "No due point recorded".to_string()),
    };

    ComponentDueStatus {
        component_id: component.id,
        status,
        message,
        hours,
        calendar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::IntervalType;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn component(interval_type: IntervalType) -> MaintenanceComponent {
        MaintenanceComponent {
            id: Uuid::new_v4(),
            aircraft_id: Uuid::new_v4(),
            name: "Oil change".into(),
            interval_type,
            interval_hours: Some(100.0),
            interval_days: Some(30),
            last_completed_hours: Some(400.0),
            last_completed_date: Some(date(2026, 9, 20)),
            current_due_hours: Some(500.0),
            current_due_date: Some(date(2026, 10, 20)),
            extension_limit_percent: None,
        }
    }

    #[test]
    fn five_hours_remaining_is_due_soon() {
        let s = classify_hours(495.0, 500.0, Some(100.0), None, DueThresholds::default());
        assert_eq!(s.status, DueStatus::DueSoon);
        assert_eq!(s.remaining_hours, 5.0);
        assert_eq!(s.message, "Due in 5.0 hours");
    }

    #[test]
    fn past_due_within_extension() {
        let s = classify_hours(505.0, 500.0, Some(100.0), Some(20.0), DueThresholds::default());
        assert_eq!(s.status, DueStatus::WithinExtension);
        assert_eq!(s.extended_due_hours, Some(520.0));

        let s = classify_hours(520.5, 500.0, Some(100.0), Some(20.0), DueThresholds::default());
        assert_eq!(s.status, DueStatus::Overdue);
    }

    #[test]
    fn past_due_without_extension_is_overdue() {
        let s = classify_hours(505.0, 500.0, Some(100.0), None, DueThresholds::default());
        assert_eq!(s.status, DueStatus::Overdue);
        assert_eq!(s.message, "Overdue by 5.0 hours");
    }

    #[test]
    fn comfortably_early_is_ok() {
        let s = classify_hours(450.0, 500.0, Some(100.0), None, DueThresholds::default());
        assert_eq!(s.status, DueStatus::Ok);
        let s = classify_hours(450.0, 500.0, Some(100.0), None, DueThresholds { hours: 60.0, days: 7 });
        assert_eq!(s.status, DueStatus::DueSoon);
    }

    #[test]
    fn calendar_thresholds_and_extension() {
        let t = DueThresholds::default();
        let due = date(2026, 10, 20);
        assert_eq!(classify_calendar(date(2026, 10, 1), due, Some(30), None, t).status, DueStatus::Ok);
        assert_eq!(classify_calendar(date(2026, 10, 13), due, Some(30), None, t).status, DueStatus::DueSoon);
        assert_eq!(classify_calendar(due, due, Some(30), None, t).status, DueStatus::DueSoon);
        assert_eq!(classify_calendar(date(2026, 10, 21), due, Some(30), None, t).status, DueStatus::Overdue);

        // 10 % of 30 days = 3 days of grace.
        let s = classify_calendar(date(2026, 10, 23), due, Some(30), Some(10.0), t);
        assert_eq!(s.status, DueStatus::WithinExtension);
        assert_eq!(s.extended_due_date, Some(date(2026, 10, 23)));
        let s = classify_calendar(date(2026, 10, 24), due, Some(30), Some(10.0), t);
        assert_eq!(s.status, DueStatus::Overdue);
    }

    #[test]
    fn both_reports_the_more_severe_dimension() {
        let c = component(IntervalType::Both);
        let s = classify(&c, Some(450.0), date(2026, 10, 22), DueThresholds::default());
        assert_eq!(s.hours.as_ref().unwrap().status, DueStatus::Ok);
        assert_eq!(s.calendar.as_ref().unwrap().status, DueStatus::Overdue);
        assert_eq!(s.status, DueStatus::Overdue);
        assert_eq!(s.message, "Overdue by 2 days");
    }

    #[test]
    fn dimensions_outside_interval_type_are_skipped() {
        let c = component(IntervalType::Hours);
        let s = classify(&c, Some(495.0), date(2027, 1, 1), DueThresholds::default());
        assert!(s.calendar.is_none());
        assert_eq!(s.status, DueStatus::DueSoon);

        let s = classify(&c, None, date(2027, 1, 1), DueThresholds::default());
        assert!(s.hours.is_none());
        assert_eq!(s.status, DueStatus::Ok);
        assert_eq!(s.message, "No due point recorded");
    }

    #[test]
    fn classification_is_idempotent() {
        let mut c = component(IntervalType::Both);
        c.extension_limit_percent = Some(20.0);
        let first = classify(&c, Some(505.0), date(2026, 10, 18), DueThresholds::default());
        for _ in 0..5 {
            assert_eq!(classify(&c, Some(505.0), date(2026, 10, 18), DueThresholds::default()), first);
        }
        assert_eq!(first.status, DueStatus::WithinExtension);
    }

    #[test]
    fn severity_order() {
        assert!(DueStatus::Overdue > DueStatus::WithinExtension);
        assert!(DueStatus::WithinExtension > DueStatus::DueSoon);
        assert!(DueStatus::DueSoon > DueStatus::Ok);
        assert_eq!(serde_json::to_value(DueStatus::WithinExtension).unwrap(), "within_extension");
    }
}
