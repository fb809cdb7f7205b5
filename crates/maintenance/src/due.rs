//! Due-point recomputation when a maintenance visit is completed.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::component::MaintenanceComponent;
use crate::error::{MaintenanceError, Result};

/// Readings recorded by a completed visit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    pub hours: Option<f64>,
    pub date: NaiveDate,
}

/// New baseline and due point for a component. Applying it also clears any
/// extension grant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DueUpdate {
    pub last_completed_hours: Option<f64>,
    pub last_completed_date: NaiveDate,
    pub current_due_hours: Option<f64>,
    pub current_due_date: Option<NaiveDate>,
}

/// Compute the component state after `completion`.
///
/// Hours advance from the previously scheduled due point, not from the hours
/// read at the visit, so the cadence is kept whether service ran early or
/// late. A component with no prior due point uses the visit hours instead.
/// Calendar due dates always restart from the visit date.
pub fn recompute_on_completion(component: &MaintenanceComponent, completion: Completion) -> Result<DueUpdate> {
    let interval_type = component.interval_type;

    let current_due_hours = if interval_type.tracks_hours() {
        let interval = component.positive_interval_hours()?;
        let baseline = component
            .current_due_hours
            .or(completion.hours)
            .ok_or(MaintenanceError::MissingVisitHours(component.id))?;
        Some(baseline + interval)
    } else {
        component.current_due_hours
    };

    let current_due_date = if interval_type.tracks_calendar() {
        let days = component.positive_interval_days()?;
        let due = u64::try_from(days)
            .ok()
            .and_then(|d| completion.date.checked_add_days(Days::new(d)))
            .ok_or(MaintenanceError::DateOutOfRange(component.id))?;
        Some(due)
    } else {
        component.current_due_date
    };

    Ok(DueUpdate {
        last_completed_hours: completion.hours.or(component.last_completed_hours),
        last_completed_date: completion.date,
        current_due_hours,
        current_due_date,
    })
}

impl MaintenanceComponent {
    pub fn apply(&mut self, update: &DueUpdate) {
        self.last_completed_hours = update.last_completed_hours;
        self.last_completed_date = Some(update.last_completed_date);
        self.current_due_hours = update.current_due_hours;
        self.current_due_date = update.current_due_date;
        self.extension_limit_percent = None;
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::component::IntervalType;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hundred_hour_inspection() -> MaintenanceComponent {
        MaintenanceComponent {
            id: Uuid::new_v4(),
            aircraft_id: Uuid::new_v4(),
            name: "100-hour inspection".into(),
            interval_type: IntervalType::Hours,
            interval_hours: Some(100.0),
            interval_days: None,
            last_completed_hours: Some(400.0),
            last_completed_date: Some(date(2026, 5, 1)),
            current_due_hours: Some(500.0),
            current_due_date: None,
            extension_limit_percent: Some(20.0),
        }
    }

    #[test]
    fn hours_advance_from_scheduled_due_point() {
        let component = hundred_hour_inspection();
        for visit_hours in [487.5, 500.0, 512.3] {
            let update = recompute_on_completion(
                &component,
                Completion { hours: Some(visit_hours), date: date(2026, 10, 18) },
            )
            .unwrap();
            assert_eq!(update.current_due_hours, Some(600.0));
            assert_eq!(update.last_completed_hours, Some(visit_hours));
            assert_eq!(update.last_completed_date, date(2026, 10, 18));
        }
    }

    #[test]
    fn first_completion_uses_visit_hours_as_baseline() {
        let mut component = hundred_hour_inspection();
        component.current_due_hours = None;
        let update = recompute_on_completion(
            &component,
            Completion { hours: Some(230.0), date: date(2026, 10, 18) },
        )
        .unwrap();
        assert_eq!(update.current_due_hours, Some(330.0));

        let err = recompute_on_completion(&component, Completion { hours: None, date: date(2026, 10, 18) });
        assert_eq!(err, Err(MaintenanceError::MissingVisitHours(component.id)));
    }

    #[test]
    fn calendar_due_date_restarts_from_visit() {
        let mut component = hundred_hour_inspection();
        component.interval_type = IntervalType::Calendar;
        component.interval_days = Some(365);
        component.current_due_date = Some(date(2026, 12, 1));

        let update = recompute_on_completion(
            &component,
            Completion { hours: None, date: date(2026, 10, 18) },
        )
        .unwrap();
        assert_eq!(update.current_due_date, Some(date(2027, 10, 18)));
        // Hours due point untouched for calendar-only components.
        assert_eq!(update.current_due_hours, Some(500.0));
        assert_eq!(update.last_completed_hours, Some(400.0));
    }

    #[test]
    fn both_dimensions_recomputed() {
        let mut component = hundred_hour_inspection();
        component.interval_type = IntervalType::Both;
        component.interval_days = Some(30);
        let update = recompute_on_completion(
            &component,
            Completion { hours: Some(498.0), date: date(2026, 10, 18) },
        )
        .unwrap();
        assert_eq!(update.current_due_hours, Some(600.0));
        assert_eq!(update.current_due_date, Some(date(2026, 11, 17)));
    }

    #[test]
    fn missing_interval_is_an_error() {
        let mut component = hundred_hour_inspection();
        component.interval_hours = None;
        assert_eq!(
            recompute_on_completion(&component, Completion { hours: Some(500.0), date: date(2026, 10, 18) }),
            Err(MaintenanceError::MissingIntervalHours(component.id))
        );

        component.interval_type = IntervalType::Calendar;
        component.interval_days = Some(0);
        assert_eq!(
            recompute_on_completion(&component, Completion { hours: None, date: date(2026, 10, 18) }),
            Err(MaintenanceError::MissingIntervalDays(component.id))
        );
    }

    #[test]
    fn applying_an_update_clears_the_extension() {
        let mut component = hundred_hour_inspection();
        let update = recompute_on_completion(
            &component,
            Completion { hours: Some(505.0), date: date(2026, 10, 18) },
        )
        .unwrap();
        component.apply(&update);
        assert_eq!(component.extension_limit_percent, None);
        assert_eq!(component.current_due_hours, Some(600.0));
        assert_eq!(component.last_completed_date, Some(date(2026, 10, 18)));
    }
}
