//! Tests for the conflict checker.

use chrono::{NaiveDate, NaiveTime, Utc};
use flightdeck_core::Lifecycle;
use uuid::Uuid;

use super::*;
use crate::shift_override::OverrideShape;

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn window(s: (u32, u32), e: (u32, u32)) -> TimeWindow {
    TimeWindow::new(t(s.0, s.1), t(e.0, e.1)).unwrap()
}

/// 2026-10-19 is a Monday.
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn rule(instructor_id: Uuid, day_of_week: u8, w: TimeWindow) -> RosterRule {
    RosterRule {
        id: Uuid::new_v4(),
        instructor_id,
        day_of_week,
        window: w,
        is_active: true,
        effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        effective_until: None,
        notes: None,
        lifecycle: Lifecycle::Active,
    }
}

fn override_on(instructor_id: Uuid, date: NaiveDate, shape: OverrideShape) -> ShiftOverride {
    ShiftOverride {
        id: Uuid::new_v4(),
        instructor_id,
        date,
        shape,
        notes: None,
        lifecycle: Lifecycle::Active,
    }
}

fn date_query(instructor_id: Uuid, date: NaiveDate, w: TimeWindow) -> ConflictQuery {
    ConflictQuery {
        instructor_id,
        target: ConflictTarget::Date(date),
        window: w,
        exclude_rule_id: None,
        exclude_override_id: None,
    }
}

fn weekly_query(instructor_id: Uuid, day_of_week: u8, w: TimeWindow) -> ConflictQuery {
    ConflictQuery {
        instructor_id,
        target: ConflictTarget::Weekly {
            day_of_week,
            effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            effective_until: None,
        },
        window: w,
        exclude_rule_id: None,
        exclude_override_id: None,
    }
}

// -- roster rules -------------------------------------------------------

#[test]
fn monday_morning_rule_blocks_overlapping_rule() {
    let instructor = Uuid::new_v4();
    let existing = rule(instructor, 1, window((9, 0), (12, 0)));

    let overlapping = weekly_query(instructor, 1, window((11, 0), (13, 0)));
    let conflicts = find_conflicts(&overlapping, &[existing.clone()], &[]);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].id, existing.id);
    assert_eq!(conflicts[0].kind, ShiftKind::Regular);

    let touching = weekly_query(instructor, 1, window((12, 0), (13, 0)));
    assert!(find_conflicts(&touching, &[existing], &[]).is_empty());
}

#[test]
fn other_weekdays_and_instructors_never_conflict() {
    let instructor = Uuid::new_v4();
    let existing = rule(instructor, 1, window((9, 0), (12, 0)));

    assert!(find_conflicts(&weekly_query(instructor, 2, window((9, 0), (12, 0))), &[existing.clone()], &[]).is_empty());
    assert!(find_conflicts(&weekly_query(Uuid::new_v4(), 1, window((9, 0), (12, 0))), &[existing], &[]).is_empty());
}

#[test]
fn editing_a_rule_does_not_conflict_with_itself() {
    let instructor = Uuid::new_v4();
    let existing = rule(instructor, 1, window((9, 0), (12, 0)));
    let mut query = weekly_query(instructor, 1, window((9, 0), (13, 0)));
    query.exclude_rule_id = Some(existing.id);
    assert!(find_conflicts(&query, &[existing], &[]).is_empty());
}

#[test]
fn voided_and_inactive_rules_are_ignored() {
    let instructor = Uuid::new_v4();
    let mut voided = rule(instructor, 1, window((9, 0), (12, 0)));
    voided.lifecycle = Lifecycle::Voided { at: Utc::now() };
    let mut inactive = rule(instructor, 1, window((9, 0), (12, 0)));
    inactive.is_active = false;

    let query = date_query(instructor, monday(), window((10, 0), (11, 0)));
    assert!(find_conflicts(&query, &[voided, inactive], &[]).is_empty());
}

#[test]
fn date_check_respects_effective_range() {
    let instructor = Uuid::new_v4();
    let mut expired = rule(instructor, 1, window((9, 0), (12, 0)));
    expired.effective_until = Some(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    let mut future = rule(instructor, 1, window((9, 0), (12, 0)));
    future.effective_from = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
    let mut ends_today = rule(instructor, 1, window((9, 0), (12, 0)));
    ends_today.effective_until = Some(monday());

    let query = date_query(instructor, monday(), window((10, 0), (11, 0)));
    let conflicts = find_conflicts(&query, &[expired, future, ends_today.clone()], &[]);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].id, ends_today.id);
}

#[test]
fn weekly_check_ignores_non_intersecting_effective_ranges() {
    let instructor = Uuid::new_v4();
    let mut old = rule(instructor, 1, window((9, 0), (12, 0)));
    old.effective_until = Some(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    let query = weekly_query(instructor, 1, window((9, 0), (12, 0)));
    assert!(find_conflicts(&query, &[old], &[]).is_empty());
}

#[test]
fn weekly_check_needs_a_shared_weekday_inside_the_overlap() {
    let instructor = Uuid::new_v4();
    // Tue 2026-10-20 ..= Sun 2026-10-25 contains no Monday.
    let mut old = rule(instructor, 1, window((9, 0), (12, 0)));
    old.effective_from = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
    old.effective_until = Some(NaiveDate::from_ymd_opt(2026, 10, 25).unwrap());
    let mut query = weekly_query(instructor, 1, window((9, 0), (12, 0)));
    query.target = ConflictTarget::Weekly {
        day_of_week: 1,
        effective_from: monday(),
        effective_until: Some(NaiveDate::from_ymd_opt(2026, 11, 30).unwrap()),
    };
    assert!(find_conflicts(&query, &[old.clone()], &[]).is_empty());

    // Stretching it to Mon 2026-10-26 gives both rules a common date.
    old.effective_until = Some(NaiveDate::from_ymd_opt(2026, 10, 26).unwrap());
    assert_eq!(find_conflicts(&query, &[old], &[]).len(), 1);
}

// -- overrides ----------------------------------------------------------

#[test]
fn cancel_override_never_conflicts_with_a_new_add() {
    let instructor = Uuid::new_v4();
    let cancel = override_on(instructor, monday(), OverrideShape::Cancel);
    let query = date_query(instructor, monday(), window((0, 0), (23, 59)));
    assert!(find_conflicts(&query, &[], &[cancel]).is_empty());
}

#[test]
fn add_override_on_same_date_conflicts() {
    let instructor = Uuid::new_v4();
    let add = override_on(
        instructor,
        monday(),
        OverrideShape::Add { window: window((14, 0), (16, 0)) },
    );
    let other_day = override_on(
        instructor,
        monday().succ_opt().unwrap(),
        OverrideShape::Add { window: window((14, 0), (16, 0)) },
    );

    let query = date_query(instructor, monday(), window((15, 0), (17, 0)));
    let conflicts = find_conflicts(&query, &[], &[add.clone(), other_day]);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].id, add.id);
    assert_eq!(conflicts[0].kind, ShiftKind::Add);

    let mut editing = query;
    editing.exclude_override_id = Some(add.id);
    assert!(find_conflicts(&editing, &[], &[add]).is_empty());
}

#[test]
fn replace_override_reports_its_kind_and_times() {
    let instructor = Uuid::new_v4();
    let base = rule(instructor, 1, window((9, 0), (12, 0)));
    let replace = override_on(
        instructor,
        monday(),
        OverrideShape::Replace {
            window: window((13, 0), (15, 0)),
            replaces_rule_id: base.id,
        },
    );
    let query = date_query(instructor, monday(), window((14, 0), (16, 0)));
    let conflicts = find_conflicts(&query, &[base], &[replace]);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].kind, ShiftKind::Replace);
    assert_eq!(conflicts[0].start_time, t(13, 0));
    assert_eq!(conflicts[0].end_time, t(15, 0));
}

#[test]
fn weekly_rule_conflicts_with_add_on_matching_weekday() {
    let instructor = Uuid::new_v4();
    let add = override_on(
        instructor,
        monday(),
        OverrideShape::Add { window: window((9, 0), (10, 0)) },
    );
    let query = weekly_query(instructor, 1, window((9, 30), (11, 0)));
    assert_eq!(find_conflicts(&query, &[], &[add.clone()]).len(), 1);

    let tuesday_rule = weekly_query(instructor, 2, window((9, 30), (11, 0)));
    assert!(find_conflicts(&tuesday_rule, &[], &[add]).is_empty());
}

#[test]
fn editing_a_rule_skips_its_own_replacements() {
    let instructor = Uuid::new_v4();
    let base = rule(instructor, 1, window((9, 0), (12, 0)));
    let replace = override_on(
        instructor,
        monday(),
        OverrideShape::Replace {
            window: window((10, 0), (11, 0)),
            replaces_rule_id: base.id,
        },
    );
    let mut query = weekly_query(instructor, 1, window((9, 0), (12, 0)));
    query.exclude_rule_id = Some(base.id);
    assert!(find_conflicts(&query, &[base], &[replace]).is_empty());
}

#[test]
fn conflicts_are_ordered_by_start_time() {
    let instructor = Uuid::new_v4();
    let late = rule(instructor, 1, window((11, 0), (12, 0)));
    let early = override_on(
        instructor,
        monday(),
        OverrideShape::Add { window: window((8, 0), (9, 30)) },
    );
    let query = date_query(instructor, monday(), window((9, 0), (11, 30)));
    let conflicts = find_conflicts(&query, &[late], &[early]);
    let starts: Vec<NaiveTime> = conflicts.iter().map(|c| c.start_time).collect();
    assert_eq!(starts, vec![t(8, 0), t(11, 0)]);
}

#[test]
fn report_shape_matches_wire_contract() {
    let empty = serde_json::to_value(ConflictReport::from_conflicts(vec![])).unwrap();
    assert_eq!(empty, serde_json::json!({ "has_conflict": false }));

    let id = Uuid::new_v4();
    let report = ConflictReport::from_conflicts(vec![ConflictingShift {
        id,
        start_time: t(9, 0),
        end_time: t(12, 0),
        kind: ShiftKind::Regular,
        notes: Some("mornings".into()),
    }]);
    let json = serde_json::to_value(report).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "has_conflict": true,
            "conflicting_shifts": [{
                "id": id,
                "start_time": "09:00",
                "end_time": "12:00",
                "type": "regular",
                "notes": "mornings",
            }],
        })
    );
}

#[test]
fn check_fields_validate_into_a_date_query() {
    let fields = ConflictCheckFields {
        instructor_id: Some("7f1c1a2e-1111-4a5b-9c3d-000000000001".into()),
        date: Some("2026-10-19".into()),
        start_time: Some("11:00".into()),
        end_time: Some("13:00".into()),
        ..Default::default()
    };
    let query = fields.validate().unwrap();
    assert_eq!(query.target, ConflictTarget::Date(monday()));
    assert_eq!(query.window, window((11, 0), (13, 0)));

    let bad = ConflictCheckFields {
        start_time: Some("13:00".into()),
        end_time: Some("11:00".into()),
        exclude_rule_id: Some("rule-1".into()),
        ..fields
    };
    let errors = bad.validate().unwrap_err();
    assert!(errors.has_field("end_time"));
    assert!(errors.has_field("exclude_rule_id"));
}
