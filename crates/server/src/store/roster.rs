//! Roster rules and shift overrides.
//!
//! Writes take a transaction-scoped advisory lock on the instructor before
//! checking for conflicts, so two concurrent writes for the same instructor
//! cannot both pass the check.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use flightdeck_core::{Lifecycle, ValidationErrors};
use flightdeck_roster::{
    find_conflicts, shifts_on, ConflictQuery, ConflictTarget, ConflictingShift, EffectiveShift, OverrideDraft,
    OverrideFields, OverrideKind, OverridePatch, OverrideShape, RosterRule, RuleDraft, RuleFields, RulePatch,
    ShiftOverride, TimeWindow,
};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

use super::{instructor_lock_key, push_active, StoreError, StoreResult};

const RULE_COLUMNS: &str = "id, instructor_id, day_of_week, start_time, end_time, is_active, \
     effective_from, effective_until, notes, voided_at";

const OVERRIDE_COLUMNS: &str = "id, instructor_id, override_date, override_type, start_time, end_time, \
     replaces_rule_id, notes, voided_at";

// ── Rows ─────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct RuleRow {
    id: Uuid,
    instructor_id: Uuid,
    day_of_week: i16,
    start_time: NaiveTime,
    end_time: NaiveTime,
    is_active: bool,
    effective_from: NaiveDate,
    effective_until: Option<NaiveDate>,
    notes: Option<String>,
    voided_at: Option<DateTime<Utc>>,
}

impl TryFrom<RuleRow> for RosterRule {
    type Error = StoreError;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt {
            entity: "roster rule",
            id: row.id,
            reason,
        };
        let window = TimeWindow::new(row.start_time, row.end_time).map_err(|e| corrupt(e.to_string()))?;
        let day_of_week = u8::try_from(row.day_of_week)
            .ok()
            .filter(|d| *d <= 6)
            .ok_or_else(|| corrupt(format!("day_of_week {}", row.day_of_week)))?;
        Ok(RosterRule {
            id: row.id,
            instructor_id: row.instructor_id,
            day_of_week,
            window,
            is_active: row.is_active,
            effective_from: row.effective_from,
            effective_until: row.effective_until,
            notes: row.notes,
            lifecycle: Lifecycle::from_voided_at(row.voided_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OverrideRow {
    id: Uuid,
    instructor_id: Uuid,
    override_date: NaiveDate,
    override_type: String,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    replaces_rule_id: Option<Uuid>,
    notes: Option<String>,
    voided_at: Option<DateTime<Utc>>,
}

impl TryFrom<OverrideRow> for ShiftOverride {
    type Error = StoreError;

    fn try_from(row: OverrideRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt {
            entity: "shift override",
            id: row.id,
            reason,
        };
        let kind: OverrideKind = row.override_type.parse().map_err(corrupt)?;
        let shape = OverrideShape::from_parts(kind, row.start_time, row.end_time, row.replaces_rule_id)
            .map_err(|e| corrupt(e.to_string()))?;
        Ok(ShiftOverride {
            id: row.id,
            instructor_id: row.instructor_id,
            date: row.override_date,
            shape,
            notes: row.notes,
            lifecycle: Lifecycle::from_voided_at(row.voided_at),
        })
    }
}

// ── Filters ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    pub instructor_id: Option<Uuid>,
    pub day_of_week: Option<u8>,
    pub is_active: Option<bool>,
    /// Only rules whose effective range contains this date.
    pub effective_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct OverrideFilter {
    pub instructor_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub kind: Option<OverrideKind>,
}

// ── Shared queries ───────────────────────────────────────────────

async fn lock_instructor(conn: &mut PgConnection, instructor_id: Uuid) -> StoreResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(instructor_lock_key(instructor_id))
        .execute(conn)
        .await?;
    Ok(())
}

async fn fetch_rule(conn: &mut PgConnection, id: Uuid, for_update: bool) -> StoreResult<Option<RosterRule>> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {RULE_COLUMNS} FROM roster_rules"));
    push_active(&mut qb);
    qb.push(" AND id = ").push_bind(id);
    if for_update {
        qb.push(" FOR UPDATE");
    }
    let row: Option<RuleRow> = qb.build_query_as().fetch_optional(conn).await?;
    row.map(RosterRule::try_from).transpose()
}

async fn fetch_override(conn: &mut PgConnection, id: Uuid, for_update: bool) -> StoreResult<Option<ShiftOverride>> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {OVERRIDE_COLUMNS} FROM shift_overrides"));
    push_active(&mut qb);
    qb.push(" AND id = ").push_bind(id);
    if for_update {
        qb.push(" FOR UPDATE");
    }
    let row: Option<OverrideRow> = qb.build_query_as().fetch_optional(conn).await?;
    row.map(ShiftOverride::try_from).transpose()
}

/// Every live rule of the instructor, plus overrides on `date` (or all of
/// them when no date is given). The pure checker narrows further.
async fn load_candidates(
    conn: &mut PgConnection,
    instructor_id: Uuid,
    date: Option<NaiveDate>,
) -> StoreResult<(Vec<RosterRule>, Vec<ShiftOverride>)> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {RULE_COLUMNS} FROM roster_rules"));
    push_active(&mut qb);
    qb.push(" AND instructor_id = ").push_bind(instructor_id);
    let rule_rows: Vec<RuleRow> = qb.build_query_as().fetch_all(&mut *conn).await?;

    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {OVERRIDE_COLUMNS} FROM shift_overrides"));
    push_active(&mut qb);
    qb.push(" AND instructor_id = ").push_bind(instructor_id);
    if let Some(date) = date {
        qb.push(" AND override_date = ").push_bind(date);
    }
    let override_rows: Vec<OverrideRow> = qb.build_query_as().fetch_all(&mut *conn).await?;

    let rules = rule_rows
        .into_iter()
        .map(RosterRule::try_from)
        .collect::<StoreResult<Vec<_>>>()?;
    let overrides = override_rows
        .into_iter()
        .map(ShiftOverride::try_from)
        .collect::<StoreResult<Vec<_>>>()?;
    Ok((rules, overrides))
}

async fn ensure_no_conflicts(conn: &mut PgConnection, query: &ConflictQuery) -> StoreResult<()> {
    let date = match query.target {
        ConflictTarget::Date(date) => Some(date),
        ConflictTarget::Weekly { .. } => None,
    };
    let (rules, overrides) = load_candidates(conn, query.instructor_id, date).await?;
    let conflicts = find_conflicts(query, &rules, &overrides);
    if conflicts.is_empty() {
        Ok(())
    } else {
        debug!(
            instructor_id = %query.instructor_id,
            conflicts = conflicts.len(),
            "write rejected by schedule conflict"
        );
        Err(StoreError::Conflict(conflicts))
    }
}

/// A replacement must name a live rule of the same instructor that is
/// worked on the override's date.
async fn check_replaced_rule(conn: &mut PgConnection, draft: &OverrideDraft) -> StoreResult<()> {
    let Some(rule_id) = draft.shape.replaces_rule_id() else {
        return Ok(());
    };
    let rule = fetch_rule(conn, rule_id, false).await?.ok_or(StoreError::NotFound {
        entity: "roster rule",
        id: rule_id,
    })?;
    if rule.instructor_id != draft.instructor_id {
        return Err(ValidationErrors::single("replaces_rule_id", "rule belongs to a different instructor").into());
    }
    if !rule.applies_on(draft.date) {
        return Err(ValidationErrors::single(
            "replaces_rule_id",
            format!("rule is not worked on {}", draft.date),
        )
        .into());
    }
    Ok(())
}

// ── Store ────────────────────────────────────────────────────────

pub struct RosterStore;

impl RosterStore {
    pub async fn check_conflicts(pool: &PgPool, query: &ConflictQuery) -> StoreResult<Vec<ConflictingShift>> {
        let mut conn = pool.acquire().await?;
        match ensure_no_conflicts(&mut conn, query).await {
            Ok(()) => Ok(Vec::new()),
            Err(StoreError::Conflict(conflicts)) => Ok(conflicts),
            Err(e) => Err(e),
        }
    }

    pub async fn shifts_on(pool: &PgPool, instructor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<EffectiveShift>> {
        let mut conn = pool.acquire().await?;
        let (rules, overrides) = load_candidates(&mut conn, instructor_id, Some(date)).await?;
        Ok(shifts_on(instructor_id, date, &rules, &overrides))
    }

    // ── Rules ────────────────────────────────────────────────────

    pub async fn list_rules(pool: &PgPool, filter: &RuleFilter) -> StoreResult<Vec<RosterRule>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {RULE_COLUMNS} FROM roster_rules"));
        push_active(&mut qb);
        if let Some(id) = filter.instructor_id {
            qb.push(" AND instructor_id = ").push_bind(id);
        }
        if let Some(day) = filter.day_of_week {
            qb.push(" AND day_of_week = ").push_bind(i16::from(day));
        }
        if let Some(active) = filter.is_active {
            qb.push(" AND is_active = ").push_bind(active);
        }
        if let Some(date) = filter.effective_on {
            qb.push(" AND effective_from <= ")
                .push_bind(date)
                .push(" AND (effective_until IS NULL OR effective_until >= ")
                .push_bind(date)
                .push(")");
        }
        qb.push(" ORDER BY instructor_id, day_of_week, start_time");

        let rows: Vec<RuleRow> = qb.build_query_as().fetch_all(pool).await?;
        rows.into_iter().map(RosterRule::try_from).collect()
    }

    pub async fn get_rule(pool: &PgPool, id: Uuid) -> StoreResult<RosterRule> {
        let mut conn = pool.acquire().await?;
        fetch_rule(&mut conn, id, false).await?.ok_or(StoreError::NotFound {
            entity: "roster rule",
            id,
        })
    }

    pub async fn create_rule(pool: &PgPool, draft: &RuleDraft) -> StoreResult<RosterRule> {
        let mut tx = pool.begin().await?;
        lock_instructor(&mut tx, draft.instructor_id).await?;
        ensure_no_conflicts(&mut tx, &draft.conflict_query(None)).await?;

        let row: RuleRow = sqlx::query_as(&format!(
            "INSERT INTO roster_rules
                (instructor_id, day_of_week, start_time, end_time, is_active, effective_from, effective_until, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {RULE_COLUMNS}"
        ))
        .bind(draft.instructor_id)
        .bind(i16::from(draft.day_of_week))
        .bind(draft.window.start())
        .bind(draft.window.end())
        .bind(draft.is_active)
        .bind(draft.effective_from)
        .bind(draft.effective_until)
        .bind(&draft.notes)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(rule_id = %row.id, instructor_id = %row.instructor_id, "roster rule created");
        RosterRule::try_from(row)
    }

    /// Merge `patch` over the stored rule, re-validate, re-check, and save.
    pub async fn update_rule(pool: &PgPool, id: Uuid, patch: RulePatch, today: NaiveDate) -> StoreResult<RosterRule> {
        let mut tx = pool.begin().await?;
        let stored = fetch_rule(&mut tx, id, true).await?.ok_or(StoreError::NotFound {
            entity: "roster rule",
            id,
        })?;
        let draft = RuleFields::from_rule(&stored).apply(patch).validate(today)?;

        lock_instructor(&mut tx, draft.instructor_id).await?;
        ensure_no_conflicts(&mut tx, &draft.conflict_query(Some(id))).await?;

        let row: RuleRow = sqlx::query_as(&format!(
            "UPDATE roster_rules
             SET day_of_week = $2, start_time = $3, end_time = $4, is_active = $5,
                 effective_from = $6, effective_until = $7, notes = $8, updated_at = now()
             WHERE id = $1
             RETURNING {RULE_COLUMNS}"
        ))
        .bind(id)
        .bind(i16::from(draft.day_of_week))
        .bind(draft.window.start())
        .bind(draft.window.end())
        .bind(draft.is_active)
        .bind(draft.effective_from)
        .bind(draft.effective_until)
        .bind(&draft.notes)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(rule_id = %id, "roster rule updated");
        RosterRule::try_from(row)
    }

    pub async fn void_rule(pool: &PgPool, id: Uuid) -> StoreResult<()> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE roster_rules SET voided_at = now(), updated_at = now()");
        push_active(&mut qb);
        qb.push(" AND id = ").push_bind(id);
        let result = qb.build().execute(pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "roster rule",
                id,
            });
        }
        info!(rule_id = %id, "roster rule voided");
        Ok(())
    }

    // ── Overrides ────────────────────────────────────────────────

    pub async fn list_overrides(pool: &PgPool, filter: &OverrideFilter) -> StoreResult<Vec<ShiftOverride>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {OVERRIDE_COLUMNS} FROM shift_overrides"));
        push_active(&mut qb);
        if let Some(id) = filter.instructor_id {
            qb.push(" AND instructor_id = ").push_bind(id);
        }
        if let Some(date) = filter.date {
            qb.push(" AND override_date = ").push_bind(date);
        }
        if let Some(from) = filter.from {
            qb.push(" AND override_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND override_date <= ").push_bind(to);
        }
        if let Some(kind) = filter.kind {
            qb.push(" AND override_type = ").push_bind(kind.as_str());
        }
        qb.push(" ORDER BY override_date, start_time NULLS FIRST");

        let rows: Vec<OverrideRow> = qb.build_query_as().fetch_all(pool).await?;
        rows.into_iter().map(ShiftOverride::try_from).collect()
    }

    pub async fn get_override(pool: &PgPool, id: Uuid) -> StoreResult<ShiftOverride> {
        let mut conn = pool.acquire().await?;
        fetch_override(&mut conn, id, false).await?.ok_or(StoreError::NotFound {
            entity: "shift override",
            id,
        })
    }

    pub async fn create_override(pool: &PgPool, draft: &OverrideDraft) -> StoreResult<ShiftOverride> {
        let mut tx = pool.begin().await?;
        lock_instructor(&mut tx, draft.instructor_id).await?;
        check_replaced_rule(&mut tx, draft).await?;
        if let Some(query) = draft.conflict_query(None) {
            ensure_no_conflicts(&mut tx, &query).await?;
        }

        let window = draft.shape.window();
        let row: OverrideRow = sqlx::query_as(&format!(
            "INSERT INTO shift_overrides
                (instructor_id, override_date, override_type, start_time, end_time, replaces_rule_id, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {OVERRIDE_COLUMNS}"
        ))
        .bind(draft.instructor_id)
        .bind(draft.date)
        .bind(draft.shape.kind().as_str())
        .bind(window.map(|w| w.start()))
        .bind(window.map(|w| w.end()))
        .bind(draft.shape.replaces_rule_id())
        .bind(&draft.notes)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            override_id = %row.id,
            instructor_id = %row.instructor_id,
            kind = %row.override_type,
            date = %row.override_date,
            "shift override created"
        );
        ShiftOverride::try_from(row)
    }

    pub async fn update_override(pool: &PgPool, id: Uuid, patch: OverridePatch) -> StoreResult<ShiftOverride> {
        let mut tx = pool.begin().await?;
        let stored = fetch_override(&mut tx, id, true).await?.ok_or(StoreError::NotFound {
            entity: "shift override",
            id,
        })?;
        let draft = OverrideFields::from_override(&stored).apply(patch).validate()?;

        lock_instructor(&mut tx, draft.instructor_id).await?;
        check_replaced_rule(&mut tx, &draft).await?;
        if let Some(query) = draft.conflict_query(Some(id)) {
            ensure_no_conflicts(&mut tx, &query).await?;
        }

        let window = draft.shape.window();
        let row: OverrideRow = sqlx::query_as(&format!(
            "UPDATE shift_overrides
             SET override_date = $2, override_type = $3, start_time = $4, end_time = $5,
                 replaces_rule_id = $6, notes = $7, updated_at = now()
             WHERE id = $1
             RETURNING {OVERRIDE_COLUMNS}"
        ))
        .bind(id)
        .bind(draft.date)
        .bind(draft.shape.kind().as_str())
        .bind(window.map(|w| w.start()))
        .bind(window.map(|w| w.end()))
        .bind(draft.shape.replaces_rule_id())
        .bind(&draft.notes)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(override_id = %id, "shift override updated");
        ShiftOverride::try_from(row)
    }

    pub async fn void_override(pool: &PgPool, id: Uuid) -> StoreResult<()> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE shift_overrides SET voided_at = now(), updated_at = now()");
        push_active(&mut qb);
        qb.push(" AND id = ").push_bind(id);
        let result = qb.build().execute(pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "shift override",
                id,
            });
        }
        info!(override_id = %id, "shift override voided");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_row() -> RuleRow {
        RuleRow {
            id: Uuid::new_v4(),
            instructor_id: Uuid::new_v4(),
            day_of_week: 1,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            is_active: true,
            effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            effective_until: None,
            notes: None,
            voided_at: None,
        }
    }

    #[test]
    fn rule_row_maps_voided_at_to_lifecycle() {
        let mut row = rule_row();
        let at = Utc::now();
        row.voided_at = Some(at);
        let rule = RosterRule::try_from(row).unwrap();
        assert_eq!(rule.lifecycle, Lifecycle::Voided { at });
        assert!(!rule.is_live());
    }

    #[test]
    fn inverted_rule_row_is_corrupt() {
        let mut row = rule_row();
        row.end_time = row.start_time;
        assert!(matches!(RosterRule::try_from(row), Err(StoreError::Corrupt { .. })));

        let mut row = rule_row();
        row.day_of_week = 7;
        assert!(matches!(RosterRule::try_from(row), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn override_row_rebuilds_shape() {
        let row = OverrideRow {
            id: Uuid::new_v4(),
            instructor_id: Uuid::new_v4(),
            override_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            override_type: "cancel".into(),
            start_time: None,
            end_time: None,
            replaces_rule_id: None,
            notes: Some("sick".into()),
            voided_at: None,
        };
        let ov = ShiftOverride::try_from(row).unwrap();
        assert_eq!(ov.shape, OverrideShape::Cancel);
        assert!(ov.is_live());
    }

    #[test]
    fn override_row_with_unknown_type_is_corrupt() {
        let row = OverrideRow {
            id: Uuid::new_v4(),
            instructor_id: Uuid::new_v4(),
            override_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            override_type: "swap".into(),
            start_time: None,
            end_time: None,
            replaces_rule_id: None,
            notes: None,
            voided_at: None,
        };
        assert!(matches!(ShiftOverride::try_from(row), Err(StoreError::Corrupt { .. })));
    }
}
