//! Maintenance components and visits.
//!
//! Completing a visit recomputes the component's due point inside the same
//! transaction, with the component row locked.

use chrono::NaiveDate;
use flightdeck_maintenance::{
    plan_update, recompute_on_completion, DueUpdate, IntervalType, MaintenanceComponent, MaintenanceVisit, VisitChange,
    VisitDraft, VisitFields, VisitPatch, VisitStatus,
};
use serde::Serialize;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use super::{StoreError, StoreResult};

const COMPONENT_COLUMNS: &str = "id, aircraft_id, name, interval_type, interval_hours, interval_days, \
     last_completed_hours, last_completed_date, current_due_hours, current_due_date, extension_limit_percent";

const VISIT_COLUMNS: &str = "id, component_id, visit_date, hours_at_visit, status, notes";

#[derive(Debug, sqlx::FromRow)]
struct ComponentRow {
    id: Uuid,
    aircraft_id: Uuid,
    name: String,
    interval_type: String,
    interval_hours: Option<f64>,
    interval_days: Option<i32>,
    last_completed_hours: Option<f64>,
    last_completed_date: Option<NaiveDate>,
    current_due_hours: Option<f64>,
    current_due_date: Option<NaiveDate>,
    extension_limit_percent: Option<f64>,
}

impl TryFrom<ComponentRow> for MaintenanceComponent {
    type Error = StoreError;

    fn try_from(row: ComponentRow) -> Result<Self, Self::Error> {
        let interval_type: IntervalType = row.interval_type.parse().map_err(|reason| StoreError::Corrupt {
            entity: "maintenance component",
            id: row.id,
            reason,
        })?;
        Ok(MaintenanceComponent {
            id: row.id,
            aircraft_id: row.aircraft_id,
            name: row.name,
            interval_type,
            interval_hours: row.interval_hours,
            interval_days: row.interval_days.map(i64::from),
            last_completed_hours: row.last_completed_hours,
            last_completed_date: row.last_completed_date,
            current_due_hours: row.current_due_hours,
            current_due_date: row.current_due_date,
            extension_limit_percent: row.extension_limit_percent,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VisitRow {
    id: Uuid,
    component_id: Uuid,
    visit_date: NaiveDate,
    hours_at_visit: Option<f64>,
    status: String,
    notes: Option<String>,
}

impl TryFrom<VisitRow> for MaintenanceVisit {
    type Error = StoreError;

    fn try_from(row: VisitRow) -> Result<Self, Self::Error> {
        let status: VisitStatus = row.status.parse().map_err(|reason| StoreError::Corrupt {
            entity: "maintenance visit",
            id: row.id,
            reason,
        })?;
        Ok(MaintenanceVisit {
            id: row.id,
            component_id: row.component_id,
            visit_date: row.visit_date,
            hours_at_visit: row.hours_at_visit,
            status,
            notes: row.notes,
        })
    }
}

/// A saved visit, plus the component when the save completed it.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct VisitOutcome {
    pub visit: MaintenanceVisit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<MaintenanceComponent>,
}

async fn lock_component(conn: &mut PgConnection, id: Uuid) -> StoreResult<MaintenanceComponent> {
    let row: Option<ComponentRow> = sqlx::query_as(&format!(
        "SELECT {COMPONENT_COLUMNS} FROM maintenance_components WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    row.ok_or(StoreError::NotFound {
        entity: "maintenance component",
        id,
    })?
    .try_into()
}

async fn save_due_point(conn: &mut PgConnection, id: Uuid, update: &DueUpdate) -> StoreResult<MaintenanceComponent> {
    let row: ComponentRow = sqlx::query_as(&format!(
        "UPDATE maintenance_components
         SET last_completed_hours = $2, last_completed_date = $3, current_due_hours = $4,
             current_due_date = $5, extension_limit_percent = NULL, updated_at = now()
         WHERE id = $1
         RETURNING {COMPONENT_COLUMNS}"
    ))
    .bind(id)
    .bind(update.last_completed_hours)
    .bind(update.last_completed_date)
    .bind(update.current_due_hours)
    .bind(update.current_due_date)
    .fetch_one(conn)
    .await?;
    row.try_into()
}

/// Recompute and persist the component's due point for a completed visit.
async fn complete_component(conn: &mut PgConnection, draft: &VisitDraft) -> StoreResult<MaintenanceComponent> {
    let component = lock_component(&mut *conn, draft.component_id).await?;
    let update = recompute_on_completion(&component, draft.completion())?;
    let saved = save_due_point(conn, component.id, &update).await?;
    info!(
        component_id = %saved.id,
        due_hours = ?saved.current_due_hours,
        due_date = ?saved.current_due_date,
        "maintenance due point advanced"
    );
    Ok(saved)
}

pub struct MaintenanceStore;

impl MaintenanceStore {
    pub async fn list_components(pool: &PgPool, aircraft_id: Option<Uuid>) -> StoreResult<Vec<MaintenanceComponent>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COMPONENT_COLUMNS} FROM maintenance_components"));
        if let Some(aircraft_id) = aircraft_id {
            qb.push(" WHERE aircraft_id = ").push_bind(aircraft_id);
        }
        qb.push(" ORDER BY aircraft_id, name");
        let rows: Vec<ComponentRow> = qb.build_query_as().fetch_all(pool).await?;
        rows.into_iter().map(MaintenanceComponent::try_from).collect()
    }

    pub async fn get_component(pool: &PgPool, id: Uuid) -> StoreResult<MaintenanceComponent> {
        let row: Option<ComponentRow> = sqlx::query_as(&format!(
            "SELECT {COMPONENT_COLUMNS} FROM maintenance_components WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        row.ok_or(StoreError::NotFound {
            entity: "maintenance component",
            id,
        })?
        .try_into()
    }

    /// Grant, change or clear (`None`) the component's extension.
    pub async fn set_extension(pool: &PgPool, id: Uuid, percent: Option<f64>) -> StoreResult<MaintenanceComponent> {
        let row: Option<ComponentRow> = sqlx::query_as(&format!(
            "UPDATE maintenance_components
             SET extension_limit_percent = $2, updated_at = now()
             WHERE id = $1
             RETURNING {COMPONENT_COLUMNS}"
        ))
        .bind(id)
        .bind(percent)
        .fetch_optional(pool)
        .await?;
        let component: MaintenanceComponent = row
            .ok_or(StoreError::NotFound {
                entity: "maintenance component",
                id,
            })?
            .try_into()?;
        info!(component_id = %id, extension_limit_percent = ?percent, "maintenance extension set");
        Ok(component)
    }

    pub async fn list_visits(
        pool: &PgPool,
        component_id: Option<Uuid>,
        status: Option<VisitStatus>,
    ) -> StoreResult<Vec<MaintenanceVisit>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {VISIT_COLUMNS} FROM maintenance_visits WHERE TRUE"));
        if let Some(component_id) = component_id {
            qb.push(" AND component_id = ").push_bind(component_id);
        }
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY visit_date DESC, created_at DESC");
        let rows: Vec<VisitRow> = qb.build_query_as().fetch_all(pool).await?;
        rows.into_iter().map(MaintenanceVisit::try_from).collect()
    }

    pub async fn create_visit(pool: &PgPool, draft: &VisitDraft) -> StoreResult<VisitOutcome> {
        let mut tx = pool.begin().await?;

        let component = match draft.status {
            VisitStatus::Completed => Some(complete_component(&mut tx, draft).await?),
            VisitStatus::Scheduled => {
                lock_component(&mut tx, draft.component_id).await?;
                None
            }
        };

        let row: VisitRow = sqlx::query_as(&format!(
            "INSERT INTO maintenance_visits (component_id, visit_date, hours_at_visit, status, notes, completed_at)
             VALUES ($1, $2, $3, $4, $5, CASE WHEN $4 = 'completed' THEN now() END)
             RETURNING {VISIT_COLUMNS}"
        ))
        .bind(draft.component_id)
        .bind(draft.visit_date)
        .bind(draft.hours_at_visit)
        .bind(draft.status.as_str())
        .bind(&draft.notes)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(visit_id = %row.id, component_id = %row.component_id, status = %row.status, "maintenance visit recorded");
        Ok(VisitOutcome {
            visit: row.try_into()?,
            component,
        })
    }

    pub async fn update_visit(pool: &PgPool, id: Uuid, patch: VisitPatch) -> StoreResult<VisitOutcome> {
        let mut tx = pool.begin().await?;

        let stored: MaintenanceVisit = sqlx::query_as::<_, VisitRow>(&format!(
            "SELECT {VISIT_COLUMNS} FROM maintenance_visits WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "maintenance visit",
            id,
        })?
        .try_into()?;

        let draft = VisitFields::from_visit(&stored).apply(patch).validate()?;
        let component = match plan_update(&stored, &draft)? {
            VisitChange::Complete => Some(complete_component(&mut tx, &draft).await?),
            VisitChange::Edit => None,
        };

        let row: VisitRow = sqlx::query_as(&format!(
            "UPDATE maintenance_visits
             SET visit_date = $2, hours_at_visit = $3, status = $4, notes = $5,
                 completed_at = CASE WHEN $4 = 'completed' THEN COALESCE(completed_at, now()) END,
                 updated_at = now()
             WHERE id = $1
             RETURNING {VISIT_COLUMNS}"
        ))
        .bind(id)
        .bind(draft.visit_date)
        .bind(draft.hours_at_visit)
        .bind(draft.status.as_str())
        .bind(&draft.notes)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(visit_id = %id, status = %row.status, "maintenance visit updated");
        Ok(VisitOutcome {
            visit: row.try_into()?,
            component,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_row_widens_interval_days() {
        let row = ComponentRow {
            id: Uuid::new_v4(),
            aircraft_id: Uuid::new_v4(),
            name: "Engine oil".into(),
            interval_type: "both".into(),
            interval_hours: Some(50.0),
            interval_days: Some(120),
            last_completed_hours: None,
            last_completed_date: None,
            current_due_hours: Some(550.0),
            current_due_date: None,
            extension_limit_percent: Some(10.0),
        };
        let component = MaintenanceComponent::try_from(row).unwrap();
        assert_eq!(component.interval_type, IntervalType::Both);
        assert_eq!(component.interval_days, Some(120));
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let row = VisitRow {
            id: Uuid::new_v4(),
            component_id: Uuid::new_v4(),
            visit_date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            hours_at_visit: None,
            status: "cancelled".into(),
            notes: None,
        };
        assert!(matches!(MaintenanceVisit::try_from(row), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn outcome_omits_untouched_component() {
        let visit = MaintenanceVisit {
            id: Uuid::nil(),
            component_id: Uuid::nil(),
            visit_date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            hours_at_visit: Some(12.5),
            status: VisitStatus::Scheduled,
            notes: None,
        };
        let json = serde_json::to_value(VisitOutcome { visit, component: None }).unwrap();
        assert!(json.get("component").is_none());
        assert_eq!(json["visit"]["status"], "scheduled");
    }
}
