//! PostgreSQL persistence for rosters and maintenance.
//!
//! Stores are stateless; every function borrows a pool or connection. Soft
//! deleted rows are hidden by [`push_active`], the only place the
//! `voided_at` column is filtered.

pub mod maintenance;
pub mod roster;

use flightdeck_core::ValidationErrors;
use flightdeck_maintenance::MaintenanceError;
use flightdeck_roster::ConflictingShift;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

pub use maintenance::MaintenanceStore;
pub use roster::RosterStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("schedule conflict with {} existing shift(s)", .0.len())]
    Conflict(Vec<ConflictingShift>),

    #[error("{0}")]
    Invalid(ValidationErrors),

    #[error(transparent)]
    Maintenance(#[from] MaintenanceError),

    /// A stored row violates a domain invariant.
    #[error("corrupt {entity} row {id}: {reason}")]
    Corrupt {
        entity: &'static str,
        id: Uuid,
        reason: String,
    },
}

impl From<ValidationErrors> for StoreError {
    fn from(e: ValidationErrors) -> Self {
        Self::Invalid(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Start a `WHERE` clause that keeps only rows that have not been voided.
/// Further filters are appended with `AND`.
pub(crate) fn push_active(qb: &mut QueryBuilder<'_, Postgres>) {
    qb.push(" WHERE voided_at IS NULL");
}

/// Lock key for serializing roster writes of one instructor.
pub(crate) fn instructor_lock_key(instructor_id: Uuid) -> i64 {
    let (hi, lo) = instructor_id.as_u64_pair();
    (hi ^ lo) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_filter_is_the_where_clause() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM roster_rules");
        push_active(&mut qb);
        qb.push(" AND instructor_id = ").push_bind(Uuid::nil());
        assert_eq!(
            qb.sql(),
            "SELECT id FROM roster_rules WHERE voided_at IS NULL AND instructor_id = $1"
        );
    }

    #[test]
    fn lock_key_is_stable_per_instructor() {
        let id = Uuid::new_v4();
        assert_eq!(instructor_lock_key(id), instructor_lock_key(id));
        assert_ne!(instructor_lock_key(id), instructor_lock_key(Uuid::new_v4()));
    }
}
