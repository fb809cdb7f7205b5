use uuid::Uuid;

/// Errors raised by due-point recomputation and visit transitions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MaintenanceError {
    #[error("component {0} tracks hours but has no positive interval_hours")]
    MissingIntervalHours(Uuid),

    #[error("component {0} tracks calendar time but has no positive interval_days")]
    MissingIntervalDays(Uuid),

    #[error("component {0} has no due hours on record; hours_at_visit is required to complete it")]
    MissingVisitHours(Uuid),

    #[error("due date for component {0} is out of range")]
    DateOutOfRange(Uuid),

    #[error("extension_limit_percent must be greater than 0 and at most 100, got {0}")]
    InvalidExtension(f64),

    #[error("visit {0} is already completed")]
    AlreadyCompleted(Uuid),
}

pub type Result<T> = std::result::Result<T, MaintenanceError>;
