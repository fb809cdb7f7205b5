use crate::validation::ValidationErrors;

/// Errors produced by roster validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    #[error("start time {start} must be before end time {end}")]
    InvertedWindow { start: String, end: String },

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
}
