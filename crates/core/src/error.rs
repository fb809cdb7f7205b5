use thiserror::Error;

/// Errors raised while parsing wire values shared by every crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlightdeckError {
    #[error("invalid time '{0}', expected HH:MM (24-hour)")]
    InvalidTime(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}
