//! Shared building blocks: configuration, wire formats, validation errors
//! and the soft-delete lifecycle.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod patch;
pub mod time;
pub mod validation;

pub use config::Config;
pub use error::*;
pub use lifecycle::Lifecycle;
pub use validation::{FieldError, ValidationErrors};
