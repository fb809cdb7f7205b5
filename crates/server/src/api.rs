//! HTTP handlers, grouped by resource.
//!
//! Handlers validate input before touching the database, then call into
//! [`crate::store`]. Every failure becomes an [`common::ApiError`].

pub mod common;
pub mod conflicts;
pub mod doc;
pub mod health;
pub mod maintenance;
pub mod roster_rules;
pub mod shift_overrides;

pub use common::{ApiError, ErrorBody};
