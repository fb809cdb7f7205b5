//! flightdeck HTTP service: instructor rosters and aircraft maintenance over
//! PostgreSQL, behind sealed-session authentication.

pub mod api;
pub mod auth;
pub mod db;
pub mod router;
pub mod state;
pub mod store;

pub use router::build_router;
pub use state::AppState;
