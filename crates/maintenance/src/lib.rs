//! Maintenance tracking: component intervals, due-point recomputation on
//! completed visits, and the due-status classifier.

pub mod component;
pub mod due;
pub mod error;
pub mod status;
pub mod visit;

pub use component::{check_extension_percent, ExtensionRequest, IntervalType, MaintenanceComponent};
pub use due::{recompute_on_completion, Completion, DueUpdate};
pub use error::MaintenanceError;
pub use status::{classify, CalendarStatus, ComponentDueStatus, DueStatus, DueThresholds, HoursStatus};
pub use visit::{plan_update, MaintenanceVisit, VisitChange, VisitDraft, VisitFields, VisitPatch, VisitStatus};
