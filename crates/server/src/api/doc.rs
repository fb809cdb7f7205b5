//! OpenAPI documentation aggregator.
//!
//! Collects the `#[utoipa::path]` handlers and `ToSchema` wire types into
//! one OpenAPI document, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "flightdeck API",
        version = "0.1.0",
        description = "Instructor rosters, shift conflict checks and aircraft maintenance tracking.",
    ),
    tags(
        (name = "Health", description = "Server liveness"),
        (name = "Roster", description = "Weekly roster rules, date overrides, conflict checks and effective shifts"),
        (name = "Maintenance", description = "Component intervals, due status, extensions and maintenance visits"),
    ),
    paths(
        // Health
        crate::api::health::health,
        // Roster
        crate::api::conflicts::check_conflict,
        crate::api::conflicts::instructor_shifts,
        crate::api::roster_rules::list_rules,
        crate::api::roster_rules::get_rule,
        crate::api::roster_rules::create_rule,
        crate::api::roster_rules::update_rule,
        crate::api::roster_rules::delete_rule,
        crate::api::shift_overrides::list_overrides,
        crate::api::shift_overrides::get_override,
        crate::api::shift_overrides::create_override,
        crate::api::shift_overrides::update_override,
        crate::api::shift_overrides::delete_override,
        // Maintenance
        crate::api::maintenance::list_components,
        crate::api::maintenance::get_component,
        crate::api::maintenance::component_status,
        crate::api::maintenance::set_extension,
        crate::api::maintenance::list_visits,
        crate::api::maintenance::create_visit,
        crate::api::maintenance::update_visit,
    ),
    components(schemas(
        // Shared
        crate::api::common::ErrorBody,
        flightdeck_core::FieldError,
        crate::api::health::HealthResponse,
        // Roster
        crate::api::roster_rules::RosterRuleView,
        crate::api::shift_overrides::ShiftOverrideView,
        flightdeck_roster::RuleFields,
        flightdeck_roster::RulePatch,
        flightdeck_roster::OverrideFields,
        flightdeck_roster::OverridePatch,
        flightdeck_roster::OverrideKind,
        flightdeck_roster::ConflictCheckFields,
        flightdeck_roster::ConflictReport,
        flightdeck_roster::ConflictingShift,
        flightdeck_roster::ShiftKind,
        flightdeck_roster::EffectiveShift,
        flightdeck_roster::ShiftSource,
        // Maintenance
        flightdeck_maintenance::MaintenanceComponent,
        flightdeck_maintenance::IntervalType,
        flightdeck_maintenance::ExtensionRequest,
        flightdeck_maintenance::ComponentDueStatus,
        flightdeck_maintenance::DueStatus,
        flightdeck_maintenance::HoursStatus,
        flightdeck_maintenance::CalendarStatus,
        flightdeck_maintenance::MaintenanceVisit,
        flightdeck_maintenance::VisitStatus,
        flightdeck_maintenance::VisitFields,
        flightdeck_maintenance::VisitPatch,
        crate::store::maintenance::VisitOutcome,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for path in [
            "/health",
            "/schedule-conflict-check",
            "/roster-rules/{id}",
            "/shift-overrides",
            "/instructors/{id}/shifts",
            "/maintenance/components/{id}/status",
            "/maintenance/components/{id}/extension",
            "/maintenance/visits/{id}",
        ] {
            assert!(paths.contains(&path), "missing {path}");
        }
    }
}
