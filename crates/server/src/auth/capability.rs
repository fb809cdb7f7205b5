//! Roles, capabilities, and the route → capability table.
//!
//! Every request is matched against [`ROUTE_POLICY`] once, in middleware.
//! Handlers never inspect roles themselves.

use std::str::FromStr;

use axum::http::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Instructor,
    Admin,
    Owner,
}

impl Role {
    pub const ALL: [Role; 4] = [Self::Student, Self::Instructor, Self::Admin, Self::Owner];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Self::Student | Self::Instructor => &[Capability::RosterRead, Capability::MaintenanceRead],
            Self::Admin | Self::Owner => &Capability::ALL,
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown role '{}': must be one of student, instructor, admin, owner", s))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    RosterRead,
    RosterWrite,
    MaintenanceRead,
    MaintenanceWrite,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Self::RosterRead,
        Self::RosterWrite,
        Self::MaintenanceRead,
        Self::MaintenanceWrite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RosterRead => "roster:read",
            Self::RosterWrite => "roster:write",
            Self::MaintenanceRead => "maintenance:read",
            Self::MaintenanceWrite => "maintenance:write",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a request must present to reach a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Any valid session.
    Authenticated,
    Requires(Capability),
}

/// One row of the policy table. `{}` segments match any single segment.
#[derive(Debug, Clone, Copy)]
pub struct RoutePolicy {
    pub pattern: &'static str,
    /// GET and HEAD.
    pub read: Access,
    /// Every other method.
    pub write: Access,
}

const fn public(pattern: &'static str) -> RoutePolicy {
    RoutePolicy {
        pattern,
        read: Access::Public,
        write: Access::Public,
    }
}

const fn guarded(pattern: &'static str, read: Capability, write: Capability) -> RoutePolicy {
    RoutePolicy {
        pattern,
        read: Access::Requires(read),
        write: Access::Requires(write),
    }
}

use Capability::{MaintenanceRead, MaintenanceWrite, RosterRead, RosterWrite};

pub const ROUTE_POLICY: &[RoutePolicy] = &[
    public("/health"),
    public("/docs"),
    // The conflict check is a read-only query even though it is a POST.
    guarded("/schedule-conflict-check", RosterRead, RosterRead),
    guarded("/roster-rules", RosterRead, RosterWrite),
    guarded("/roster-rules/{}", RosterRead, RosterWrite),
    guarded("/shift-overrides", RosterRead, RosterWrite),
    guarded("/shift-overrides/{}", RosterRead, RosterWrite),
    guarded("/instructors/{}/shifts", RosterRead, RosterWrite),
    guarded("/maintenance/components", MaintenanceRead, MaintenanceWrite),
    guarded("/maintenance/components/{}", MaintenanceRead, MaintenanceWrite),
    guarded("/maintenance/components/{}/status", MaintenanceRead, MaintenanceWrite),
    guarded("/maintenance/components/{}/extension", MaintenanceRead, MaintenanceWrite),
    guarded("/maintenance/visits", MaintenanceRead, MaintenanceWrite),
    guarded("/maintenance/visits/{}", MaintenanceRead, MaintenanceWrite),
];

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut want = pattern.trim_end_matches('/').split('/');
    let mut got = path.trim_end_matches('/').split('/');
    loop {
        match (want.next(), got.next()) {
            (None, None) => return true,
            (Some("{}"), Some(seg)) if !seg.is_empty() => {}
            (Some(w), Some(g)) if w == g => {}
            _ => return false,
        }
    }
}

/// Look up the access rule for a request. Unlisted paths still need a session.
pub fn required_access(method: &Method, path: &str) -> Access {
    let policy = ROUTE_POLICY.iter().find(|p| pattern_matches(p.pattern, path));
    match policy {
        Some(p) if *method == Method::GET || *method == Method::HEAD => p.read,
        Some(p) => p.write,
        None => Access::Authenticated,
    }
}
