//! Soft-delete lifecycle shared by roster rules and shift overrides.
//!
//! Rows are voided, never hard-deleted. The database keeps a nullable
//! `voided_at` column; code only ever sees the tagged [`Lifecycle`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    Active,
    Voided { at: DateTime<Utc> },
}

impl Lifecycle {
    pub fn from_voided_at(voided_at: Option<DateTime<Utc>>) -> Self {
        match voided_at {
            Some(at) => Self::Voided { at },
            None => Self::Active,
        }
    }

    pub fn voided_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Active => None,
            Self::Voided { at } => Some(*at),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullable_column_maps_to_tagged_state() {
        assert_eq!(Lifecycle::from_voided_at(None), Lifecycle::Active);

        let at = Utc::now();
        let voided = Lifecycle::from_voided_at(Some(at));
        assert!(!voided.is_active());
        assert_eq!(voided.voided_at(), Some(at));
    }

    #[test]
    fn serializes_with_state_tag() {
        let json = serde_json::to_value(Lifecycle::Active).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "active" }));
    }
}
