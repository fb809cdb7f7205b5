//! Half-open time-of-day windows and the overlap rule.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::RosterError;
use crate::time::format_time;

/// `[s1, e1)` and `[s2, e2)` overlap iff `s1 < e2 && s2 < e1`.
///
/// Touching intervals (`e1 == s2`) do not overlap.
pub fn intervals_overlap<T: PartialOrd>(s1: T, e1: T, s2: T, e2: T) -> bool {
    s1 < e2 && s2 < e1
}

/// A non-empty `[start, end)` range within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "crate::time::hhmm")]
    start: NaiveTime,
    #[serde(with = "crate::time::hhmm")]
    end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, RosterError> {
        if start >= end {
            return Err(RosterError::InvertedWindow {
                start: format_time(start),
                end: format_time(end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        intervals_overlap(self.start, self.end, other.start, other.end)
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}–{}", format_time(self.start), format_time(self.end))
    }
}
