//! Wire formats for times of day (`HH:MM`, 24-hour) and dates (`YYYY-MM-DD`).

use chrono::{Datelike, NaiveDate, NaiveTime};
use crate::error::FlightdeckError;

pub const TIME_FORMAT: &str = "%H:%M";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a strict `HH:MM` string. Seconds, single-digit hours and `24:00`
/// are all rejected.
pub fn parse_time(raw: &str) -> Result<NaiveTime, FlightdeckError> {
    let raw = raw.trim();
    let bytes = raw.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(FlightdeckError::InvalidTime(raw.to_string()));
    }
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .map_err(|_| FlightdeckError::InvalidTime(raw.to_string()))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, FlightdeckError> {
    let raw = raw.trim();
    if raw.len() != 10 {
        return Err(FlightdeckError::InvalidDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| FlightdeckError::InvalidDate(raw.to_string()))
}

pub fn format_time(t: NaiveTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Day-of-week index with Sunday = 0 … Saturday = 6.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Serde adapter writing `NaiveTime` as `HH:MM`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_time(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time(&raw).map_err(serde::de::Error::custom)
    }
}
