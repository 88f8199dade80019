use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use tracing::warn;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A deadline as a date range with two optional boundaries.
///
/// On the wire this is always written as a two-element array
/// (`["2024-01-01", null]`). Reading is lenient: older records store a single
/// date string, and browser clients send RFC 3339 timestamps. Both are
/// migrated into the range form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Deadline {
    pub const UNSET: Deadline = Deadline { start: None, end: None };

    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn on(date: NaiveDate) -> Self {
        Self { start: Some(date), end: None }
    }

    /// Both boundaries empty. Used as "no change" by edit buffers.
    pub fn is_unset(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Migrates a legacy single-string deadline.
    pub fn from_legacy(value: &str) -> Self {
        match parse_date(value) {
            Some(date) => Self::on(date),
            None => Self::UNSET,
        }
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (None, None) => write!(f, "-"),
            (Some(start), None) => write!(f, "{}", start.format(DATE_FORMAT)),
            (None, Some(end)) => write!(f, "until {}", end.format(DATE_FORMAT)),
            (Some(start), Some(end)) => {
                write!(f, "{} - {}", start.format(DATE_FORMAT), end.format(DATE_FORMAT))
            }
        }
    }
}

/// Parses `YYYY-MM-DD` or an RFC 3339 timestamp. Timestamps keep their UTC
/// calendar date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    // "2024/01/01" is what the date picker shows
    NaiveDate::parse_from_str(value, "%Y/%m/%d").ok()
}

fn parse_boundary(value: Option<&str>) -> Option<NaiveDate> {
    let raw = value?;
    let parsed = parse_date(raw);
    if parsed.is_none() && !raw.trim().is_empty() {
        warn!("dropping unparseable deadline boundary: {:?}", raw);
    }
    parsed
}

impl Serialize for Deadline {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.start.map(|d| d.format(DATE_FORMAT).to_string()))?;
        tuple.serialize_element(&self.end.map(|d| d.format(DATE_FORMAT).to_string()))?;
        tuple.end()
    }
}

struct DeadlineVisitor;

impl<'de> Visitor<'de> for DeadlineVisitor {
    type Value = Deadline;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a date string, a [start, end] array, or null")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Deadline, E> {
        let deadline = Deadline::from_legacy(value);
        if deadline.is_unset() && !value.trim().is_empty() {
            warn!("dropping unparseable deadline: {:?}", value);
        }
        Ok(deadline)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Deadline, E> {
        Ok(Deadline::UNSET)
    }

    fn visit_none<E: de::Error>(self) -> Result<Deadline, E> {
        Ok(Deadline::UNSET)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Deadline, D::Error> {
        deserializer.deserialize_any(DeadlineVisitor)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Deadline, A::Error> {
        let start: Option<String> = seq.next_element::<Option<String>>()?.flatten();
        let end: Option<String> = seq.next_element::<Option<String>>()?.flatten();
        // extra elements are ignored
        while seq.next_element::<serde::de::IgnoredAny>()?.is_some() {}

        Ok(Deadline {
            start: parse_boundary(start.as_deref()),
            end: parse_boundary(end.as_deref()),
        })
    }
}

impl<'de> Deserialize<'de> for Deadline {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DeadlineVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn reads_legacy_single_string() {
        let deadline: Deadline = serde_json::from_str("\"2024-01-01\"").unwrap();
        assert_eq!(deadline, Deadline::on(date(2024, 1, 1)));
    }

    #[test]
    fn reads_browser_timestamps_in_range() {
        let deadline: Deadline =
            serde_json::from_str(r#"["2024-03-04T23:00:00.000Z", null]"#).unwrap();
        assert_eq!(deadline.start, Some(date(2024, 3, 4)));
        assert_eq!(deadline.end, None);
    }

    #[test]
    fn null_and_garbage_become_unset() {
        let from_null: Deadline = serde_json::from_str("null").unwrap();
        assert!(from_null.is_unset());

        let from_garbage: Deadline = serde_json::from_str("\"someday\"").unwrap();
        assert!(from_garbage.is_unset());

        let from_empty_range: Deadline = serde_json::from_str("[null, null]").unwrap();
        assert!(from_empty_range.is_unset());
    }

    #[test]
    fn always_writes_two_element_array() {
        let deadline = Deadline::new(Some(date(2024, 1, 1)), Some(date(2024, 1, 7)));
        let json = serde_json::to_value(deadline).unwrap();
        assert_eq!(json, serde_json::json!(["2024-01-01", "2024-01-07"]));

        let json = serde_json::to_value(Deadline::UNSET).unwrap();
        assert_eq!(json, serde_json::json!([null, null]));
    }

    #[test]
    fn parses_picker_format() {
        assert_eq!(parse_date("2024/02/29"), Some(date(2024, 2, 29)));
        assert_eq!(parse_date("  "), None);
    }

    #[test]
    fn display_formats_each_shape() {
        assert_eq!(Deadline::UNSET.to_string(), "-");
        assert_eq!(Deadline::on(date(2024, 1, 1)).to_string(), "2024-01-01");
        assert_eq!(
            Deadline::new(Some(date(2024, 1, 1)), Some(date(2024, 1, 2))).to_string(),
            "2024-01-01 - 2024-01-02"
        );
    }
}
