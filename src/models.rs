use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Donations,
    Requests,
    Scholarships,
    Events,
    Organizations,
    Users,
    Volunteers,
    Comments,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Donations,
        Collection::Requests,
        Collection::Scholarships,
        Collection::Events,
        Collection::Organizations,
        Collection::Users,
        Collection::Volunteers,
        Collection::Comments,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            Collection::Donations => "donations",
            Collection::Requests => "requests",
            Collection::Scholarships => "scholarships",
            Collection::Events => "events",
            Collection::Organizations => "organizations",
            Collection::Users => "users",
            Collection::Volunteers => "volunteers",
            Collection::Comments => "comments",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A raw row from one collection. Only `created_at` is typed; every other
/// column is kept as JSON and read through the lenient accessors below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Parses an RFC 3339 timestamp. A value without an offset, as `to_jsonb`
/// produces for `timestamp without time zone` columns, is taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.with_timezone(&Utc));
    }

    [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
    ]
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text)
        .ok_or_else(|| de::Error::custom(format!("invalid created_at timestamp `{text}`")))
}

impl Record {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn is_approved(&self) -> bool {
        matches!(self.fields.get("is_approved"), Some(Value::Bool(true)))
    }

    pub fn status(&self) -> Option<&str> {
        self.fields.get("status").and_then(Value::as_str)
    }

    pub fn has_status(&self, status: &str) -> bool {
        self.status()
            .map(|value| value.trim().eq_ignore_ascii_case(status))
            .unwrap_or(false)
    }

    pub fn approval_state(&self) -> ApprovalState {
        if self.is_approved() {
            ApprovalState::Approved
        } else if self.has_status("rejected") {
            ApprovalState::Rejected
        } else {
            ApprovalState::Pending
        }
    }

    /// Numeric value of `field`; absent or non-numeric values count as zero.
    pub fn amount(&self, field: &str) -> Decimal {
        match self.fields.get(field) {
            Some(Value::Number(number)) => number
                .as_i64()
                .map(Decimal::from)
                .or_else(|| number.as_f64().and_then(Decimal::from_f64))
                .unwrap_or(Decimal::ZERO),
            Some(Value::String(text)) => Decimal::from_str(text.trim()).unwrap_or(Decimal::ZERO),
            _ => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    Approved,
    Pending,
    Rejected,
}

/// Creation-time filter, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_record() -> Record {
        Record::new(Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap())
    }

    #[test]
    fn amount_reads_numbers_and_numeric_strings() {
        let record = sample_record()
            .with_field("amount_raised", json!(125.5))
            .with_field("amount", json!("40.25"))
            .with_field("count", json!(3));
        assert_eq!(record.amount("amount_raised"), Decimal::new(1255, 1));
        assert_eq!(record.amount("amount"), Decimal::new(4025, 2));
        assert_eq!(record.amount("count"), Decimal::from(3));
    }

    #[test]
    fn amount_treats_garbage_as_zero() {
        let record = sample_record()
            .with_field("amount_raised", json!("lots"))
            .with_field("amount", json!(null))
            .with_field("other", json!({"nested": 5}));
        assert_eq!(record.amount("amount_raised"), Decimal::ZERO);
        assert_eq!(record.amount("amount"), Decimal::ZERO);
        assert_eq!(record.amount("other"), Decimal::ZERO);
        assert_eq!(record.amount("missing"), Decimal::ZERO);
    }

    #[test]
    fn approval_state_prefers_flag_then_status() {
        let approved = sample_record()
            .with_field("is_approved", json!(true))
            .with_field("status", json!("rejected"));
        let rejected = sample_record()
            .with_field("is_approved", json!(false))
            .with_field("status", json!("Rejected"));
        let pending = sample_record().with_field("is_approved", json!("true"));

        assert_eq!(approved.approval_state(), ApprovalState::Approved);
        assert_eq!(rejected.approval_state(), ApprovalState::Rejected);
        assert_eq!(pending.approval_state(), ApprovalState::Pending);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 59).unwrap();
        let window = TimeWindow::new(start, end);

        assert!(window.contains(start));
        assert!(window.contains(end));
        assert!(!window.contains(end + chrono::Duration::seconds(1)));
        assert!(!window.contains(start - chrono::Duration::seconds(1)));
    }

    #[test]
    fn timestamps_without_offset_are_read_as_utc() {
        let expected = Some(sample_record().created_at);
        assert_eq!(parse_timestamp("2026-03-04T12:00:00"), expected);
        assert_eq!(parse_timestamp("2026-03-04 12:00:00"), expected);
        assert_eq!(parse_timestamp("2026-03-04T14:00:00+02:00"), expected);
        assert_eq!(
            parse_timestamp("2026-03-04T12:00:00.250"),
            Some(sample_record().created_at + chrono::Duration::milliseconds(250))
        );
        assert_eq!(parse_timestamp("last tuesday"), None);

        let record: Record = serde_json::from_value(json!({
            "created_at": "2026-03-04T12:00:00.000000",
            "is_approved": false
        }))
        .unwrap();
        assert_eq!(record.created_at, sample_record().created_at);
    }

    #[test]
    fn record_with_unparseable_timestamp_fails_to_decode() {
        let result = serde_json::from_value::<Record>(json!({"created_at": "soon"}));
        assert!(result.is_err());
    }

    #[test]
    fn record_decodes_from_row_json() {
        let record: Record = serde_json::from_value(json!({
            "id": 17,
            "created_at": "2026-03-04T12:00:00+00:00",
            "is_approved": true,
            "amount_raised": 20
        }))
        .unwrap();
        assert_eq!(record.created_at, sample_record().created_at);
        assert!(record.is_approved());
        assert_eq!(record.amount("amount_raised"), Decimal::from(20));
        assert!(!record.fields.contains_key("created_at"));
    }
}
