//! Decoding of raw bus messages into sensor readings.
//!
//! A message is accepted when its payload is a JSON object and its topic
//! has exactly two `/`-separated segments (`<namespace>/<sensor>`). The
//! `value` and `timestamp` fields are both optional: a missing value is
//! shown as [`MISSING_VALUE`], and a falsy or non-numeric timestamp leaves
//! the formatted time empty.

use chrono::{Local, TimeZone};
use serde_json::{Map, Value};
use thiserror::Error;

/// Display value for a reading that carried no `value` field.
pub const MISSING_VALUE: &str = "--";

/// Topic segment delimiter.
pub const TOPIC_DELIMITER: char = '/';

/// Default `strftime` pattern for reading timestamps (en-US locale style).
pub const DEFAULT_TIME_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Reasons an inbound message is rejected.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Payload is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// Payload is valid JSON but not an object.
    #[error("payload is not a JSON object (got {0})")]
    NotAnObject(&'static str),

    /// Topic does not have the `<namespace>/<sensor>` shape.
    #[error("topic '{topic}' has {segments} segment(s), expected 2")]
    TopicShape { topic: String, segments: usize },
}

impl IngestError {
    /// Whether the failure should be surfaced in the log.
    ///
    /// Topic shape mismatches cannot be attributed to a sensor and are
    /// dropped quietly; payload failures are reported.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, IngestError::TopicShape { .. })
    }
}

/// A decoded reading, ready to be upserted into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub sensor_id: String,
    /// Display form of the measured value.
    pub value: String,
    /// Locale-formatted reading time, empty if the reading carried none.
    pub timestamp: String,
}

/// Turns `(topic, payload)` pairs into [`Reading`]s.
#[derive(Debug, Clone)]
pub struct ReadingParser {
    time_format: String,
}

impl Default for ReadingParser {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_FORMAT)
    }
}

impl ReadingParser {
    /// Create a parser that formats timestamps with the given `strftime` pattern.
    pub fn new(time_format: impl Into<String>) -> Self {
        Self {
            time_format: time_format.into(),
        }
    }

    /// Decode a message into a reading, formatting timestamps in local time.
    pub fn parse(&self, topic: &str, payload: &[u8]) -> Result<Reading, IngestError> {
        self.parse_in(topic, payload, &Local)
    }

    /// Decode a message, formatting timestamps in the given time zone.
    pub fn parse_in<Tz: TimeZone>(
        &self,
        topic: &str,
        payload: &[u8],
        tz: &Tz,
    ) -> Result<Reading, IngestError>
    where
        Tz::Offset: std::fmt::Display,
    {
        let fields = match serde_json::from_slice::<Value>(payload)? {
            Value::Object(fields) => fields,
            other => return Err(IngestError::NotAnObject(json_kind(&other))),
        };

        let sensor_id = sensor_id_from_topic(topic)?;

        Ok(Reading {
            sensor_id: sensor_id.to_string(),
            value: display_value(&fields),
            timestamp: fields
                .get("timestamp")
                .and_then(epoch_millis)
                .and_then(|ms| format_epoch_millis(ms, tz, &self.time_format))
                .unwrap_or_default(),
        })
    }
}

/// Extract the sensor identity from a `<namespace>/<sensor>` topic.
pub fn sensor_id_from_topic(topic: &str) -> Result<&str, IngestError> {
    let segments: Vec<&str> = topic.split(TOPIC_DELIMITER).collect();
    match segments.as_slice() {
        [_, sensor] => Ok(*sensor),
        _ => Err(IngestError::TopicShape {
            topic: topic.to_string(),
            segments: segments.len(),
        }),
    }
}

/// Magnitude below which every integral `f64` is exact (2^53).
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn display_value(fields: &Map<String, Value>) -> String {
    match fields.get("value") {
        None => MISSING_VALUE.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => display_number(n),
        Some(other) => other.to_string(),
    }
}

/// Shortest decimal form: `21.0` displays as `21`.
fn display_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}

/// Coerce a timestamp field to epoch milliseconds.
///
/// Only the falsy JSON values (`0`, `""`, `null`, `false`) count as absent.
/// Anything else is converted like a numeric cast: a blank string is zero,
/// `true` is one, and text that is not a number yields `None`.
fn epoch_millis(value: &Value) -> Option<f64> {
    let ms = match value {
        Value::Null | Value::Bool(false) => return None,
        Value::Bool(true) => 1.0,
        Value::Number(n) => n.as_f64().filter(|ms| *ms != 0.0)?,
        Value::String(s) if s.is_empty() => return None,
        Value::String(s) => match s.trim() {
            "" => 0.0,
            digits => digits.parse::<f64>().ok()?,
        },
        Value::Array(_) | Value::Object(_) => return None,
    };
    ms.is_finite().then_some(ms)
}

/// Format epoch milliseconds in `tz`; `None` if the instant is out of range.
pub fn format_epoch_millis<Tz: TimeZone>(ms: f64, tz: &Tz, pattern: &str) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    if ms.abs() > i64::MAX as f64 {
        return None;
    }
    let dt = tz.timestamp_millis_opt(ms.trunc() as i64).single()?;
    Some(dt.format(pattern).to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn parse_utc(topic: &str, payload: &str) -> Result<Reading, IngestError> {
        ReadingParser::default().parse_in(topic, payload.as_bytes(), &Utc)
    }

    #[test]
    fn test_well_formed_reading() {
        let reading = parse_utc(
            "temperature/kitchen",
            r#"{"value":21.5,"timestamp":1700000000000}"#,
        )
        .unwrap();

        assert_eq!(reading.sensor_id, "kitchen");
        assert_eq!(reading.value, "21.5");
        assert_eq!(reading.timestamp, "11/14/2023, 10:13:20 PM");
    }

    #[test]
    fn test_local_time_is_non_empty() {
        let reading = ReadingParser::default()
            .parse(
                "temperature/kitchen",
                br#"{"value":21.5,"timestamp":1700000000000}"#,
            )
            .unwrap();
        assert!(!reading.timestamp.is_empty());
    }

    #[test]
    fn test_missing_value_uses_placeholder() {
        let reading = parse_utc("temperature/hall", r#"{"timestamp":1700000000000}"#).unwrap();
        assert_eq!(reading.value, MISSING_VALUE);
        assert!(!reading.timestamp.is_empty());
    }

    #[test]
    fn test_value_display_forms() {
        assert_eq!(parse_utc("t/a", r#"{"value":21}"#).unwrap().value, "21");
        assert_eq!(parse_utc("t/a", r#"{"value":"warm"}"#).unwrap().value, "warm");
        assert_eq!(parse_utc("t/a", r#"{"value":null}"#).unwrap().value, "null");
        assert_eq!(parse_utc("t/a", r#"{"value":true}"#).unwrap().value, "true");
        assert_eq!(parse_utc("t/a", r#"{"value":[1,2]}"#).unwrap().value, "[1,2]");
    }

    #[test]
    fn test_integral_float_drops_fraction() {
        assert_eq!(parse_utc("temperature/k", r#"{"value":21.0}"#).unwrap().value, "21");
        assert_eq!(parse_utc("t/a", r#"{"value":-3.0}"#).unwrap().value, "-3");
        assert_eq!(parse_utc("t/a", r#"{"value":21.25}"#).unwrap().value, "21.25");
        // Too large to be an exact integer
        assert_eq!(parse_utc("t/a", r#"{"value":1e300}"#).unwrap().value, "1e300");
    }

    #[test]
    fn test_timestamp_coercion() {
        let numeric_string =
            parse_utc("t/a", r#"{"value":1,"timestamp":"1700000000000"}"#).unwrap();
        assert_eq!(numeric_string.timestamp, "11/14/2023, 10:13:20 PM");

        // Non-empty strings are present even when they coerce to zero
        for ts in [r#""0""#, r#"" ""#, "true"] {
            let payload = format!(r#"{{"value":1,"timestamp":{}}}"#, ts);
            let reading = parse_utc("t/a", &payload).unwrap();
            assert_eq!(reading.timestamp, "1/1/1970, 12:00:00 AM", "timestamp {}", ts);
        }

        for ts in [r#""later""#, "0", r#""""#, "null", "false", "{}"] {
            let payload = format!(r#"{{"value":1,"timestamp":{}}}"#, ts);
            let reading = parse_utc("t/a", &payload).unwrap();
            assert_eq!(reading.timestamp, "", "timestamp {} should be blank", ts);
        }

        let absent = parse_utc("t/a", r#"{"value":1}"#).unwrap();
        assert_eq!(absent.timestamp, "");
    }

    #[test]
    fn test_out_of_range_timestamp_is_blank() {
        let reading = parse_utc("t/a", r#"{"value":1,"timestamp":1e300}"#).unwrap();
        assert_eq!(reading.timestamp, "");
    }

    #[test]
    fn test_custom_time_format() {
        let parser = ReadingParser::new("%Y-%m-%dT%H:%M:%S");
        let reading = parser
            .parse_in("t/a", br#"{"value":1,"timestamp":1700000000000}"#, &Utc)
            .unwrap();
        assert_eq!(reading.timestamp, "2023-11-14T22:13:20");
    }

    #[test]
    fn test_malformed_payload_is_decode_error() {
        let err = parse_utc("temperature/kitchen", "not json").unwrap_err();
        assert!(matches!(err, IngestError::Decode(_)));
        assert!(err.is_reportable());
    }

    #[test]
    fn test_non_object_payload_is_rejected() {
        let err = parse_utc("temperature/kitchen", "42").unwrap_err();
        assert!(matches!(err, IngestError::NotAnObject("number")));
        assert!(err.is_reportable());
    }

    #[test]
    fn test_topic_shape() {
        let err = parse_utc("temperature/kitchen/extra", r#"{"value":1}"#).unwrap_err();
        assert!(matches!(err, IngestError::TopicShape { segments: 3, .. }));
        assert!(!err.is_reportable());

        let err = parse_utc("kitchen", r#"{"value":1}"#).unwrap_err();
        assert!(matches!(err, IngestError::TopicShape { segments: 1, .. }));
    }

    #[test]
    fn test_payload_checked_before_topic() {
        let err = parse_utc("a/b/c", "garbage").unwrap_err();
        assert!(matches!(err, IngestError::Decode(_)));
    }
}
