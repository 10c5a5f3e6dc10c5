//! Per-sensor freshness state.
//!
//! The store holds exactly one [`SensorRecord`] per sensor identity. Records
//! are created by the first reading for a sensor, updated in place by every
//! later reading and never removed: a sensor that stops reporting stays
//! visible and is marked stale by the sweep.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::duration::format_age;
use super::reading::Reading;

/// Freshness classification of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SensorStatus {
    Fresh,
    Stale,
}

impl SensorStatus {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            SensorStatus::Fresh => "OK",
            SensorStatus::Stale => "STALE",
        }
    }

    /// Style class handed to render sinks.
    pub fn style_class(&self) -> &'static str {
        match self {
            SensorStatus::Fresh => "ok",
            SensorStatus::Stale => "alert",
        }
    }
}

/// The indicator shown next to a sensor's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    /// A reading just arrived; no sweep has looked at it yet.
    Cleared,
    /// The last sweep found the sensor reporting.
    Ok,
    /// The last sweep found the sensor silent for longer than `threshold`.
    NoData { threshold: Duration },
}

impl Alert {
    pub fn text(&self) -> String {
        match self {
            Alert::Cleared => String::new(),
            Alert::Ok => "✓ OK".to_string(),
            Alert::NoData { threshold } => format!("⚠ No data for {}+", format_age(*threshold)),
        }
    }
}

/// State tracked for a single sensor.
#[derive(Debug, Clone)]
pub struct SensorRecord {
    pub sensor_id: String,
    pub last_value: String,
    pub last_timestamp: String,
    /// Ingestion instant of the latest reading. Only upserts advance it.
    pub last_seen_at: Instant,
    pub first_seen_at: Instant,
    pub status: SensorStatus,
    pub alert: Alert,
    /// Number of readings accepted for this sensor.
    pub readings: u64,
}

impl SensorRecord {
    /// Time since the latest reading, saturating at zero.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen_at)
    }

    /// The display tuple for this record.
    pub fn to_update(&self) -> SensorUpdate {
        SensorUpdate {
            sensor_id: self.sensor_id.clone(),
            value: self.last_value.clone(),
            alert: self.alert,
            status: self.status,
            timestamp: self.last_timestamp.clone(),
        }
    }
}

/// A state-change notification for render sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorUpdate {
    pub sensor_id: String,
    pub value: String,
    pub alert: Alert,
    pub status: SensorStatus,
    pub timestamp: String,
}

impl SensorUpdate {
    pub fn alert_text(&self) -> String {
        self.alert.text()
    }

    pub fn style_class(&self) -> &'static str {
        self.status.style_class()
    }
}

/// Associative store of sensor records keyed by sensor identity.
#[derive(Debug, Default)]
pub struct SensorStore {
    records: BTreeMap<String, SensorRecord>,
}

impl SensorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update the record for `reading.sensor_id`.
    ///
    /// The record is always `Fresh` afterwards. `last_seen_at` never moves
    /// backwards, even if `now` is earlier than the stored instant.
    pub fn upsert(&mut self, reading: Reading, now: Instant) -> SensorUpdate {
        let Reading {
            sensor_id,
            value,
            timestamp,
        } = reading;

        let record = self
            .records
            .entry(sensor_id.clone())
            .and_modify(|r| {
                r.last_seen_at = r.last_seen_at.max(now);
            })
            .or_insert_with(|| SensorRecord {
                sensor_id,
                last_value: String::new(),
                last_timestamp: String::new(),
                last_seen_at: now,
                first_seen_at: now,
                status: SensorStatus::Fresh,
                alert: Alert::Cleared,
                readings: 0,
            });

        record.last_value = value;
        record.last_timestamp = timestamp;
        record.status = SensorStatus::Fresh;
        record.alert = Alert::Cleared;
        record.readings += 1;

        record.to_update()
    }

    pub fn get(&self, sensor_id: &str) -> Option<&SensorRecord> {
        self.records.get(sensor_id)
    }

    /// All records, ordered by sensor identity.
    pub fn iter(&self) -> impl Iterator<Item = &SensorRecord> {
        self.records.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut SensorRecord> {
        self.records.values_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records currently in the given status.
    pub fn count(&self, status: SensorStatus) -> usize {
        self.records.values().filter(|r| r.status == status).count()
    }
}
