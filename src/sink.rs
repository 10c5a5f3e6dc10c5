//! Render sinks: consumers of sensor state changes.
//!
//! The core never draws anything itself. Every upsert and every sweep that
//! changes a row produces a [`SensorUpdate`], which is handed to a
//! [`RenderSink`]. The terminal UI reads from a [`SensorTable`]; headless
//! mode logs each update through [`LogSink`].

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::data::{SensorStatus, SensorUpdate};

/// Consumer of per-sensor display updates.
pub trait RenderSink {
    fn render(&mut self, update: &SensorUpdate);
}

/// Recording sink, mostly useful in tests.
impl RenderSink for Vec<SensorUpdate> {
    fn render(&mut self, update: &SensorUpdate) {
        self.push(update.clone());
    }
}

/// One visible row of the sensor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub sensor_id: String,
    pub value: String,
    pub alert_text: String,
    pub status: SensorStatus,
    pub style_class: &'static str,
    pub timestamp: String,
}

impl From<&SensorUpdate> for RowView {
    fn from(update: &SensorUpdate) -> Self {
        Self {
            sensor_id: update.sensor_id.clone(),
            value: update.value.clone(),
            alert_text: update.alert_text(),
            status: update.status,
            style_class: update.style_class(),
            timestamp: update.timestamp.clone(),
        }
    }
}

/// Row model backing the terminal UI, one row per sensor.
#[derive(Debug, Default)]
pub struct SensorTable {
    rows: BTreeMap<String, RowView>,
}

impl SensorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sensor_id: &str) -> Option<&RowView> {
        self.rows.get(sensor_id)
    }

    /// Rows ordered by sensor identity.
    pub fn rows(&self) -> impl Iterator<Item = &RowView> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RenderSink for SensorTable {
    fn render(&mut self, update: &SensorUpdate) {
        self.rows.insert(update.sensor_id.clone(), RowView::from(update));
    }
}

/// Sink that emits one structured log event per update.
#[derive(Debug, Default)]
pub struct LogSink;

impl RenderSink for LogSink {
    fn render(&mut self, update: &SensorUpdate) {
        match update.status {
            SensorStatus::Fresh => info!(
                sensor = %update.sensor_id,
                value = %update.value,
                timestamp = %update.timestamp,
                alert = %update.alert_text(),
                "sensor {}",
                update.style_class()
            ),
            SensorStatus::Stale => warn!(
                sensor = %update.sensor_id,
                value = %update.value,
                timestamp = %update.timestamp,
                alert = %update.alert_text(),
                "sensor {}",
                update.style_class()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Alert;
    use std::time::Duration;

    fn update(sensor: &str, value: &str, status: SensorStatus, alert: Alert) -> SensorUpdate {
        SensorUpdate {
            sensor_id: sensor.to_string(),
            value: value.to_string(),
            alert,
            status,
            timestamp: "11/14/2023, 10:13:20 PM".to_string(),
        }
    }

    #[test]
    fn test_table_keeps_one_row_per_sensor() {
        let mut table = SensorTable::new();

        table.render(&update("a", "1", SensorStatus::Fresh, Alert::Cleared));
        table.render(&update("b", "2", SensorStatus::Fresh, Alert::Cleared));
        table.render(&update("a", "3", SensorStatus::Fresh, Alert::Ok));

        assert_eq!(table.len(), 2);

        let row = table.get("a").unwrap();
        assert_eq!(row.value, "3");
        assert_eq!(row.alert_text, "✓ OK");
        assert_eq!(row.style_class, "ok");
    }

    #[test]
    fn test_table_reflects_stale_styling() {
        let mut table = SensorTable::new();
        table.render(&update(
            "a",
            "1",
            SensorStatus::Stale,
            Alert::NoData {
                threshold: Duration::from_secs(120),
            },
        ));

        let row = table.get("a").unwrap();
        assert_eq!(row.status, SensorStatus::Stale);
        assert_eq!(row.style_class, "alert");
        assert_eq!(row.alert_text, "⚠ No data for 2m+");
    }

    #[test]
    fn test_vec_sink_records_updates() {
        let mut sink: Vec<SensorUpdate> = Vec::new();
        sink.render(&update("a", "1", SensorStatus::Fresh, Alert::Cleared));
        assert_eq!(sink.len(), 1);
    }
}
