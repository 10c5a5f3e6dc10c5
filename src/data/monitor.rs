//! Sensor monitor: wires the parser, the store and the sweeper together.
//!
//! [`SensorMonitor`] is the single owner of all sensor state. Both inbound
//! messages and sweeps go through it, one at a time, and every resulting
//! row change is pushed to the caller's [`RenderSink`].

use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::{trace, warn};

use super::clock::{Clock, SystemClock};
use super::reading::ReadingParser;
use super::store::{SensorStatus, SensorStore};
use super::sweep::{self, StalenessPolicy};
use crate::sink::RenderSink;
use crate::source::RawMessage;

/// Counters for inbound messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Messages that became a reading.
    pub accepted: u64,
    /// Messages whose payload could not be decoded.
    pub decode_errors: u64,
    /// Messages on topics that do not name a sensor.
    pub ignored_topics: u64,
}

impl IngestStats {
    pub fn rejected(&self) -> u64 {
        self.decode_errors + self.ignored_topics
    }
}

/// Owns the sensor store and applies readings and sweeps to it.
#[derive(Debug)]
pub struct SensorMonitor {
    store: SensorStore,
    parser: ReadingParser,
    policy: StalenessPolicy,
    clock: Box<dyn Clock>,
    stats: IngestStats,
    last_sweep: Option<Instant>,
}

impl SensorMonitor {
    /// Create a monitor on the system clock.
    pub fn new(policy: StalenessPolicy) -> Self {
        Self::with_clock(policy, Box::new(SystemClock))
    }

    pub fn with_clock(policy: StalenessPolicy, clock: Box<dyn Clock>) -> Self {
        Self {
            store: SensorStore::new(),
            parser: ReadingParser::default(),
            policy,
            clock,
            stats: IngestStats::default(),
            last_sweep: None,
        }
    }

    /// Replace the reading parser (e.g. to change the time format).
    pub fn with_parser(mut self, parser: ReadingParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Apply one inbound message.
    ///
    /// Returns `true` if it produced a reading. Rejected messages leave the
    /// store untouched and render nothing.
    pub fn ingest(&mut self, message: &RawMessage, sink: &mut dyn RenderSink) -> bool {
        match self.parser.parse(&message.topic, &message.payload) {
            Ok(reading) => {
                let update = self.store.upsert(reading, self.clock.now());
                self.stats.accepted += 1;
                sink.render(&update);
                true
            }
            Err(e) if e.is_reportable() => {
                self.stats.decode_errors += 1;
                warn!(topic = %message.topic, "Dropping message: {}", e);
                false
            }
            Err(e) => {
                self.stats.ignored_topics += 1;
                trace!("Ignoring message: {}", e);
                false
            }
        }
    }

    /// Reclassify every sensor now. Returns the number of rows that changed.
    pub fn sweep(&mut self, sink: &mut dyn RenderSink) -> usize {
        let now = self.clock.now();
        let updates = sweep::sweep(&mut self.store, now, self.policy.threshold);
        for update in &updates {
            sink.render(update);
        }
        self.last_sweep = Some(now);
        updates.len()
    }

    pub fn store(&self) -> &SensorStore {
        &self.store
    }

    pub fn policy(&self) -> &StalenessPolicy {
        &self.policy
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Time since the most recent sweep.
    pub fn since_last_sweep(&self) -> Option<Duration> {
        self.last_sweep
            .map(|at| self.clock.now().saturating_duration_since(at))
    }

    /// Current state as JSON: a summary plus one entry per sensor.
    pub fn export(&self) -> Value {
        let now = self.clock.now();
        let sensors: Vec<Value> = self
            .store
            .iter()
            .map(|record| {
                json!({
                    "sensor": record.sensor_id,
                    "value": record.last_value,
                    "timestamp": record.last_timestamp,
                    "status": record.status.symbol(),
                    "alert": record.alert.text(),
                    "seen_secs_ago": record.age(now).as_secs(),
                    "readings": record.readings,
                })
            })
            .collect();

        json!({
            "exported_at": chrono::Local::now().to_rfc3339(),
            "stale_after_secs": self.policy.threshold.as_secs(),
            "summary": {
                "sensors": self.store.len(),
                "fresh": self.store.count(SensorStatus::Fresh),
                "stale": self.store.count(SensorStatus::Stale),
                "accepted": self.stats.accepted,
                "decode_errors": self.stats.decode_errors,
                "ignored_topics": self.stats.ignored_topics,
            },
            "sensors": sensors,
        })
    }
}
