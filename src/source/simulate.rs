//! Synthetic sensor publishers.
//!
//! Each simulated sensor publishes an integer temperature between 10 and 40
//! with an epoch-millisecond timestamp on `<namespace>/<name>`, the same
//! payload a real field publisher sends. Sensors occasionally drop out for
//! a while so that staleness can be observed without real hardware.

use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use super::{ChannelSource, RawMessage};

const VALUE_RANGE: std::ops::RangeInclusive<i64> = 10..=40;

/// Outage length in ticks, once a sensor drops out. At the default two
/// second cadence the longer outages outlast the stale threshold.
const OUTAGE_TICKS: std::ops::RangeInclusive<u32> = 5..=90;

#[derive(Debug, Clone)]
struct SimulatedSensor {
    name: String,
    /// Remaining silent ticks.
    silent_for: u32,
}

/// A set of fake sensors publishing on a fixed cadence.
#[derive(Debug, Clone)]
pub struct Simulator {
    namespace: String,
    sensors: Vec<SimulatedSensor>,
    /// Per-tick probability that a reporting sensor drops out.
    outage_chance: f64,
}

impl Simulator {
    /// Simulate `count` sensors named `sensor_01`, `sensor_02`, ...
    pub fn new(namespace: impl Into<String>, count: usize) -> Self {
        let names = (1..=count).map(|i| format!("sensor_{:02}", i));
        Self::with_names(namespace, names)
    }

    pub fn with_names<I, S>(namespace: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace: namespace.into(),
            sensors: names
                .into_iter()
                .map(|name| SimulatedSensor {
                    name: name.into(),
                    silent_for: 0,
                })
                .collect(),
            outage_chance: 0.02,
        }
    }

    /// Set the per-tick dropout probability (clamped to `0.0..=1.0`).
    pub fn with_outage_chance(mut self, chance: f64) -> Self {
        self.outage_chance = if chance.is_nan() { 0.0 } else { chance.clamp(0.0, 1.0) };
        self
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// Advance every sensor by one tick and return the messages published.
    pub fn tick<R: Rng>(&mut self, rng: &mut R, timestamp_ms: i64) -> Vec<RawMessage> {
        let mut messages = Vec::with_capacity(self.sensors.len());

        for sensor in &mut self.sensors {
            if sensor.silent_for > 0 {
                sensor.silent_for -= 1;
                continue;
            }
            if rng.gen_bool(self.outage_chance) {
                sensor.silent_for = rng.gen_range(OUTAGE_TICKS);
                debug!("Simulated sensor {} dropping out for {} ticks", sensor.name, sensor.silent_for);
                continue;
            }

            let payload = serde_json::json!({
                "value": rng.gen_range(VALUE_RANGE),
                "timestamp": timestamp_ms,
            });
            messages.push(RawMessage::new(
                format!("{}/{}", self.namespace, sensor.name),
                payload.to_string(),
            ));
        }

        messages
    }

    /// Run the simulator on a background thread, publishing every `interval`.
    ///
    /// The thread exits once the returned source is dropped. Must not be
    /// called from within an async task.
    pub fn spawn(mut self, interval: Duration) -> ChannelSource {
        let description = format!("simulator: {} sensors", self.sensors.len());
        let (handle, source) = ChannelSource::create(&description, 1024);

        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            handle.set_connected();

            loop {
                let now_ms = chrono::Utc::now().timestamp_millis();
                for message in self.tick(&mut rng, now_ms) {
                    if !handle.blocking_send(message) {
                        return;
                    }
                }
                if handle.is_closed() {
                    return;
                }
                thread::sleep(interval);
            }
        });

        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ReadingParser;
    use crate::source::ReadingSource;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sensor_names() {
        let sim = Simulator::new("temperature", 3);
        assert_eq!(sim.sensor_count(), 3);

        let mut rng = StdRng::seed_from_u64(7);
        let mut sim = sim.with_outage_chance(0.0);
        let topics: Vec<_> = sim.tick(&mut rng, 1).into_iter().map(|m| m.topic).collect();
        assert_eq!(
            topics,
            vec![
                "temperature/sensor_01",
                "temperature/sensor_02",
                "temperature/sensor_03"
            ]
        );
    }

    #[test]
    fn test_payloads_parse_as_readings() {
        let mut sim = Simulator::with_names("temperature", ["data_center_a1"]).with_outage_chance(0.0);
        let mut rng = StdRng::seed_from_u64(42);
        let parser = ReadingParser::default();

        for _ in 0..100 {
            let messages = sim.tick(&mut rng, 1_700_000_000_000);
            assert_eq!(messages.len(), 1);

            let reading = parser.parse(&messages[0].topic, &messages[0].payload).unwrap();
            assert_eq!(reading.sensor_id, "data_center_a1");
            let value: i64 = reading.value.parse().unwrap();
            assert!(VALUE_RANGE.contains(&value));
            assert!(!reading.timestamp.is_empty());
        }
    }

    #[test]
    fn test_outage_silences_sensor() {
        let mut sim = Simulator::new("temperature", 1).with_outage_chance(1.0);
        let mut rng = StdRng::seed_from_u64(1);

        assert!(sim.tick(&mut rng, 1).is_empty());
        let silent = sim.sensors[0].silent_for;
        assert!(OUTAGE_TICKS.contains(&silent));

        sim.outage_chance = 0.0;
        for _ in 0..silent {
            assert!(sim.tick(&mut rng, 1).is_empty());
        }
        assert_eq!(sim.tick(&mut rng, 1).len(), 1);
    }

    #[test]
    fn test_outage_chance_is_clamped() {
        assert_eq!(Simulator::new("t", 1).with_outage_chance(2.0).outage_chance, 1.0);
        assert_eq!(Simulator::new("t", 1).with_outage_chance(-1.0).outage_chance, 0.0);
        assert_eq!(Simulator::new("t", 1).with_outage_chance(f64::NAN).outage_chance, 0.0);
    }

    #[test]
    fn test_spawned_simulator_publishes() {
        let mut source = Simulator::new("temperature", 2)
            .with_outage_chance(0.0)
            .spawn(Duration::from_millis(10));

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        let mut message = None;
        while message.is_none() && std::time::Instant::now() < deadline {
            message = source.poll();
            thread::sleep(Duration::from_millis(5));
        }

        assert!(message.unwrap().topic.starts_with("temperature/sensor_"));
        assert_eq!(source.description(), "simulator: 2 sensors");
    }
}
