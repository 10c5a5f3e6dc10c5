//! Staleness sweep.
//!
//! A sweep visits every record and reclassifies it from the time elapsed
//! since its last reading. It reads `last_seen_at` but never advances it,
//! so the outcome does not depend on how sweeps and readings interleave.

use std::time::{Duration, Instant};

use super::store::{Alert, SensorStatus, SensorStore, SensorUpdate};

/// Thresholds for staleness classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    /// Silence longer than this marks a sensor stale.
    pub threshold: Duration,
    /// How often the sweep runs.
    pub sweep_interval: Duration,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            threshold: Duration::from_secs(120),
            sweep_interval: Duration::from_secs(10),
        }
    }
}

/// Classify a sensor from the time since its last reading.
pub fn status_for(elapsed: Duration, threshold: Duration) -> SensorStatus {
    if elapsed > threshold {
        SensorStatus::Stale
    } else {
        SensorStatus::Fresh
    }
}

/// Compute the status every record would have at `now`, without touching the store.
pub fn classify(
    store: &SensorStore,
    now: Instant,
    threshold: Duration,
) -> Vec<(String, SensorStatus)> {
    store
        .iter()
        .map(|r| (r.sensor_id.clone(), status_for(r.age(now), threshold)))
        .collect()
}

/// Reclassify every record at `now`.
///
/// Returns updates only for records whose displayed state changed, so
/// sinks are not redrawn with identical rows every cycle.
pub fn sweep(store: &mut SensorStore, now: Instant, threshold: Duration) -> Vec<SensorUpdate> {
    let mut updates = Vec::new();

    for record in store.iter_mut() {
        let status = status_for(record.age(now), threshold);
        let alert = match status {
            SensorStatus::Fresh => Alert::Ok,
            SensorStatus::Stale => Alert::NoData { threshold },
        };

        if record.status != status || record.alert != alert {
            record.status = status;
            record.alert = alert;
            updates.push(record.to_update());
        }
    }

    updates
}

/// A cancellable fixed-period schedule for sweeps.
///
/// The owner polls it with its own clock; periods missed while the owner
/// was busy collapse into a single due sweep.
#[derive(Debug, Clone)]
pub struct SweepSchedule {
    period: Duration,
    next_due: Option<Instant>,
}

impl SweepSchedule {
    /// Start a schedule whose first sweep is due one period after `now`.
    pub fn start(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next_due: Some(now + period),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns `true` if a sweep is due at `now`, and schedules the next one.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.period);
                true
            }
            _ => false,
        }
    }

    /// Time remaining until the next sweep, `None` once cancelled.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }

    /// Stop the schedule; `poll` never fires again.
    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.next_due.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::reading::Reading;

    const THRESHOLD: Duration = Duration::from_millis(120_000);

    fn reading(sensor: &str) -> Reading {
        Reading {
            sensor_id: sensor.to_string(),
            value: "20".to_string(),
            timestamp: String::new(),
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_status_boundary() {
        assert_eq!(status_for(ms(0), THRESHOLD), SensorStatus::Fresh);
        assert_eq!(status_for(THRESHOLD, THRESHOLD), SensorStatus::Fresh);
        assert_eq!(status_for(THRESHOLD + ms(1), THRESHOLD), SensorStatus::Stale);
    }

    #[test]
    fn test_classify_is_pure() {
        let mut store = SensorStore::new();
        let t0 = Instant::now();
        store.upsert(reading("a"), t0);
        store.upsert(reading("b"), t0 + ms(100_000));

        let statuses = classify(&store, t0 + ms(150_000), THRESHOLD);

        assert_eq!(
            statuses,
            vec![
                ("a".to_string(), SensorStatus::Stale),
                ("b".to_string(), SensorStatus::Fresh),
            ]
        );
        assert_eq!(store.count(SensorStatus::Stale), 0);
    }

    #[test]
    fn test_silent_sensor_goes_stale_then_recovers() {
        let mut store = SensorStore::new();
        let t0 = Instant::now();
        store.upsert(reading("a"), t0);

        let updates = sweep(&mut store, t0 + ms(150_000), THRESHOLD);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, SensorStatus::Stale);
        assert_eq!(updates[0].alert_text(), "⚠ No data for 2m+");
        assert_eq!(updates[0].style_class(), "alert");
        assert_eq!(store.get("a").unwrap().status, SensorStatus::Stale);

        let update = store.upsert(reading("a"), t0 + ms(150_001));
        assert_eq!(update.status, SensorStatus::Fresh);
        assert_eq!(store.get("a").unwrap().status, SensorStatus::Fresh);
    }

    #[test]
    fn test_sweep_matches_threshold_rule() {
        let mut store = SensorStore::new();
        let t0 = Instant::now();
        for (i, sensor) in ["a", "b", "c", "d"].iter().enumerate() {
            store.upsert(reading(sensor), t0 + ms(i as u64 * 50_000));
        }

        let now = t0 + ms(200_000);
        sweep(&mut store, now, THRESHOLD);

        for record in store.iter() {
            let expected = if now - record.last_seen_at > THRESHOLD {
                SensorStatus::Stale
            } else {
                SensorStatus::Fresh
            };
            assert_eq!(record.status, expected, "sensor {}", record.sensor_id);
        }
        assert_eq!(store.count(SensorStatus::Stale), 2);
    }

    #[test]
    fn test_sweep_only_reports_changes() {
        let mut store = SensorStore::new();
        let t0 = Instant::now();
        store.upsert(reading("a"), t0);

        // First sweep confirms the fresh reading.
        let first = sweep(&mut store, t0 + ms(10_000), THRESHOLD);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].alert, Alert::Ok);

        let second = sweep(&mut store, t0 + ms(20_000), THRESHOLD);
        assert!(second.is_empty());

        let third = sweep(&mut store, t0 + ms(130_000), THRESHOLD);
        assert_eq!(third.len(), 1);

        let fourth = sweep(&mut store, t0 + ms(140_000), THRESHOLD);
        assert!(fourth.is_empty());
    }

    #[test]
    fn test_sweep_never_touches_last_seen_or_membership() {
        let mut store = SensorStore::new();
        let t0 = Instant::now();
        store.upsert(reading("a"), t0);

        sweep(&mut store, t0 + ms(500_000), THRESHOLD);
        sweep(&mut store, t0 + ms(900_000), THRESHOLD);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().last_seen_at, t0);

        let mut empty = SensorStore::new();
        assert!(sweep(&mut empty, t0, THRESHOLD).is_empty());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_schedule_fires_each_period() {
        let t0 = Instant::now();
        let mut schedule = SweepSchedule::start(ms(10_000), t0);

        assert!(!schedule.poll(t0));
        assert!(!schedule.poll(t0 + ms(9_999)));
        assert!(schedule.poll(t0 + ms(10_000)));
        assert!(!schedule.poll(t0 + ms(10_001)));
        assert_eq!(schedule.time_until_due(t0 + ms(15_000)), Some(ms(5_000)));
    }

    #[test]
    fn test_schedule_collapses_missed_periods() {
        let t0 = Instant::now();
        let mut schedule = SweepSchedule::start(ms(10_000), t0);

        assert!(schedule.poll(t0 + ms(55_000)));
        assert!(!schedule.poll(t0 + ms(60_000)));
        assert!(schedule.poll(t0 + ms(65_000)));
    }

    #[test]
    fn test_schedule_cancel() {
        let t0 = Instant::now();
        let mut schedule = SweepSchedule::start(ms(10_000), t0);
        schedule.cancel();

        assert!(schedule.is_cancelled());
        assert!(!schedule.poll(t0 + ms(60_000)));
        assert_eq!(schedule.time_until_due(t0), None);
    }
}
