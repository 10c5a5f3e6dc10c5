//! Sensor state and its processing.
//!
//! This module turns raw bus messages into per-sensor freshness state and
//! decides when a sensor has gone silent.
//!
//! ## Submodules
//!
//! - [`reading`]: Decoding `(topic, payload)` pairs into [`Reading`]s
//! - [`store`]: One [`SensorRecord`] per sensor, upserted by readings
//! - [`sweep`]: Periodic staleness classification and its [`SweepSchedule`]
//! - [`monitor`]: [`SensorMonitor`], the owner that ties the above together
//! - [`clock`]: Injectable monotonic time
//! - [`duration`]: Parsing and formatting of duration strings (e.g., "2m", "10s")
//!
//! ## Data Flow
//!
//! ```text
//! RawMessage (topic, payload)
//!        │
//!        ▼
//! ReadingParser::parse()
//!        │
//!        ▼
//! SensorStore::upsert() ──▶ RenderSink
//!        ▲
//!        │
//! sweep() every sweep_interval ──▶ RenderSink (changed rows only)
//! ```

pub mod clock;
pub mod duration;
pub mod monitor;
pub mod reading;
pub mod store;
pub mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use monitor::{IngestStats, SensorMonitor};
pub use reading::{IngestError, Reading, ReadingParser};
pub use store::{Alert, SensorRecord, SensorStatus, SensorStore, SensorUpdate};
pub use sweep::{StalenessPolicy, SweepSchedule};
