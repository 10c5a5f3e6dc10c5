//! Transport abstraction for receiving raw sensor messages.
//!
//! This module provides a trait-based abstraction over the places readings
//! come from (a message bus subscription, a TCP line stream, a capture file,
//! a simulator). Every source hands out [`RawMessage`]s without blocking and
//! reports its connection state; decoding is left to the monitor.

mod channel;
mod file;
mod simulate;
mod stream;

pub use channel::{ChannelSource, SourceHandle};
pub use file::FileSource;
pub use simulate::Simulator;
pub use stream::{parse_line, StreamSource};

use std::fmt::{self, Debug};

/// A message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl RawMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Connection state reported by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
        };
        f.write_str(label)
    }
}

/// Connection state plus the last error a source reported, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStatus {
    pub state: ConnectionState,
    pub error: Option<String>,
}

impl SourceStatus {
    pub fn connected() -> Self {
        Self {
            state: ConnectionState::Connected,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            error: Some(error.into()),
        }
    }
}

/// Trait for receiving raw sensor messages from various transports.
///
/// # Example
///
/// ```
/// use sensorwatch::{ChannelSource, ReadingSource};
///
/// let (handle, mut source) = ChannelSource::create("example", 16);
/// handle.publish("temperature/kitchen", r#"{"value":21.5}"#).unwrap();
///
/// let message = source.poll().unwrap();
/// assert_eq!(message.topic, "temperature/kitchen");
/// ```
pub trait ReadingSource: Send + Debug {
    /// Take the next pending message, if any.
    ///
    /// This method must not block.
    fn poll(&mut self) -> Option<RawMessage>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;

    /// The last error the source reported, if it is currently failing.
    fn error(&self) -> Option<&str>;

    /// Current connection state.
    fn connection(&self) -> ConnectionState;
}
