//! Channel-based source.
//!
//! Receives raw messages via a tokio mpsc channel and connection status via
//! a watch channel. The other sources (streams, the simulator, the message
//! bus subscriber) are built on top of it: they push into a
//! [`SourceHandle`] from a background task and the UI polls the
//! [`ChannelSource`].

use tokio::sync::{mpsc, watch};

use super::{ConnectionState, RawMessage, ReadingSource, SourceStatus};

/// Producer side of a [`ChannelSource`].
#[derive(Debug, Clone)]
pub struct SourceHandle {
    messages: mpsc::Sender<RawMessage>,
    status: watch::Sender<SourceStatus>,
}

impl SourceHandle {
    /// Queue a message without waiting; fails if the queue is full or closed.
    pub fn publish(
        &self,
        topic: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Result<(), mpsc::error::TrySendError<RawMessage>> {
        self.messages.try_send(RawMessage::new(topic, payload))
    }

    /// Queue a message, waiting for room. Returns `false` once the source is dropped.
    pub async fn send(&self, message: RawMessage) -> bool {
        self.messages.send(message).await.is_ok()
    }

    /// Queue a message from a non-async thread, waiting for room.
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_send(&self, message: RawMessage) -> bool {
        self.messages.blocking_send(message).is_ok()
    }

    pub fn set_status(&self, status: SourceStatus) {
        self.status.send_replace(status);
    }

    pub fn set_connected(&self) {
        self.set_status(SourceStatus::connected());
    }

    pub fn set_failed(&self, error: impl Into<String>) {
        self.set_status(SourceStatus::failed(error));
    }

    /// Whether the consuming [`ChannelSource`] has been dropped.
    pub fn is_closed(&self) -> bool {
        self.messages.is_closed()
    }
}

/// A source that receives messages pushed through a [`SourceHandle`].
///
/// # Example
///
/// ```
/// use sensorwatch::{ChannelSource, ConnectionState, ReadingSource};
///
/// let (handle, mut source) = ChannelSource::create("rabbitmq://localhost", 64);
/// handle.set_connected();
///
/// // Status changes are picked up on the next poll.
/// assert!(source.poll().is_none());
/// assert_eq!(source.connection(), ConnectionState::Connected);
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<RawMessage>,
    status_rx: watch::Receiver<SourceStatus>,
    /// Last status seen on `status_rx`, refreshed on every poll.
    status: SourceStatus,
    description: String,
    producer_gone: bool,
}

impl ChannelSource {
    /// Create a handle/source pair with room for `capacity` queued messages.
    pub fn create(source_description: &str, capacity: usize) -> (SourceHandle, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (status_tx, status_rx) = watch::channel(SourceStatus::default());

        let handle = SourceHandle {
            messages: tx,
            status: status_tx,
        };
        let source = Self {
            receiver: rx,
            status_rx,
            status: SourceStatus::default(),
            description: source_description.to_string(),
            producer_gone: false,
        };
        (handle, source)
    }

    fn refresh_status(&mut self) {
        match self.status_rx.has_changed() {
            Ok(true) => self.status = self.status_rx.borrow_and_update().clone(),
            Ok(false) => {}
            // Producer dropped: keep its final status, read once.
            Err(_) if !self.producer_gone => {
                self.producer_gone = true;
                self.status = self.status_rx.borrow().clone();
            }
            Err(_) => {}
        }
    }
}

impl ReadingSource for ChannelSource {
    fn poll(&mut self) -> Option<RawMessage> {
        self.refresh_status();

        match self.receiver.try_recv() {
            Ok(message) => Some(message),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                if self.status.state != ConnectionState::Disconnected {
                    self.status = SourceStatus::failed("Source closed");
                }
                None
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        self.status.error.as_deref()
    }

    fn connection(&self) -> ConnectionState {
        self.status.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_source_poll() {
        let (handle, mut source) = ChannelSource::create("test", 8);

        assert!(source.poll().is_none());

        handle.publish("temperature/kitchen", "{}").unwrap();
        handle.publish("temperature/hall", "{}").unwrap();

        assert_eq!(source.poll().unwrap().topic, "temperature/kitchen");
        assert_eq!(source.poll().unwrap().topic, "temperature/hall");
        assert!(source.poll().is_none());
    }

    #[test]
    fn test_channel_source_status() {
        let (handle, mut source) = ChannelSource::create("test", 8);
        assert_eq!(source.connection(), ConnectionState::Connecting);

        handle.set_connected();
        source.poll();
        assert_eq!(source.connection(), ConnectionState::Connected);
        assert!(source.error().is_none());

        handle.set_failed("broker unreachable");
        source.poll();
        assert_eq!(source.connection(), ConnectionState::Disconnected);
        assert_eq!(source.error(), Some("broker unreachable"));
    }

    #[test]
    fn test_channel_source_detects_closed_handle() {
        let (handle, mut source) = ChannelSource::create("test", 8);
        handle.set_connected();
        drop(handle);

        assert!(source.poll().is_none());
        assert_eq!(source.connection(), ConnectionState::Disconnected);
        assert_eq!(source.error(), Some("Source closed"));
    }

    #[test]
    fn test_publish_fails_when_full() {
        let (handle, _source) = ChannelSource::create("test", 1);
        handle.publish("a/b", "{}").unwrap();
        assert!(handle.publish("a/c", "{}").is_err());
    }
}
