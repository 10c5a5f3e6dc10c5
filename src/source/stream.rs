//! Stream-based source.
//!
//! Receives messages from an async byte stream as newline-delimited
//! `<topic> <payload>` frames, the format printed by `mosquitto_sub -v`.
//! This is useful for piping a broker into the monitor over TCP.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, warn};

use super::{ChannelSource, ConnectionState, RawMessage, ReadingSource};

/// Split one `<topic> <payload>` line into a message.
///
/// The topic ends at the first space or tab; everything after it is the
/// payload. Blank lines yield `None`. A line with no separator is a topic
/// with an empty payload, which the parser will reject.
pub fn parse_line(line: &str) -> Option<RawMessage> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    match line.split_once([' ', '\t']) {
        Some((topic, payload)) => Some(RawMessage::new(topic, payload.trim_start())),
        None => Some(RawMessage::new(line, Vec::new())),
    }
}

/// A source that reads message frames from an async stream.
///
/// This source spawns a background task that reads lines from the provided
/// async reader and makes messages available via `poll()`.
///
/// # Example with a byte stream
///
/// ```
/// use std::io::Cursor;
/// use sensorwatch::StreamSource;
///
/// # tokio_test::block_on(async {
/// let data = b"temperature/kitchen {\"value\":21.5}\n";
/// let stream = Cursor::new(data.to_vec());
/// let source = StreamSource::spawn(stream, "example");
/// # });
/// ```
#[derive(Debug)]
pub struct StreamSource {
    inner: ChannelSource,
}

impl StreamSource {
    /// Spawn a background task that reads from the given async reader.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R>(reader: R, description: &str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (handle, inner) = ChannelSource::create(&format!("stream: {}", description), 256);
        let desc = description.to_string();

        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();
            handle.set_connected();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        debug!("Stream {} reached end of input", desc);
                        handle.set_failed("Connection closed");
                        break;
                    }
                    Ok(_) => {
                        let Some(message) = parse_line(&line) else {
                            continue;
                        };
                        if !handle.send(message).await {
                            // Receiver dropped
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Read error on stream {}: {}", desc, e);
                        handle.set_failed(format!("Read error: {}", e));
                        break;
                    }
                }
            }
        });

        Self { inner }
    }
}

impl ReadingSource for StreamSource {
    fn poll(&mut self) -> Option<RawMessage> {
        self.inner.poll()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn error(&self) -> Option<&str> {
        self.inner.error()
    }

    fn connection(&self) -> ConnectionState {
        self.inner.connection()
    }
}
