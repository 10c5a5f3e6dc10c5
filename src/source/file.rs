//! File-based source.
//!
//! Tails a capture file of `<topic> <payload>` lines, such as the output of
//! `mosquitto_sub -v -t 'temperature/#' > capture.log`.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{parse_line, ConnectionState, RawMessage, ReadingSource};

/// A source that follows a growing capture file.
///
/// Each poll reads whatever was appended since the last one. Only complete
/// lines are handed out; a trailing partial line waits for its newline. If
/// the file shrinks (truncated or rotated) reading restarts from the top.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    last_error: Option<String>,
    /// Byte offset of the next unread byte.
    offset: u64,
    partial: Vec<u8>,
    pending: VecDeque<RawMessage>,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            last_error: None,
            offset: 0,
            partial: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    /// Returns the path being followed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read newly appended bytes and queue every complete line.
    fn read_appended(&mut self) {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) => {
                self.last_error = Some(format!("Read error: {}", e));
                return;
            }
        };

        let len = match file.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                self.last_error = Some(format!("Read error: {}", e));
                return;
            }
        };

        if len < self.offset {
            debug!("{} shrank from {} to {} bytes, rereading", self.path.display(), self.offset, len);
            self.offset = 0;
            self.partial.clear();
        }
        if len == self.offset {
            self.last_error = None;
            return;
        }

        let mut appended = Vec::with_capacity((len - self.offset) as usize);
        let read = file
            .seek(SeekFrom::Start(self.offset))
            .and_then(|_| file.take(len - self.offset).read_to_end(&mut appended));
        if let Err(e) = read {
            self.last_error = Some(format!("Read error: {}", e));
            return;
        }

        self.last_error = None;
        self.offset += appended.len() as u64;
        self.partial.extend_from_slice(&appended);

        while let Some(newline) = self.partial.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=newline).collect();
            if let Some(message) = parse_line(&String::from_utf8_lossy(&line)) {
                self.pending.push_back(message);
            }
        }
    }
}

impl ReadingSource for FileSource {
    fn poll(&mut self) -> Option<RawMessage> {
        if self.pending.is_empty() {
            self.read_appended();
        }
        self.pending.pop_front()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn connection(&self) -> ConnectionState {
        if self.last_error.is_some() {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Connected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn drain(source: &mut FileSource) -> Vec<RawMessage> {
        std::iter::from_fn(|| source.poll()).collect()
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/capture.log");
        assert_eq!(source.path(), Path::new("/tmp/capture.log"));
        assert_eq!(source.description(), "file: /tmp/capture.log");
        assert!(source.error().is_none());
    }

    #[test]
    fn test_file_source_reads_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"temperature/kitchen {{"value":21.5}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"temperature/hall {{"value":19}}"#).unwrap();
        file.flush().unwrap();

        let mut source = FileSource::new(file.path());
        let messages = drain(&mut source);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].topic, "temperature/kitchen");
        assert_eq!(messages[1].payload, br#"{"value":19}"#.to_vec());
        assert_eq!(source.connection(), ConnectionState::Connected);

        // Nothing new was written
        assert!(source.poll().is_none());
    }

    #[test]
    fn test_file_source_follows_appends() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"temperature/a {{"value":1}}"#).unwrap();
        write!(file, r#"temperature/b {{"val"#).unwrap();
        file.flush().unwrap();

        let mut source = FileSource::new(file.path());
        let first = drain(&mut source);
        assert_eq!(first.len(), 1);

        writeln!(file, r#"ue":2}}"#).unwrap();
        file.flush().unwrap();

        let second = drain(&mut source);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].topic, "temperature/b");
        assert_eq!(second[0].payload, br#"{"value":2}"#.to_vec());
    }

    #[test]
    fn test_file_source_restarts_after_truncation() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"temperature/a {{"value":1}}"#).unwrap();
        writeln!(file, r#"temperature/b {{"value":2}}"#).unwrap();
        file.flush().unwrap();

        let mut source = FileSource::new(file.path());
        assert_eq!(drain(&mut source).len(), 2);

        file.as_file().set_len(0).unwrap();
        std::fs::write(file.path(), "temperature/c {}\n").unwrap();

        let after = drain(&mut source);
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].topic, "temperature/c");
    }

    #[test]
    fn test_file_source_missing_file() {
        let mut source = FileSource::new("/nonexistent/path/capture.log");

        assert!(source.poll().is_none());
        assert!(source.error().unwrap().contains("Read error"));
        assert_eq!(source.connection(), ConnectionState::Disconnected);
    }
}
