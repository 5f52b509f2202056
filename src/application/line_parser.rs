// Log line parser - Turns the logger's byte stream into feed events
use crate::domain::events::{DataTick, ServerEvent};
use bytes::BytesMut;

pub const DEFAULT_HEADER_MARKER: &str = "rtcDate";

/// Bytes kept while waiting for a line break before the partial line is dropped
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Incremental parser for the comma-separated logger output.
///
/// Lines seen before the first header are only logged. A line containing the
/// header marker (re)defines the columns; every other line is a data line that
/// must have exactly one field per column.
#[derive(Debug)]
pub struct LogLineParser {
    header_marker: String,
    header: Vec<String>,
    header_found: bool,
    buffer: BytesMut,
    /// Prefix of `buffer` already searched for a line break
    scanned: usize,
    /// Set after an over-long line was cut, until its line break shows up
    discarding: bool,
}

impl LogLineParser {
    pub fn new(header_marker: impl Into<String>) -> Self {
        Self {
            header_marker: header_marker.into(),
            header: Vec::new(),
            header_found: false,
            buffer: BytesMut::new(),
            scanned: 0,
            discarding: false,
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Feed a chunk of raw bytes; returns the events produced by every line it completes.
    pub fn push(&mut self, chunk: &[u8], selected: &[String]) -> Vec<ServerEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let raw = self.buffer.split_to(self.scanned + offset + 1);
            self.scanned = 0;
            if self.discarding {
                self.discarding = false;
                continue;
            }
            let line = String::from_utf8_lossy(&raw);
            if let Some(event) = self.process_line(line.trim(), selected) {
                events.push(event);
            }
        }
        self.scanned = self.buffer.len();

        if self.buffer.len() > MAX_LINE_LENGTH {
            tracing::warn!("Discarding {} bytes without a line break", self.buffer.len());
            self.buffer.clear();
            self.scanned = 0;
            self.discarding = true;
        }
        events
    }

    fn process_line(&mut self, line: &str, selected: &[String]) -> Option<ServerEvent> {
        if line.is_empty() {
            return None;
        }

        let is_header = line.contains(self.header_marker.as_str());
        if !self.header_found {
            tracing::info!("Read line: {}", line);
            if !is_header {
                return None;
            }
            self.header_found = true;
        }

        if is_header {
            Some(self.process_header(line))
        } else {
            self.parse_tick(line, selected).map(ServerEvent::SerialData)
        }
    }

    fn process_header(&mut self, line: &str) -> ServerEvent {
        self.header = line.split(',').map(str::to_string).collect();
        tracing::info!("Header updated: {:?}", self.header);
        ServerEvent::HeaderData(self.header.clone())
    }

    fn parse_tick(&self, line: &str, selected: &[String]) -> Option<DataTick> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != self.header.len() {
            tracing::warn!("Data line does not match header format: {}", line);
            return None;
        }

        let mut tick = DataTick::new();
        for (name, field) in self.header.iter().zip(fields) {
            if !selected.contains(name) {
                continue;
            }
            match field.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => {
                    tick.insert(name.clone(), value);
                }
                _ => {
                    tracing::debug!("Skipping non-numeric value {:?} for column {}", field, name);
                }
            }
        }
        Some(tick)
    }
}

impl Default for LogLineParser {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_MARKER)
    }
}
