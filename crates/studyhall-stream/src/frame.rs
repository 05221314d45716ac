use serde_json::Value;

use studyhall_logging::safe_truncate;
use studyhall_types::Citation;

/// Prefix of every frame line
pub const DATA_PREFIX: &str = "data: ";

/// Payload of the terminal frame
pub const DONE_SENTINEL: &str = "[DONE]";

/// A decoded `data: ` frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// `{"token": "..."}`, optionally carrying a citation snapshot
    Token {
        text: String,
        citations: Option<Vec<Citation>>,
    },
    /// `{"citations": [...]}` without a token
    Citations(Vec<Citation>),
    /// `data: [DONE]`
    Done,
    /// Valid JSON of any other shape
    Other(Value),
}

impl Frame {
    /// Decode the payload that follows `data: `
    pub fn decode(payload: &str) -> Result<Frame, serde_json::Error> {
        if payload == DONE_SENTINEL {
            return Ok(Frame::Done);
        }
        let value: Value = serde_json::from_str(payload)?;
        Ok(Self::from_value(value))
    }

    fn from_value(value: Value) -> Frame {
        let token = value.get("token").and_then(Value::as_str).map(str::to_string);
        let citations = value
            .get("citations")
            .and_then(|c| serde_json::from_value::<Vec<Citation>>(c.clone()).ok());

        match (token, citations) {
            (Some(text), citations) => Frame::Token { text, citations },
            (None, Some(citations)) => Frame::Citations(citations),
            (None, None) => Frame::Other(value),
        }
    }
}

/// Longest line held while waiting for its newline
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental line splitter for a streamed response body.
///
/// Bytes after the last newline are held until a later chunk completes the
/// line, which also keeps multi-byte UTF-8 sequences intact across chunk
/// boundaries. A line that grows past the limit is dropped up to its
/// newline.
#[derive(Debug)]
pub struct FrameParser {
    pending: Vec<u8>,
    max_line: usize,
    discarding: bool,
    malformed: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line,
            discarding: false,
            malformed: 0,
        }
    }

    /// Feed one body chunk, returning every frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut chunk = chunk;
        if self.discarding {
            match chunk.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    self.discarding = false;
                    chunk = &chunk[pos + 1..];
                }
                None => return frames,
            }
        }

        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.decode_line(&line[..line.len() - 1], &mut frames);
        }

        if self.pending.len() > self.max_line {
            log::warn!(
                "Frame line longer than {} bytes skipped: {}",
                self.max_line,
                safe_truncate(&String::from_utf8_lossy(&self.pending[..self.pending.len().min(800)]), 200)
            );
            self.pending.clear();
            self.discarding = true;
            self.malformed += 1;
        }
        frames
    }

    /// Flush a final line that was not newline-terminated
    pub fn finish(&mut self) -> Vec<Frame> {
        self.discarding = false;
        let line = std::mem::take(&mut self.pending);
        let mut frames = Vec::new();
        if !line.is_empty() {
            self.decode_line(&line, &mut frames);
        }
        frames
    }

    /// Number of frames dropped because their JSON did not parse or their
    /// line was too long
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    /// Bytes waiting for a newline
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn decode_line(&mut self, line: &[u8], frames: &mut Vec<Frame>) {
        let line = String::from_utf8_lossy(line);
        let line = line.strip_suffix('\r').unwrap_or(&line);

        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return;
        };
        let payload = payload.trim();
        if payload.is_empty() {
            return;
        }

        match Frame::decode(payload) {
            Ok(frame) => frames.push(frame),
            Err(e) => {
                self.malformed += 1;
                log::warn!("Invalid JSON chunk skipped: {} ({})", safe_truncate(payload, 200), e);
            }
        }
    }
}
