//! Brace-delimited frame reader for the analyzer's watch-mode output.
//!
//! In `--outputjson --watch` mode the analyzer prints one pretty-printed JSON
//! report per analysis pass. Each report starts with a line holding only `{`
//! and ends with a line holding only `}`; reports are separated by blank
//! lines. [`FrameReader`] reassembles those reports under a per-line deadline.

use std::io;
use std::mem;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::time::timeout;

/// Maximum frame size (64 MiB) to prevent unbounded memory allocation.
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Longest slice of an offending line echoed back in an error.
const ERROR_EXCERPT_CHARS: usize = 120;

const FRAME_OPEN: &str = "{";
const FRAME_CLOSE: &str = "}";

/// A fatal protocol error on the analyzer's output stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame opened while another frame was still open")]
    NestedOpen,
    #[error("unexpected line outside a frame: {0:?}")]
    UnexpectedLine(String),
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("frame exceeds maximum size of {MAX_FRAME_BYTES} bytes")]
    Oversized,
    #[error("analyzer closed its output stream")]
    StreamClosed,
    #[error("reading analyzer output: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    /// Whether the error means the process is gone, as opposed to the
    /// process misbehaving.
    #[must_use]
    pub fn is_stream_closed(&self) -> bool {
        matches!(self, Self::StreamClosed)
    }
}

/// A drain that ended on a [`FrameError`].
///
/// Frames completed earlier in the same drain are handed back so the caller
/// can still merge them.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct DrainError {
    pub frames: Vec<serde_json::Value>,
    pub source: FrameError,
}

/// Reads brace-delimited JSON frames from an async reader.
///
/// The reader is stateful: a partially read line and a partially accumulated
/// frame both survive a timed-out [`drain`](Self::drain) and are completed by
/// the next one.
pub struct FrameReader<R> {
    reader: BufReader<R>,
    /// Bytes of the current line read so far (no terminator yet).
    partial_line: Vec<u8>,
    /// Text of the currently open frame, if any.
    open_frame: Option<String>,
    /// Cap on an open frame plus the line being read into it.
    max_frame_bytes: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, MAX_FRAME_BYTES)
    }

    fn with_limit(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            partial_line: Vec::new(),
            open_frame: None,
            max_frame_bytes,
        }
    }

    /// Whether a frame has been opened but not yet closed.
    #[must_use]
    pub fn has_open_frame(&self) -> bool {
        self.open_frame.is_some()
    }

    /// Read lines until the stream stays quiet for `per_line`, returning
    /// every frame completed along the way.
    ///
    /// A quiet stream is the normal end of a drain. EOF and framing
    /// violations end it with a [`DrainError`].
    pub async fn drain(
        &mut self,
        per_line: Duration,
    ) -> Result<Vec<serde_json::Value>, DrainError> {
        let mut frames = Vec::new();
        loop {
            let line = match timeout(per_line, self.next_line()).await {
                Err(_elapsed) => return Ok(frames),
                Ok(Ok(line)) => line,
                Ok(Err(source)) => return Err(DrainError { frames, source }),
            };

            match self.accept_line(&line) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => {}
                Err(source) => return Err(DrainError { frames, source }),
            }
        }
    }

    /// Read one line, without its terminator.
    ///
    /// `read_until` appends into `partial_line`, so a read cancelled by the
    /// deadline loses nothing. Reads are capped at one byte past the frame
    /// budget, so a line that never ends cannot grow the buffer unbounded.
    async fn next_line(&mut self) -> Result<String, FrameError> {
        let budget = self
            .max_frame_bytes
            .saturating_sub(self.buffered_bytes())
            .saturating_add(1);
        let bytes_read = (&mut self.reader)
            .take(budget as u64)
            .read_until(b'\n', &mut self.partial_line)
            .await?;

        if self.buffered_bytes() > self.max_frame_bytes {
            self.partial_line.clear();
            self.open_frame = None;
            return Err(FrameError::Oversized);
        }

        if bytes_read == 0 && self.partial_line.is_empty() {
            return Err(FrameError::StreamClosed);
        }

        let raw = mem::take(&mut self.partial_line);
        let mut line = String::from_utf8_lossy(&raw).into_owned();
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    /// Bytes held for the open frame and the unfinished line.
    fn buffered_bytes(&self) -> usize {
        self.open_frame.as_ref().map_or(0, String::len) + self.partial_line.len()
    }

    /// Feed one line into the frame state machine.
    ///
    /// Returns the parsed frame when `line` closes one.
    fn accept_line(&mut self, line: &str) -> Result<Option<serde_json::Value>, FrameError> {
        let marker = line.trim_end();

        let Some(buffer) = self.open_frame.as_mut() else {
            if marker.is_empty() {
                return Ok(None);
            }
            if marker == FRAME_OPEN {
                self.open_frame = Some(format!("{FRAME_OPEN}\n"));
                return Ok(None);
            }
            return Err(FrameError::UnexpectedLine(excerpt(line)));
        };

        if marker == FRAME_OPEN {
            self.open_frame = None;
            return Err(FrameError::NestedOpen);
        }

        buffer.push_str(line);
        buffer.push('\n');

        if buffer.len() > self.max_frame_bytes {
            self.open_frame = None;
            return Err(FrameError::Oversized);
        }

        if marker != FRAME_CLOSE {
            return Ok(None);
        }

        let text = self.open_frame.take().unwrap_or_default();
        serde_json::from_str(&text)
            .map(Some)
            .map_err(FrameError::InvalidJson)
    }
}

fn excerpt(line: &str) -> String {
    if line.chars().count() <= ERROR_EXCERPT_CHARS {
        return line.to_string();
    }
    let mut out: String = line.chars().take(ERROR_EXCERPT_CHARS).collect();
    out.push('…');
    out
}
