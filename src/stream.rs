//! Newline-delimited JSON stream consumption for `/api/generate`.
//!
//! Two pieces, both I/O-free so they can be driven byte by byte in tests:
//!
//! * [`FrameDecoder`] splits an arbitrary chunking of the body into complete
//!   lines. A frame may arrive split across many chunks, and one chunk may
//!   carry many frames.
//! * [`ResponseAssembler`] applies decoded frames in arrival order and owns
//!   the request state machine:
//!
//! ```text
//! Idle ──▶ Connecting ──▶ Streaming ──done:true──▶ Completed
//!              │              │
//!              └──────────────┴──any failure────▶ Failed
//! ```
//!
//! `Completed` is reachable only through a parsed frame with `done: true`.
//! Connection close without one is a failure. Every failure discards the text
//! accumulated so far, so a caller sees a full answer or none.

use crate::error::InferenceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Longest unterminated line [`FrameDecoder`] will hold.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into non-blank lines.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    /// Bytes of `buf` already known to contain no `\n`.
    scanned: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line, without its `\n` / `\r\n`. Blank lines are skipped.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            let pos = self.buf[self.scanned..].iter().position(|&b| b == b'\n');
            let Some(pos) = pos else {
                self.scanned = self.buf.len();
                return None;
            };
            let end = self.scanned + pos;
            let mut line: Vec<u8> = self.buf.drain(..=end).collect();
            self.scanned = 0;
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !is_blank(&line) {
                return Some(line);
            }
        }
    }

    /// Whatever is left once the body has ended: a final frame that was not
    /// newline-terminated, or `None` if only whitespace remains.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        self.scanned = 0;
        let rest = std::mem::take(&mut self.buf);
        (!is_blank(&rest)).then_some(rest)
    }

    /// Bytes buffered but not yet returned as a frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// The partial line has grown past [`MAX_FRAME_BYTES`]. Only meaningful
    /// once [`next_frame`](Self::next_frame) has returned `None`.
    pub fn is_overlong(&self) -> bool {
        self.buf.len() > MAX_FRAME_BYTES
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

/// One decoded frame. Only `response` and `done` drive assembly; the rest is
/// bookkeeping the service attaches to the final frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamFrame {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
    /// Nanoseconds.
    #[serde(default)]
    pub total_duration: Option<u64>,
    /// Set when the service aborts generation mid-stream.
    #[serde(default)]
    pub error: Option<String>,
}

impl StreamFrame {
    /// Parse one line. It must be a JSON object.
    pub fn parse(line: &[u8]) -> Result<Self, String> {
        let value: serde_json::Value = serde_json::from_slice(line).map_err(|e| e.to_string())?;
        if !value.is_object() {
            return Err(format!("expected a JSON object, got {}", json_kind(&value)));
        }
        serde_json::from_value(value).map_err(|e| e.to_string())
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Statistics from the completing frame, when the service provides them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_duration_ms: Option<u64>,
    pub done_reason: Option<String>,
}

impl From<&StreamFrame> for GenerationStats {
    fn from(frame: &StreamFrame) -> Self {
        Self {
            prompt_tokens: frame.prompt_eval_count,
            completion_tokens: frame.eval_count,
            total_duration_ms: frame.total_duration.map(|ns| ns / 1_000_000),
            done_reason: frame.done_reason.clone(),
        }
    }
}

/// The complete answer to one generate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledResponse {
    /// In-order concatenation of every fragment up to and including the
    /// completing frame.
    pub text: String,
    /// Model that was asked (or the one the service reported, if it did).
    pub model: String,
    /// Frames applied, including the completing one.
    pub frames: usize,
    pub stats: GenerationStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Failed,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamState::Idle => "idle",
            StreamState::Connecting => "connecting",
            StreamState::Streaming => "streaming",
            StreamState::Completed => "completed",
            StreamState::Failed => "failed",
        })
    }
}

/// What applying one frame did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Text appended by this frame (possibly empty).
    pub fragment: String,
    /// The frame completed the response; stop reading.
    pub done: bool,
}

/// Owns the running assembly and the state of one request.
#[derive(Debug)]
pub struct ResponseAssembler {
    model: String,
    state: StreamState,
    text: String,
    frames: usize,
    stats: GenerationStats,
}

impl ResponseAssembler {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            state: StreamState::Idle,
            text: String::new(),
            frames: 0,
            stats: GenerationStats::default(),
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Frames applied so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn connecting(&mut self) {
        self.transition(StreamState::Idle, StreamState::Connecting);
    }

    /// Status was validated; frames may now be fed.
    pub fn streaming(&mut self) {
        self.transition(StreamState::Connecting, StreamState::Streaming);
    }

    fn transition(&mut self, from: StreamState, to: StreamState) {
        if self.state == from {
            debug!("Stream {} -> {}", from, to);
            self.state = to;
        }
    }

    /// Apply one line. A parse failure moves to `Failed` and discards the
    /// text; frames after completion are ignored.
    pub fn feed(&mut self, line: &[u8]) -> Result<Applied, InferenceError> {
        match self.state {
            StreamState::Streaming => {}
            StreamState::Completed => {
                return Ok(Applied {
                    fragment: String::new(),
                    done: true,
                })
            }
            other => {
                return Err(self.fail(InferenceError::StreamDecode {
                    frames: self.frames,
                    detail: format!("frame received while {other}"),
                }))
            }
        }

        let frame = match StreamFrame::parse(line) {
            Ok(frame) => frame,
            Err(detail) => {
                let preview = String::from_utf8_lossy(&line[..line.len().min(80)]).into_owned();
                return Err(self.fail(InferenceError::StreamDecode {
                    frames: self.frames,
                    detail: format!("{detail} (frame: {preview:?})"),
                }));
            }
        };

        if let Some(message) = frame.error.as_deref() {
            return Err(self.fail(InferenceError::StreamDecode {
                frames: self.frames,
                detail: format!("service reported: {message}"),
            }));
        }

        self.frames += 1;
        self.text.push_str(&frame.response);

        if frame.done {
            self.stats = GenerationStats::from(&frame);
            if let Some(model) = frame.model {
                self.model = model;
            }
            self.transition(StreamState::Streaming, StreamState::Completed);
        }

        Ok(Applied {
            fragment: frame.response,
            done: frame.done,
        })
    }

    /// Move to `Failed`, drop the partial text, and hand the error back.
    pub fn fail(&mut self, error: InferenceError) -> InferenceError {
        if self.state != StreamState::Failed {
            debug!("Stream {} -> failed after {} frame(s)", self.state, self.frames);
        }
        self.state = StreamState::Failed;
        self.text.clear();
        error
    }

    /// The assembled answer, or `StreamDecode` if no completion frame was seen.
    pub fn finish(mut self) -> Result<AssembledResponse, InferenceError> {
        match self.state {
            StreamState::Completed => Ok(AssembledResponse {
                text: self.text,
                model: self.model,
                frames: self.frames,
                stats: self.stats,
            }),
            StreamState::Failed => Err(InferenceError::StreamDecode {
                frames: self.frames,
                detail: "stream already failed".into(),
            }),
            _ => {
                let frames = self.frames;
                Err(self.fail(InferenceError::StreamDecode {
                    frames,
                    detail: "stream closed before a completion frame".into(),
                }))
            }
        }
    }
}
