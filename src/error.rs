//! Error types for the doc-analyzer library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * **Per-file** [`Unavailable`]: one document could not be turned into
//!   text (unknown extension, missing optional capability, unreadable or
//!   undecodable bytes). It is a value inside
//!   [`crate::document::ExtractionResult`], never a panic or a propagated
//!   error, so one bad file never aborts a batch.
//!
//! * **Per-call** [`InferenceError`]: a request to the inference service
//!   failed (unreachable, timed out, bad status, broken stream). Terminal for
//!   that call only; the caller decides whether to retry, switch endpoint, or
//!   abort.
//!
//! Both carry a short kebab-case diagnostic class (`reason()` / `class()`) for
//! programmatic matching and a multi-line `Display` for humans.

use crate::document::DocumentFormat;
use crate::extract::Capability;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a document produced no text.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unavailable {
    /// The extension is not one of txt, xlsx, docx, doc, pptx, ppt.
    #[error("Unsupported file format: '{path}'\nSupported extensions: txt, xlsx, docx, doc, pptx, ppt.")]
    UnsupportedFormat {
        path: PathBuf,
        extension: Option<String>,
    },

    /// The strategy for this format needs a capability that was not resolved
    /// at startup.
    #[error("Cannot read {format} files: {capability} is not available.\n{hint}", hint = .capability.install_hint())]
    MissingCapability {
        format: DocumentFormat,
        capability: Capability,
    },

    /// File missing, unreadable, or the extractor failed internally.
    #[error("Failed to read '{path}': {detail}")]
    ReadError { path: PathBuf, detail: String },

    /// Bytes were read but are not valid text / a valid container.
    #[error("Failed to decode '{path}': {detail}")]
    DecodeError { path: PathBuf, detail: String },
}

/// The diagnostic class of an [`Unavailable`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnavailableReason {
    MissingCapability,
    ReadError,
    UnsupportedFormat,
    DecodeError,
}

impl Unavailable {
    pub fn reason(&self) -> UnavailableReason {
        match self {
            Unavailable::UnsupportedFormat { .. } => UnavailableReason::UnsupportedFormat,
            Unavailable::MissingCapability { .. } => UnavailableReason::MissingCapability,
            Unavailable::ReadError { .. } => UnavailableReason::ReadError,
            Unavailable::DecodeError { .. } => UnavailableReason::DecodeError,
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, detail: impl fmt::Display) -> Self {
        Unavailable::ReadError {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, detail: impl fmt::Display) -> Self {
        Unavailable::DecodeError {
            path: path.into(),
            detail: detail.to_string(),
        }
    }
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnavailableReason::MissingCapability => "missing-capability",
            UnavailableReason::ReadError => "read-error",
            UnavailableReason::UnsupportedFormat => "unsupported-format",
            UnavailableReason::DecodeError => "decode-error",
        })
    }
}

/// All errors returned by the inference service clients.
#[derive(Debug, Error)]
pub enum InferenceError {
    // ── Connection ────────────────────────────────────────────────────────
    /// TCP connection could not be established.
    #[error(
        "Cannot connect to the inference service at {url}: {detail}\n\
Check that:\n  \
  1. Ollama is running (ollama serve)\n  \
  2. it listens on the configured address (--host / --port)"
    )]
    ServiceUnreachable { url: String, detail: String },

    /// The whole exchange did not finish inside its budget.
    #[error("Request to {url} timed out after {budget_ms}ms\nThe model may still be loading, or the machine is short on resources.")]
    Timeout { url: String, budget_ms: u64 },

    // ── Status ────────────────────────────────────────────────────────────
    /// The generate endpoint answered 404 for the requested model.
    #[error("Model '{model}' is not installed.\nInstall it with: ollama pull {model}")]
    ModelNotFound { model: String },

    /// Any other non-2xx status.
    #[error("Inference service returned HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    // ── Payload ───────────────────────────────────────────────────────────
    /// A non-streamed response body was not the expected JSON document.
    #[error("Could not parse the inference service response: {detail}")]
    MalformedResponse { detail: String },

    /// A streamed frame could not be decoded, or the stream ended without a
    /// completion frame. Any partial text was discarded.
    #[error("Streamed response broke after {frames} frame(s): {detail}")]
    StreamDecode { frames: usize, detail: String },

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl InferenceError {
    /// Kebab-case diagnostic class, stable for matching and logs.
    pub fn class(&self) -> &'static str {
        match self {
            InferenceError::ServiceUnreachable { .. } => "service-unreachable",
            InferenceError::Timeout { .. } => "timeout",
            InferenceError::ModelNotFound { .. } => "model-not-found",
            InferenceError::HttpError { .. } => "http-error",
            InferenceError::MalformedResponse { .. } => "malformed-response",
            InferenceError::StreamDecode { .. } => "stream-decode-error",
            InferenceError::InvalidConfig(_) => "invalid-config",
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            InferenceError::HttpError { status, .. } => Some(*status),
            InferenceError::ModelNotFound { .. } => Some(404),
            _ => None,
        }
    }
}

/// Failure of one analysis run: either the file or the model call failed.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Extraction(#[from] Unavailable),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}
