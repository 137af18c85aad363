//! # doc-analyzer
//!
//! Turn office documents into plain text and ask a local Ollama model about
//! them, streaming the answer back.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Resolve    extension → format, capability check   (extract)
//!  ├─ 2. Extract    txt / xlsx / docx / pptx / doc / ppt   (normalize, spawn_blocking)
//!  ├─ 3. Prompt     per-format system prompt, 1 MiB excerpt rule (prompts, analyze)
//!  ├─ 4. Generate   POST /api/generate, NDJSON frames      (generate, stream)
//!  └─ 5. Assemble   fragments in order until done:true     (stream)
//! ```
//!
//! The model directory (`GET /api/tags`, [`models`]) is a side channel used
//! to pick a model before any of this runs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc_analyzer::{analyze, AnalysisRequest, ExtractorRegistry, ServiceClient, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ExtractorRegistry::detect();
//!     let client = ServiceClient::new(ServiceConfig::default())?;
//!
//!     let model = client
//!         .list_models()
//!         .await
//!         .into_result()?
//!         .into_iter()
//!         .next()
//!         .ok_or("no models installed")?;
//!
//!     let request = AnalysisRequest::new("summarise", model.name);
//!     let analysis = analyze("report.docx", &registry, &client, &request).await?;
//!     println!("{}", analysis.response.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! Extraction never raises: every file yields an [`ExtractionResult`], either
//! text or an [`Unavailable`] reason. Service calls return
//! [`InferenceError`] with a kebab-case `class()`; listing models never fails
//! outright and carries its diagnostic in [`ModelListing`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc-analyzer` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `docx`  | on      | `.docx` extraction via docx-rs (`docx-support`) |
//! | `pptx`  | on      | `.pptx` extraction via zip + quick-xml (`pptx-support`) |
//!
//! `.doc` and `.ppt` need no feature; they are read through `textract` or
//! LibreOffice when one is on `PATH` (`legacy-doc-support`).

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod generate;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_with_observer, Analysis, AnalysisRequest};
pub use client::ServiceClient;
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use document::{Document, DocumentFormat, ExtractionResult};
pub use error::{AnalysisError, InferenceError, Unavailable, UnavailableReason};
pub use extract::{Capabilities, Capability, Extractor, ExtractorRegistry};
pub use generate::{generate, GenerateRequest, GenerationEvent, GenerationStream};
pub use models::{list_models, ModelDescriptor, ModelListing};
pub use normalize::{analyzable_files, inspect, normalize, normalize_from_bytes};
pub use progress::{GenerationObserver, NoopObserver};
pub use stream::{AssembledResponse, GenerationStats, StreamState};
