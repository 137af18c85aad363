//! Analysis orchestrator: file → text → prompt → model answer.
//!
//! Thin glue over [`crate::normalize`], [`crate::prompts`] and
//! [`ServiceClient::generate_with_observer`]. It owns the prompt-sizing policy
//! (large files are sent as an excerpt) and the choice of system prompt.

use crate::client::ServiceClient;
use crate::document::Document;
use crate::error::{AnalysisError, InferenceError, Unavailable};
use crate::extract::ExtractorRegistry;
use crate::generate::{AssembledResponse, GenerateRequest};
use crate::normalize::{inspect, normalize};
use crate::progress::{GenerationObserver, NoopObserver};
use crate::prompts::{build_prompt, system_prompt_for};
use std::path::Path;
use tracing::{info, warn};

/// What to do with a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Operation in imperative form, e.g. "summarise" or "extract the key points of".
    pub task: String,
    pub model: String,
    /// Overrides the per-format system prompt.
    pub system_prompt: Option<String>,
}

impl AnalysisRequest {
    pub fn new(task: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            model: model.into(),
            system_prompt: None,
        }
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// One completed analysis.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub document: Document,
    /// Only an excerpt of the content was sent.
    pub truncated: bool,
    pub response: AssembledResponse,
}

/// Analyze one file and wait for the full answer.
pub async fn analyze(
    path: impl AsRef<Path>,
    registry: &ExtractorRegistry,
    client: &ServiceClient,
    request: &AnalysisRequest,
) -> Result<Analysis, AnalysisError> {
    analyze_with_observer(path, registry, client, request, &NoopObserver).await
}

/// Analyze one file, reporting answer fragments as they arrive.
pub async fn analyze_with_observer(
    path: impl AsRef<Path>,
    registry: &ExtractorRegistry,
    client: &ServiceClient,
    request: &AnalysisRequest,
    observer: &dyn GenerationObserver,
) -> Result<Analysis, AnalysisError> {
    let path = path.as_ref();
    info!("Starting analysis: {} ({})", path.display(), request.task);

    let (document, truncated, generate) = prepare(path, registry, request).await?;
    let response = client.generate_with_observer(&generate, observer).await?;

    info!(
        "Analysis complete: {} ({} chars of answer)",
        path.display(),
        response.text.chars().count()
    );
    Ok(Analysis {
        document,
        truncated,
        response,
    })
}

/// Normalize `path` and build the generate request for it.
pub async fn prepare(
    path: &Path,
    registry: &ExtractorRegistry,
    request: &AnalysisRequest,
) -> Result<(Document, bool, GenerateRequest), AnalysisError> {
    if request.model.trim().is_empty() {
        return Err(InferenceError::InvalidConfig("no model selected".into()).into());
    }

    let text = normalize(path, registry).await.into_result()?;
    if text.trim().is_empty() {
        warn!("{} has no text content; skipping", path.display());
        return Err(Unavailable::read(path, "no text content").into());
    }
    let document = inspect(path).await?;

    let prompt = build_prompt(&request.task, &text, document.size_bytes);
    if prompt.truncated {
        warn!(
            "{} is larger than 1 MiB ({} bytes); sending an excerpt",
            path.display(),
            document.size_bytes
        );
    }

    let system = request
        .system_prompt
        .clone()
        .unwrap_or_else(|| system_prompt_for(document.format).to_string());
    let generate = GenerateRequest::new(&request.model, prompt.text).system(system);
    Ok((document, prompt.truncated, generate))
}
