//! Streaming inference client: one prompt in, one assembled answer out.
//!
//! `POST {base}/api/generate` with `stream: true`; the body is consumed as
//! NDJSON frames through [`FrameDecoder`] and [`ResponseAssembler`]. One
//! timeout budget ([`ServiceConfig::generate_timeout`]) covers the whole
//! exchange, connect through completion frame.
//!
//! Failure classes, checked in this order:
//!
//! | Class | When |
//! |-------|------|
//! | `service-unreachable` | no connection |
//! | `timeout` | budget exhausted at any point |
//! | `model-not-found` | HTTP 404 |
//! | `http-error` | any other non-2xx |
//! | `stream-decode-error` | bad frame, body broke, or closed before `done` |
//!
//! The connection belongs to one call and is dropped on every exit path.

use crate::client::{classify_send_error, error_body, error_chain, ServiceClient};
use crate::config::ServiceConfig;
use crate::error::InferenceError;
use crate::progress::{GenerationObserver, NoopObserver};
use crate::stream::{FrameDecoder, ResponseAssembler, MAX_FRAME_BYTES};
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

pub use crate::stream::{AssembledResponse, GenerationStats};

pub(crate) const GENERATE_PATH: &str = "/api/generate";

/// Body of a generate request. `stream` is always `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    stream: bool,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            stream: true,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

impl ServiceClient {
    /// Send `request` and wait for the assembled answer.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<AssembledResponse, InferenceError> {
        self.generate_with_observer(request, &NoopObserver).await
    }

    /// Like [`ServiceClient::generate`], reporting each fragment as it lands.
    pub async fn generate_with_observer(
        &self,
        request: &GenerateRequest,
        observer: &dyn GenerationObserver,
    ) -> Result<AssembledResponse, InferenceError> {
        let url = self.config().endpoint(GENERATE_PATH);
        let budget = self.config().generate_timeout();
        let start = Instant::now();
        info!(
            "Starting generation: model={} prompt={} chars",
            request.model,
            request.prompt.chars().count()
        );
        observer.on_generation_start(&request.model);

        let mut assembler = ResponseAssembler::new(&request.model);
        let exchange = self.exchange(&url, budget, request, &mut assembler, observer);
        let outcome = tokio::time::timeout(budget, exchange).await;

        let result = match outcome {
            Ok(Ok(())) => assembler.finish(),
            Ok(Err(e)) => Err(assembler.fail(e)),
            Err(_) => Err(assembler.fail(InferenceError::Timeout {
                url: url.clone(),
                budget_ms: budget.as_millis() as u64,
            })),
        };

        match &result {
            Ok(response) => {
                info!(
                    "Generation complete: {} frames, {} chars, {}ms",
                    response.frames,
                    response.text.chars().count(),
                    start.elapsed().as_millis()
                );
                observer.on_generation_complete(response);
            }
            Err(e) => {
                warn!("Generation failed ({}): {}", e.class(), url);
                observer.on_generation_error(e);
            }
        }
        result
    }

    async fn exchange(
        &self,
        url: &str,
        budget: Duration,
        request: &GenerateRequest,
        assembler: &mut ResponseAssembler,
        observer: &dyn GenerationObserver,
    ) -> Result<(), InferenceError> {
        let body = serde_json::to_vec(request)
            .map_err(|e| InferenceError::InvalidConfig(format!("request body: {e}")))?;

        assembler.connecting();
        let response = self
            .http()
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/x-ndjson")
            .timeout(budget)
            .body(body)
            .send()
            .await
            .map_err(|e| classify_send_error(url, budget, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let body = error_body(response).await;
            debug!("404 from {}: {}", url, body);
            return Err(InferenceError::ModelNotFound {
                model: request.model.clone(),
            });
        }
        if !status.is_success() {
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        assembler.streaming();
        let mut decoder = FrameDecoder::new();
        let mut chunks = response.bytes_stream();

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout {
                        url: url.to_string(),
                        budget_ms: budget.as_millis() as u64,
                    }
                } else {
                    InferenceError::StreamDecode {
                        frames: assembler.frames(),
                        detail: format!("response body failed: {}", error_chain(&e)),
                    }
                }
            })?;
            decoder.push(&chunk);

            while let Some(line) = decoder.next_frame() {
                if apply(assembler, &line, observer)? {
                    return Ok(());
                }
            }
            if decoder.is_overlong() {
                return Err(InferenceError::StreamDecode {
                    frames: assembler.frames(),
                    detail: format!(
                        "frame exceeds {} bytes without a newline",
                        MAX_FRAME_BYTES
                    ),
                });
            }
        }

        // Body ended. A last frame may lack its newline.
        if let Some(line) = decoder.finish() {
            apply(assembler, &line, observer)?;
        }
        Ok(())
    }

    /// The same exchange as a [`Stream`] of events.
    ///
    /// The request runs on a spawned task; dropping the stream aborts it and
    /// closes the connection.
    pub fn generate_stream(&self, request: GenerateRequest) -> GenerationStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.clone();
        let task = tokio::spawn(async move {
            let observer = ChannelObserver { tx: tx.clone() };
            let event = match client.generate_with_observer(&request, &observer).await {
                Ok(response) => GenerationEvent::Completed(response),
                Err(e) => GenerationEvent::Failed(e),
            };
            let _ = tx.send(event);
        });
        GenerationStream {
            events: UnboundedReceiverStream::new(rx),
            task,
        }
    }
}

/// Returns `true` once the completion frame has been applied.
fn apply(
    assembler: &mut ResponseAssembler,
    line: &[u8],
    observer: &dyn GenerationObserver,
) -> Result<bool, InferenceError> {
    let applied = assembler.feed(line)?;
    if !applied.fragment.is_empty() {
        observer.on_fragment(&applied.fragment);
    }
    Ok(applied.done)
}

/// One-shot generation with a fresh client.
pub async fn generate(
    config: &ServiceConfig,
    request: &GenerateRequest,
) -> Result<AssembledResponse, InferenceError> {
    ServiceClient::new(config.clone())?.generate(request).await
}

/// Event yielded by [`GenerationStream`]. The last item is always exactly one
/// `Completed` or `Failed`.
#[derive(Debug)]
pub enum GenerationEvent {
    Fragment(String),
    Completed(AssembledResponse),
    Failed(InferenceError),
}

impl GenerationEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GenerationEvent::Fragment(_))
    }
}

/// Stream returned by [`ServiceClient::generate_stream`].
pub struct GenerationStream {
    events: UnboundedReceiverStream<GenerationEvent>,
    task: JoinHandle<()>,
}

impl Stream for GenerationStream {
    type Item = GenerationEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for GenerationStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct ChannelObserver {
    tx: mpsc::UnboundedSender<GenerationEvent>,
}

impl GenerationObserver for ChannelObserver {
    fn on_fragment(&self, fragment: &str) {
        let _ = self.tx.send(GenerationEvent::Fragment(fragment.to_string()));
    }
}
