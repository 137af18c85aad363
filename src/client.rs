//! Shared HTTP client for the inference service.
//!
//! [`ServiceClient`] pairs a [`ServiceConfig`] with one pooled
//! `reqwest::Client`. It is cheap to clone; clones share the pool. The
//! endpoint methods live next to their wire types in
//! [`crate::models`] and [`crate::generate`].

use crate::config::ServiceConfig;
use crate::error::InferenceError;
use std::error::Error as StdError;
use std::time::Duration;

/// Bodies of error responses are cut to this many bytes in diagnostics.
pub(crate) const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct ServiceClient {
    config: ServiceConfig,
    http: reqwest::Client,
}

impl ServiceClient {
    pub fn new(config: ServiceConfig) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("doc-analyzer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| InferenceError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Same pool, different endpoint.
    pub fn with_config(&self, config: ServiceConfig) -> Self {
        Self {
            config,
            http: self.http.clone(),
        }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

/// Map a transport failure that happened before any status line arrived.
pub(crate) fn classify_send_error(url: &str, budget: Duration, e: reqwest::Error) -> InferenceError {
    if e.is_timeout() {
        InferenceError::Timeout {
            url: url.to_string(),
            budget_ms: budget.as_millis() as u64,
        }
    } else if e.is_builder() {
        InferenceError::InvalidConfig(format!("request to {url}: {}", error_chain(&e)))
    } else {
        // Connect errors, resets and protocol errors all mean no usable service.
        InferenceError::ServiceUnreachable {
            url: url.to_string(),
            detail: error_chain(&e),
        }
    }
}

/// Read an error response body for diagnostics, cut to [`MAX_ERROR_BODY`].
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) => truncate(body.trim(), MAX_ERROR_BODY),
        Err(e) => format!("<unreadable body: {e}>"),
    }
}

/// `outer: cause: root cause`, so hyper/io details survive into the message.
pub(crate) fn error_chain(e: &dyn StdError) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}
