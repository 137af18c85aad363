//! Inference service configuration.
//!
//! Both clients ([`crate::models::list_models`] and
//! [`crate::generate::generate`]) take the same [`ServiceConfig`]. A config is
//! a value: pointing at another port means building a new one with
//! [`ServiceConfig::with_port`], never mutating a shared global.

use crate::error::InferenceError;
use reqwest::Url;
use std::time::Duration;

/// Default Ollama address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default bounded wait for the model directory request.
pub const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default budget for one whole generate exchange, first byte to last frame.
pub const DEFAULT_GENERATE_TIMEOUT: Duration = Duration::from_secs(300);

/// Where the inference service lives and how long to wait for it.
///
/// # Example
/// ```rust
/// use doc_analyzer::ServiceConfig;
/// use std::time::Duration;
///
/// let config = ServiceConfig::builder()
///     .base_url("http://127.0.0.1:11434")
///     .generate_timeout(Duration::from_secs(60))
///     .build()
///     .unwrap();
/// let moved = config.with_port(11500).unwrap();
/// assert_eq!(moved.base_url(), "http://127.0.0.1:11500");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Validated absolute http(s) URL without a trailing slash.
    base_url: String,
    /// Budget for `GET /api/tags`. Default: 5 s.
    list_timeout: Duration,
    /// Budget for the whole `POST /api/generate` exchange. Default: 300 s.
    ///
    /// Covers connect, headers and every streamed frame. Local models can
    /// take minutes on long prompts, so this is deliberately generous.
    generate_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            list_timeout: DEFAULT_LIST_TIMEOUT,
            generate_timeout: DEFAULT_GENERATE_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            base_url: None,
            config: Self::default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn list_timeout(&self) -> Duration {
        self.list_timeout
    }

    pub fn generate_timeout(&self) -> Duration {
        self.generate_timeout
    }

    /// A copy of this config aimed at another port on the same host.
    pub fn with_port(&self, port: u16) -> Result<ServiceConfig, InferenceError> {
        if port == 0 {
            return Err(InferenceError::InvalidConfig("port must be 1–65535".into()));
        }
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            InferenceError::InvalidConfig(format!("base URL '{}': {e}", self.base_url))
        })?;
        url.set_port(Some(port)).map_err(|_| {
            InferenceError::InvalidConfig(format!("{} cannot carry a port", self.base_url))
        })?;
        Ok(ServiceConfig {
            base_url: url.as_str().trim_end_matches('/').to_string(),
            ..self.clone()
        })
    }

    /// `{base}/{path}`; a leading slash on `path` is optional.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    base_url: Option<String>,
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    /// Accepts `http://host:port`, or a bare `host[:port]` as `OLLAMA_HOST`
    /// usually holds it.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn list_timeout(mut self, timeout: Duration) -> Self {
        self.config.list_timeout = timeout;
        self
    }

    pub fn generate_timeout(mut self, timeout: Duration) -> Self {
        self.config.generate_timeout = timeout;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ServiceConfig, InferenceError> {
        if let Some(raw) = self.base_url.take() {
            self.config.base_url = parse_base_url(&raw)?;
        }
        let c = &self.config;
        if c.list_timeout.is_zero() {
            return Err(InferenceError::InvalidConfig(
                "list timeout must be greater than zero".into(),
            ));
        }
        if c.generate_timeout.is_zero() {
            return Err(InferenceError::InvalidConfig(
                "generate timeout must be greater than zero".into(),
            ));
        }
        Ok(self.config)
    }
}

fn parse_base_url(raw: &str) -> Result<String, InferenceError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(InferenceError::InvalidConfig("base URL is empty".into()));
    }
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let url = Url::parse(&with_scheme)
        .map_err(|e| InferenceError::InvalidConfig(format!("base URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(InferenceError::InvalidConfig(format!(
                "base URL '{raw}': unsupported scheme '{other}'"
            )))
        }
    }
    if url.host_str().is_none() {
        return Err(InferenceError::InvalidConfig(format!(
            "base URL '{raw}' has no host"
        )));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_ollama() {
        let c = ServiceConfig::default();
        assert_eq!(c.endpoint("/api/tags"), "http://localhost:11434/api/tags");
        assert_eq!(c.list_timeout(), Duration::from_secs(5));
        assert_eq!(c.generate_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn bare_host_gets_http_scheme() {
        let c = ServiceConfig::builder()
            .base_url("10.0.0.5:8080")
            .build()
            .unwrap();
        assert_eq!(c.endpoint("api/generate"), "http://10.0.0.5:8080/api/generate");
    }

    #[test]
    fn with_port_returns_new_value() {
        let original = ServiceConfig::default();
        let moved = original.with_port(11500).unwrap();
        assert_eq!(moved.endpoint("/api/tags"), "http://localhost:11500/api/tags");
        assert_eq!(original.base_url(), "http://localhost:11434");
        assert_eq!(moved.generate_timeout(), original.generate_timeout());
    }

    #[test]
    fn port_zero_rejected() {
        let err = ServiceConfig::default().with_port(0).unwrap_err();
        assert_eq!(err.class(), "invalid-config");
    }

    #[test]
    fn invalid_urls_rejected() {
        for raw in ["", "   ", "ftp://host", "http://"] {
            let err = ServiceConfig::builder().base_url(raw).build().unwrap_err();
            assert_eq!(err.class(), "invalid-config", "input: {raw:?}");
        }
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = ServiceConfig::builder()
            .generate_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("generate timeout"));
    }
}
