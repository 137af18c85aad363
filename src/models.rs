//! Model directory client: which models does the service have installed?
//!
//! Listing never fails outright. Every outcome is a [`ModelListing`]; when
//! something went wrong the list is empty and `diagnostic` says why, so the
//! caller can tell "service down" from "service up, nothing installed".

use crate::client::{classify_send_error, error_body, error_chain, ServiceClient};
use crate::config::ServiceConfig;
use crate::error::InferenceError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub(crate) const TAGS_PATH: &str = "/api/tags";

/// One installed model. `name` is both the display label and the value sent
/// as `model` in generate requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
}

/// Result of one directory query.
#[derive(Debug)]
pub struct ModelListing {
    /// Models in service order. Empty whenever `diagnostic` is set.
    pub models: Vec<ModelDescriptor>,
    pub diagnostic: Option<InferenceError>,
}

impl ModelListing {
    fn failed(diagnostic: InferenceError) -> Self {
        Self {
            models: Vec::new(),
            diagnostic: Some(diagnostic),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name.as_str())
    }

    /// Reachable service with zero models.
    pub fn is_reachable_but_empty(&self) -> bool {
        self.diagnostic.is_none() && self.models.is_empty()
    }

    /// `Err` when a diagnostic is present.
    pub fn into_result(self) -> Result<Vec<ModelDescriptor>, InferenceError> {
        match self.diagnostic {
            Some(e) => Err(e),
            None => Ok(self.models),
        }
    }
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Option<Vec<ModelDescriptor>>,
}

impl ServiceClient {
    /// `GET {base}/api/tags` within the configured list timeout.
    pub async fn list_models(&self) -> ModelListing {
        let url = self.config().endpoint(TAGS_PATH);
        debug!("Listing models: {}", url);

        match self.fetch_models(&url).await {
            Ok(models) => {
                info!("Model directory: {} model(s) installed", models.len());
                ModelListing {
                    models,
                    diagnostic: None,
                }
            }
            Err(e) => {
                warn!("Model directory unavailable ({}): {}", e.class(), url);
                ModelListing::failed(e)
            }
        }
    }

    async fn fetch_models(&self, url: &str) -> Result<Vec<ModelDescriptor>, InferenceError> {
        let budget = self.config().list_timeout();
        let response = self
            .http()
            .get(url)
            .timeout(budget)
            .send()
            .await
            .map_err(|e| classify_send_error(url, budget, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout {
                    url: url.to_string(),
                    budget_ms: budget.as_millis() as u64,
                }
            } else {
                InferenceError::MalformedResponse {
                    detail: format!("body could not be read: {}", error_chain(&e)),
                }
            }
        })?;

        let tags: TagsResponse =
            serde_json::from_slice(&bytes).map_err(|e| InferenceError::MalformedResponse {
                detail: e.to_string(),
            })?;
        Ok(tags.models.unwrap_or_default())
    }
}

/// One-shot listing with a fresh client.
pub async fn list_models(config: &ServiceConfig) -> ModelListing {
    match ServiceClient::new(config.clone()) {
        Ok(client) => client.list_models().await,
        Err(e) => ModelListing::failed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_body_parses_names_and_ignores_extras() {
        let body = r#"{"models":[
            {"name":"llama3:8b","size":4661224676,"digest":"abc","details":{"family":"llama"}},
            {"name":"qwen2.5:0.5b","modified_at":"2024-09-01T00:00:00Z"}
        ]}"#;
        let tags: TagsResponse = serde_json::from_str(body).unwrap();
        let names: Vec<_> = tags
            .models
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["llama3:8b", "qwen2.5:0.5b"]);
    }

    #[test]
    fn missing_or_null_models_is_empty() {
        for body in [r#"{}"#, r#"{"models":null}"#] {
            let tags: TagsResponse = serde_json::from_str(body).unwrap();
            assert!(tags.models.unwrap_or_default().is_empty(), "body: {body}");
        }
    }

    #[test]
    fn listing_result_views() {
        let ok = ModelListing {
            models: vec![ModelDescriptor { name: "m".into() }],
            diagnostic: None,
        };
        assert_eq!(ok.names().collect::<Vec<_>>(), vec!["m"]);
        assert!(!ok.is_reachable_but_empty());

        let failed = ModelListing::failed(InferenceError::MalformedResponse {
            detail: "x".into(),
        });
        assert!(failed.is_empty());
        assert!(!failed.is_reachable_but_empty());
        assert_eq!(failed.into_result().unwrap_err().class(), "malformed-response");
    }
}
