//! Integration with a LlamaIndex-style knowledge server.
//!
//! The server exposes a small HTTP API: `/v1/answer` queries a
//! project/version index inside a conversation thread, `/v1/elaborate`
//! expands on text without an index, and `/v1/inject` adds raw text to an
//! index. Thread handles are minted client-side; the server keys its
//! conversational memory by whatever slug the client sends.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::base::{
    config::Config,
    types::{Res, Void},
};

use super::{GenericLlmClient, LlmClient};

// Extra methods on `LlmClient` applied by the llamaindex implementation.

impl LlmClient {
    pub fn llamaindex(config: &Config) -> Self {
        let client = LlamaIndexClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// Body of an answer/elaborate response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(rename = "textResponse")]
    text_response: String,
}

/// LlamaIndex knowledge server client implementation.
#[derive(Clone)]
pub struct LlamaIndexClient {
    base_url: String,
    http: reqwest::Client,
}

impl LlamaIndexClient {
    /// Create a new LlamaIndex client.
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.knowledge_endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// POST a JSON body and fail on any non-success status, carrying the
    /// server's own error text back to the caller.
    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Res<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);

        let response = self.http.post(&url).json(body).send().await.map_err(|e| anyhow::anyhow!("Failed to reach knowledge server: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Knowledge server returned status {}: {}", status, body));
        }

        Ok(response)
    }
}

#[async_trait]
impl GenericLlmClient for LlamaIndexClient {
    #[instrument(skip(self))]
    async fn create_thread(&self, project: &str, version: &str) -> Res<String> {
        // The server keeps memory per slug; minting the slug locally avoids a round trip.
        let thread_handle = Uuid::new_v4().to_string();

        debug!("Generated thread handle {} for project={}, version={}", thread_handle, project, version);

        Ok(thread_handle)
    }

    #[instrument(skip(self, message))]
    async fn query(&self, project: &str, version: &str, thread_handle: &str, message: &str) -> Res<String> {
        let body = json!({
            "project": project,
            "version": version,
            "thread_slug": thread_handle,
            "message": message,
        });

        let response: ChatResponse = self.post_json("/v1/answer", &body).await?.json().await.map_err(|e| anyhow::anyhow!("Failed to decode answer response: {}", e))?;

        Ok(response.text_response)
    }

    #[instrument(skip(self, message))]
    async fn elaborate(&self, thread_handle: &str, message: &str) -> Res<String> {
        let body = json!({
            "thread_slug": thread_handle,
            "message": message,
        });

        let response: ChatResponse = self.post_json("/v1/elaborate", &body).await?.json().await.map_err(|e| anyhow::anyhow!("Failed to decode elaborate response: {}", e))?;

        Ok(response.text_response)
    }

    #[instrument(skip(self, text))]
    async fn inject(&self, project: &str, version: &str, text: &str) -> Void {
        let body = json!({
            "project": project,
            "version": version,
            "textContent": text,
        });

        self.post_json("/v1/inject", &body).await?;

        Ok(())
    }
}
