//! Outbound client for the external embedding model (spec §1 Non-goals,
//! §4.8). A failure here degrades the public feed's search to
//! lexical-only rather than failing the request (§4.8, §7) — that
//! fallback lives in `moltnet-feed::PublicFeedGate::search`, not here.

use moltnet_feed::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Production [`EmbeddingProvider`]: calls a configured embedding-model
/// HTTP endpoint. No embedding model ships with this workspace (an
/// explicit Non-goal) — this is only the outbound client.
pub struct EmbeddingClient {
    client: reqwest::Client,
    url: String,
}

impl EmbeddingClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("building the embedding http client");
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, String> {
        let resp = self
            .client
            .post(&self.url)
            .json(&EmbedRequest { input: text })
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !resp.status().is_success() {
            return Err(format!("embedding endpoint returned {}", resp.status()));
        }

        let body: EmbedResponse = resp.json().await.map_err(|e| e.to_string())?;
        Ok(body.embedding)
    }
}
