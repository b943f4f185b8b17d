use anyhow::Result;
use concierge_agent::{ChatReply, HealthStatus, ResetAck};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Thin client for a running gateway
pub struct ApiClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

impl ApiClient {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn chat(&self, message: &str, session_id: &str) -> Result<ChatReply> {
        let url = format!("{}/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "message": message, "session_id": session_id }))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn reset(&self, session_id: &str) -> Result<ResetAck> {
        let url = format!("{}/reset", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("session_id", session_id)])
            .send()
            .await?;
        decode(response).await
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.detail)
            .unwrap_or(text);
        anyhow::bail!("Server returned {}: {}", status, detail);
    }
    Ok(response.json().await?)
}
