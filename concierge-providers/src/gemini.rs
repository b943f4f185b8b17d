//! Google Gemini `generateContent` client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::base::{
    GenerationRequest, LLMProvider, LLMResponse, Message, ProviderError, ProviderResult,
};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// generateContent request format
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// generateContent response format
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Wrapper used to pull `error.message` out of non-2xx bodies
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i64,
    #[serde(default)]
    candidates_token_count: i64,
    #[serde(default)]
    total_token_count: i64,
}

/// Gemini provider client
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
    default_model: String,
    generation_config: GenerationConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: String,
    ) -> Self {
        let api_base = api_base
            .filter(|base| !base.trim().is_empty())
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            // No request timeout: the gateway waits as long as the provider takes.
            client: Client::new(),
            api_base,
            api_key: api_key.into(),
            default_model,
            generation_config: GenerationConfig::default(),
        }
    }

    /// Set optional sampling parameters sent as `generationConfig`
    pub fn with_generation_config(
        mut self,
        temperature: Option<f64>,
        max_output_tokens: Option<u32>,
    ) -> Self {
        self.generation_config = GenerationConfig {
            temperature,
            max_output_tokens,
        };
        self
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/v1beta/models/{}:generateContent", self.api_base, model)
    }

    fn build_request(&self, request: GenerationRequest) -> GenerateContentRequest {
        let mut contents: Vec<Content> = request.history.iter().map(to_content).collect();
        contents.push(to_content(&Message::user(request.message)));

        let generation_config = if self.generation_config.temperature.is_none()
            && self.generation_config.max_output_tokens.is_none()
        {
            None
        } else {
            Some(self.generation_config.clone())
        };

        GenerateContentRequest {
            contents,
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: request.system_instruction,
                }],
            },
            generation_config,
        }
    }

    /// Parse a generateContent body into our standard format
    fn parse_response(response: GenerateContentResponse) -> ProviderResult<LLMResponse> {
        if let Some(err) = response.error {
            return Err(ProviderError::ApiError(err.message));
        }

        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!("prompt blocked: {}", r))
                .unwrap_or_else(|| "No candidates in response".to_string());
            return Err(ProviderError::InvalidResponse(reason));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let finish_reason = candidate
            .finish_reason
            .unwrap_or_else(|| "STOP".to_string());

        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(format!(
                "No text in response (finish reason: {})",
                finish_reason
            )));
        }

        let usage_metadata = response.usage_metadata.unwrap_or_default();
        let mut usage = HashMap::new();
        usage.insert("prompt_tokens".to_string(), usage_metadata.prompt_token_count);
        usage.insert(
            "completion_tokens".to_string(),
            usage_metadata.candidates_token_count,
        );
        usage.insert("total_tokens".to_string(), usage_metadata.total_token_count);

        Ok(LLMResponse {
            content: text,
            finish_reason,
            usage,
        })
    }
}

fn to_content(message: &Message) -> Content {
    Content {
        role: Some(message.role.as_str()),
        parts: vec![Part {
            text: message.content.clone(),
        }],
    }
}

#[async_trait]
impl LLMProvider for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> ProviderResult<LLMResponse> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::ConfigError(
                "Gemini API key not configured".to_string(),
            ));
        }

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let url = self.endpoint(&model);
        let history_len = request.history.len();
        let body = self.build_request(request);

        debug!(
            "Sending generateContent request with model {} ({} prior turns)",
            model, history_len
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let detail = serde_json::from_str::<ErrorEnvelope>(&error_text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(error_text);
            return Err(ProviderError::ApiError(format!("HTTP {}: {}", status, detail)));
        }

        let response_data: GenerateContentResponse = response.json().await?;
        let parsed = Self::parse_response(response_data)?;
        debug!(
            "Received {} chars from {} (finish reason {})",
            parsed.content.len(),
            model,
            parsed.finish_reason
        );
        Ok(parsed)
    }

    fn get_default_model(&self) -> String {
        self.default_model.clone()
    }
}
