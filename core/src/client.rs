use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{LlmConfig, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL};
use crate::errors::{LlmError, LlmResult};
use crate::types::*;

const API_VERSION: &str = "2023-06-01";

/// Common seam for anything that can answer a Messages API request
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one request and return the raw response
    async fn create_message(&self, request: MessagesRequest) -> LlmResult<MessagesResponse>;

    /// Get the model name being used
    fn model_name(&self) -> String;
}

/// Client for interacting with the Messages API
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl AnthropicClient {
    /// Create a new client; fails when no API key is configured
    pub fn new(config: &LlmConfig) -> LlmResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                LlmError::ConfigError(
                    "API key is required to initialize the LLM client".to_string(),
                )
            })?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model_name: config
                .model_name
                .clone()
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn create_message(&self, request: MessagesRequest) -> LlmResult<MessagesResponse> {
        debug!(
            model = %request.model,
            max_tokens = request.max_tokens,
            messages = request.messages.len(),
            "Sending Messages API request"
        );

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::RequestError(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.map_err(|e| {
                LlmError::ResponseError(format!("Failed to read error response: {}", e))
            })?;

            let message = match serde_json::from_str::<ApiErrorResponse>(&error_body) {
                Ok(parsed) => format!("{}: {}", parsed.error.kind, parsed.error.message),
                Err(_) => error_body,
            };
            warn!(status = status.as_u16(), "Messages API request failed");

            return Err(LlmError::HttpError {
                status_code: status.as_u16(),
                message,
            });
        }

        let response_body = response
            .json::<MessagesResponse>()
            .await
            .map_err(|e| LlmError::ParsingError(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = &response_body.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Messages API token usage"
            );
        }

        Ok(response_body)
    }

    fn model_name(&self) -> String {
        self.model_name.clone()
    }
}

/// Text of the first content block; any other block kind is an error
pub fn extract_text_from_response(response: &MessagesResponse) -> LlmResult<String> {
    let block = response
        .content
        .first()
        .ok_or_else(|| LlmError::ResponseError("No content blocks in response".to_string()))?;

    match block {
        ContentBlock::Text { text } => Ok(text.clone()),
        other => Err(LlmError::UnexpectedContent(other.kind().to_string())),
    }
}
