use askai_types::{config::DEFAULT_MODEL, Message, ProviderId};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::responses::{build_responses_request, ResponseStreamEvent, ResponsesSseParser};
use crate::buffer_utils::parse_sse_stream;
use crate::error::{ProviderError, Result};
use crate::prompt::combined_system_prompt;
use crate::traits::{CompletionOptions, CompletionProvider, CompletionResult};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Configuration for the hosted provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub base_url: String,
    /// Model used when the caller does not name one
    pub default_model: String,
    /// Whole-request timeout, streaming included
    pub timeout: Option<Duration>,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENAI_API_BASE.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Streaming Responses API client (HTTP direct, no SDK)
pub struct OpenAIProvider {
    http_client: reqwest::Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|e| ProviderError::Request(format!("Invalid API key format: {}", e)))?,
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ProviderError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAiApi
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: CompletionOptions,
    ) -> Result<CompletionResult> {
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.config.default_model.clone());
        let instructions = combined_system_prompt(options.system_prompt.as_deref(), messages);
        let body = build_responses_request(
            &model,
            instructions.as_deref(),
            messages,
            options.reasoning_effort,
        );

        tracing::debug!(model = %model, turns = messages.len(), "sending responses request");

        let response = self.http_client.post(self.endpoint()).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let mut events = parse_sse_stream(response, ResponsesSseParser);
        let mut text = String::new();
        let mut used_web_search = false;
        let mut resolved_model = model.clone();

        while let Some(event) = events.next().await {
            match event? {
                ResponseStreamEvent::OutputTextDelta { delta } => {
                    text.push_str(&delta);
                    options.emit(&text);
                }
                event @ ResponseStreamEvent::OutputItemAdded { .. } => {
                    if event.is_web_search() {
                        used_web_search = true;
                    }
                }
                ResponseStreamEvent::Completed { response } => {
                    if let Some(m) = response.model {
                        resolved_model = m;
                    }
                }
                ResponseStreamEvent::Failed { response } => {
                    let detail = response
                        .as_ref()
                        .and_then(|r| r.pointer("/error/message"))
                        .and_then(|m| m.as_str())
                        .unwrap_or("response failed")
                        .to_string();
                    return Err(ProviderError::Stream(detail));
                }
                ResponseStreamEvent::Error { message, error } => {
                    let detail = message
                        .or_else(|| error.and_then(|e| e.message))
                        .unwrap_or_else(|| "stream error".to_string());
                    return Err(ProviderError::Stream(detail));
                }
                ResponseStreamEvent::Other => {}
            }
        }

        tracing::debug!(model = %resolved_model, chars = text.len(), used_web_search, "responses stream finished");

        Ok(CompletionResult {
            content: text,
            model: resolved_model,
            used_web_search: Some(used_web_search),
        })
    }
}
