//! HTTP oracle backend for OpenAI-compatible and Anthropic endpoints.

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use subtopic_types::{OracleProvider, OracleSettings};

use crate::{Oracle, OracleError, OracleRequest};

/// API-based oracle.
///
/// Transport failures (network, 5xx, rate limits) are retried here with
/// exponential backoff; the answer itself is never inspected.
pub struct ApiOracle {
    client: Client,
    provider: OracleProvider,
    base_url: String,
    model: String,
    api_key: SecretString,
    max_retries: u32,
    temperature: Option<f32>,
    max_tokens: u32,
}

impl ApiOracle {
    /// Create a new API oracle from settings.
    pub fn new(settings: &OracleSettings) -> Result<Self, OracleError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| OracleError::ConfigError("missing API key".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| OracleError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            provider: settings.provider,
            base_url: settings.resolved_base_url(),
            model: settings.model.clone(),
            api_key: SecretString::from(api_key),
            max_retries: settings.max_retries.max(1),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    /// Model this backend talks to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Call the API with retry logic.
    async fn call_api(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let mut backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(120)),
            ..Default::default()
        };

        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, seed = request.seed, "Calling oracle API");

            match self.make_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    if attempts >= self.max_retries {
                        error!(error = %e, "Max transport retries exceeded");
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                error = %e,
                                retry_in_ms = duration.as_millis(),
                                "Oracle call failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    async fn make_request(&self, request: &OracleRequest) -> Result<String, OracleError> {
        match self.provider {
            OracleProvider::Chat => self.make_chat_request(request).await,
            OracleProvider::Completions => self.make_completions_request(request).await,
            OracleProvider::Anthropic => self.make_anthropic_request(request).await,
        }
    }

    /// Send a JSON body and map HTTP-level failures.
    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, OracleError> {
        let url = format!("{}/{}", self.base_url, path);

        let builder = self.client.post(&url).header("Content-Type", "application/json");
        let builder = match self.provider {
            OracleProvider::Anthropic => builder
                .header("x-api-key", self.api_key.expose_secret())
                .header("anthropic-version", "2023-06-01"),
            OracleProvider::Chat | OracleProvider::Completions => builder.header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            ),
        };

        let response = builder.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout
            } else {
                OracleError::ApiError(e.to_string())
            }
        })?;

        if response.status() == 429 {
            return Err(OracleError::RateLimitExceeded);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| OracleError::ParseError(e.to_string()))
    }

    /// OpenAI-compatible chat completion; the prompt goes in as a system message.
    async fn make_chat_request(&self, request: &OracleRequest) -> Result<String, OracleError> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            seed: u64,
            #[serde(skip_serializing_if = "Option::is_none")]
            temperature: Option<f32>,
        }

        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessageResponse,
        }

        #[derive(Deserialize)]
        struct ChatMessageResponse {
            content: Option<String>,
        }

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "system",
                content: &request.prompt,
            }],
            seed: request.seed,
            temperature: self.temperature,
        };

        let response: ChatResponse = self.post_json("chat/completions", &body).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OracleError::ParseError("No choices in response".to_string()))
    }

    /// OpenAI-compatible text completion for instruct models without a chat template.
    async fn make_completions_request(
        &self,
        request: &OracleRequest,
    ) -> Result<String, OracleError> {
        #[derive(Serialize)]
        struct CompletionRequest<'a> {
            model: &'a str,
            prompt: String,
            max_tokens: u32,
            seed: u64,
            #[serde(skip_serializing_if = "Option::is_none")]
            temperature: Option<f32>,
        }

        #[derive(Deserialize)]
        struct CompletionResponse {
            choices: Vec<CompletionChoice>,
        }

        #[derive(Deserialize)]
        struct CompletionChoice {
            text: String,
        }

        let body = CompletionRequest {
            model: &self.model,
            prompt: format!("USER: {} SYSTEM: ", request.prompt),
            max_tokens: self.max_tokens,
            seed: request.seed,
            temperature: self.temperature,
        };

        let response: CompletionResponse = self.post_json("completions", &body).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| OracleError::ParseError("No choices in response".to_string()))
    }

    /// Anthropic messages API. It has no seed parameter; the seed only
    /// shows up in logs for this provider.
    async fn make_anthropic_request(&self, request: &OracleRequest) -> Result<String, OracleError> {
        #[derive(Serialize)]
        struct AnthropicRequest<'a> {
            model: &'a str,
            max_tokens: u32,
            messages: Vec<AnthropicMessage<'a>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            temperature: Option<f32>,
        }

        #[derive(Serialize)]
        struct AnthropicMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            text: String,
        }

        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: self.temperature,
        };

        let response: AnthropicResponse = self.post_json("messages", &body).await?;
        response
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| OracleError::ParseError("No content in response".to_string()))
    }
}

#[async_trait]
impl Oracle for ApiOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError> {
        self.call_api(request).await
    }
}
