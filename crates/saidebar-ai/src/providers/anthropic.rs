//! Anthropic Messages API client

use crate::{
    error::{Error, Result},
    http::{HttpRequest, HttpResponse, HttpTransport},
    stream::{StreamEventStream, decode_events},
    types::{Endpoint, Message, ModelInfo},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Model used when the settings do not name one
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
/// Output token bound sent with every request
pub const MAX_TOKENS: u32 = 4096;
/// Value of the `anthropic-version` header
pub const API_VERSION: &str = "2023-06-01";

/// Body of a streaming `POST /v1/messages` request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub stream: bool,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl MessagesRequest {
    /// Build a streaming request.
    ///
    /// Blank model names fall back to [`DEFAULT_MODEL`]; a blank system prompt is omitted.
    pub fn new(model: Option<&str>, messages: Vec<Message>, system: Option<&str>) -> Self {
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MODEL)
            .to_string();
        let system = system
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);

        Self {
            model,
            max_tokens: MAX_TOKENS,
            stream: true,
            messages,
            system,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

/// Anthropic API client over an injectable transport
#[derive(Clone)]
pub struct AnthropicClient {
    transport: Arc<dyn HttpTransport>,
}

impl AnthropicClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Start a streaming exchange.
    ///
    /// Resolves once the response headers arrive. A non-2xx status is turned
    /// into [`Error::Api`] before any event is decoded.
    pub async fn stream(
        &self,
        endpoint: &Endpoint,
        request: &MessagesRequest,
    ) -> Result<StreamEventStream> {
        if endpoint.api_key.trim().is_empty() {
            return Err(Error::InvalidApiKey);
        }

        let url = endpoint.url("/v1/messages");
        tracing::debug!(
            "Anthropic API URL: {} (model {}, {} messages)",
            url,
            request.model,
            request.messages.len()
        );

        let http_request = with_auth_headers(
            HttpRequest::post(url, serde_json::to_value(request)?),
            endpoint,
        )
        .header("content-type", "application/json");

        let response = self.transport.send(http_request).await?;
        let response = check_status(response).await?;
        Ok(decode_events(response.body))
    }

    /// List the models available to this key
    pub async fn list_models(&self, endpoint: &Endpoint) -> Result<Vec<ModelInfo>> {
        if endpoint.api_key.trim().is_empty() {
            return Err(Error::InvalidApiKey);
        }

        let url = endpoint.url("/v1/models");
        tracing::debug!("Fetching models from {}", url);

        let response = self
            .transport
            .send(with_auth_headers(HttpRequest::get(url), endpoint))
            .await?;
        let body = check_status(response).await?.collect().await?;
        let parsed: ModelsResponse = serde_json::from_slice(&body)?;
        Ok(parsed.data)
    }
}

fn with_auth_headers(request: HttpRequest, endpoint: &Endpoint) -> HttpRequest {
    request
        .header("x-api-key", endpoint.api_key.trim())
        .header("anthropic-version", API_VERSION)
        .header("anthropic-dangerous-direct-browser-access", "true")
}

async fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    let status = response.status;
    // The error body is best-effort; an unreadable one still yields the status
    let body = response.collect().await.unwrap_or_default();
    let err = Error::from_response_body(status, &body);
    tracing::debug!("API returned {}: {}", status, err);
    Err(err)
}
