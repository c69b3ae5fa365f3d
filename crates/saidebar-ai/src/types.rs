//! Core types shared by the wire layer and the session layer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single transcript entry, serialized exactly as the Messages API expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Fallback base URL, also used when a custom provider has no URL configured
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Known API providers speaking the Anthropic Messages protocol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApiProvider {
    #[default]
    Anthropic,
    Zai,
    Custom,
}

impl ApiProvider {
    /// Identifier used in persisted settings
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiProvider::Anthropic => "anthropic",
            ApiProvider::Zai => "zai",
            ApiProvider::Custom => "custom",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            ApiProvider::Anthropic => "Anthropic",
            ApiProvider::Zai => "Z.ai",
            ApiProvider::Custom => "Custom",
        }
    }

    /// Static base URL for this provider, `None` for custom endpoints
    pub fn base_url(&self) -> Option<&'static str> {
        match self {
            ApiProvider::Anthropic => Some(ANTHROPIC_BASE_URL),
            ApiProvider::Zai => Some("https://api.z.ai/api/anthropic"),
            ApiProvider::Custom => None,
        }
    }

    /// Resolve the effective base URL, consulting `custom_url` only for custom providers.
    ///
    /// Trailing slashes are removed so paths can be appended directly.
    pub fn resolve_base_url(&self, custom_url: Option<&str>) -> String {
        let url = match self.base_url() {
            Some(url) => url,
            None => custom_url
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .unwrap_or(ANTHROPIC_BASE_URL),
        };
        url.trim_end_matches('/').to_string()
    }

    /// Parse a provider identifier; unknown identifiers yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Some(ApiProvider::Anthropic),
            "zai" | "z.ai" => Some(ApiProvider::Zai),
            "custom" => Some(ApiProvider::Custom),
            _ => None,
        }
    }
}

impl From<String> for ApiProvider {
    fn from(s: String) -> Self {
        ApiProvider::parse(&s).unwrap_or_else(|| {
            tracing::warn!("Unknown API provider '{}', using default", s);
            ApiProvider::default()
        })
    }
}

impl From<ApiProvider> for String {
    fn from(p: ApiProvider) -> Self {
        p.as_str().to_string()
    }
}

impl fmt::Display for ApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how to reach a Messages API
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Value for the `x-api-key` header
    pub api_key: String,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Join a path such as `/v1/messages` onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// A model advertised by the models endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier (e.g., "claude-sonnet-4-20250514")
    pub id: String,
    /// Human-readable name, when the endpoint provides one
    #[serde(default, rename = "display_name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ModelInfo {
    /// Display name if present, otherwise the id
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.id)
    }
}
