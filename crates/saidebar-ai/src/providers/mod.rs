//! API client implementations

pub mod anthropic;

pub use anthropic::{AnthropicClient, MessagesRequest};
