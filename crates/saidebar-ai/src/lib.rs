//! saidebar-ai: Anthropic Messages API wire layer
//!
//! This crate provides the message types, the provider table, an injectable
//! HTTP transport, the byte-safe server-sent event decoder and the model
//! catalog used by the chat session.

pub mod error;
pub mod http;
pub mod models;
pub mod providers;
pub mod stream;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use http::{HttpTransport, ReqwestTransport};
pub use models::ModelCatalog;
pub use stream::{StreamEvent, StreamEventStream};
pub use types::*;
