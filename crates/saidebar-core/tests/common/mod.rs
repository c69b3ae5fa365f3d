#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use saidebar_ai::http::{ByteStream, HttpRequest, HttpResponse, HttpTransport};
use saidebar_ai::{ApiProvider, Result};
use saidebar_core::{ChatSession, Presenter, Settings, SidebarEvent};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Records every presenter event
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<SidebarEvent>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<SidebarEvent> {
        self.events.lock().clone()
    }

    pub fn updates(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SidebarEvent::DraftUpdated { text } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SidebarEvent::Error { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, event: &SidebarEvent) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }
}

impl Presenter for Recorder {
    fn present(&self, event: SidebarEvent) {
        self.events.lock().push(event);
    }
}

/// Answers every request with the same status and chunk list
pub struct ScriptedTransport {
    status: u16,
    chunks: Vec<Vec<u8>>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(status: u16, chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            status,
            chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_body(&self) -> serde_json::Value {
        self.requests
            .lock()
            .last()
            .and_then(|r| r.body.clone())
            .expect("no request body recorded")
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().push(request);
        let chunks: Vec<Result<Vec<u8>>> = self.chunks.iter().cloned().map(Ok).collect();
        let body: ByteStream = Box::pin(futures::stream::iter(chunks));
        Ok(HttpResponse {
            status: self.status,
            body,
        })
    }
}

/// Streams whatever the test pushes into the returned sender
pub struct ChannelTransport {
    body: Mutex<Option<mpsc::UnboundedReceiver<Result<Vec<u8>>>>>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl ChannelTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedSender<Result<Vec<u8>>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            body: Mutex::new(Some(rx)),
            requests: Mutex::new(Vec::new()),
        });
        (transport, tx)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl HttpTransport for ChannelTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().push(request);
        let rx = self
            .body
            .lock()
            .take()
            .expect("ChannelTransport serves a single request");
        let body: ByteStream = Box::pin(UnboundedReceiverStream::new(rx));
        Ok(HttpResponse { status: 200, body })
    }
}

/// How [`QueuedTransport`] answers one request
pub enum Reply {
    /// Never produce response headers
    Stall,
    /// A 200 response with these body chunks
    Body(Vec<String>),
    /// A 200 response streaming whatever the test pushes
    Live(mpsc::UnboundedReceiver<Result<Vec<u8>>>),
}

/// Answers successive requests with successive [`Reply`]s
pub struct QueuedTransport {
    replies: Mutex<VecDeque<Reply>>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl QueuedTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl HttpTransport for QueuedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().push(request);
        let reply = self.replies.lock().pop_front().unwrap_or(Reply::Stall);
        let body: ByteStream = match reply {
            Reply::Stall => std::future::pending().await,
            Reply::Body(chunks) => {
                let chunks: Vec<Result<Vec<u8>>> =
                    chunks.into_iter().map(|c| Ok(c.into_bytes())).collect();
                Box::pin(futures::stream::iter(chunks))
            }
            Reply::Live(rx) => Box::pin(UnboundedReceiverStream::new(rx)),
        };
        Ok(HttpResponse { status: 200, body })
    }
}

pub fn settings() -> Settings {
    Settings {
        api_key: "sk-test".to_string(),
        api_provider: ApiProvider::Anthropic,
        ..Default::default()
    }
}

pub fn session(transport: Arc<dyn HttpTransport>) -> (ChatSession, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let session = ChatSession::new(settings(), transport, recorder.clone());
    (session, recorder)
}

pub fn delta(text: &str) -> String {
    format!(
        "event: content_block_delta\ndata: {}\n\n",
        serde_json::json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "text_delta", "text": text},
        })
    )
}

pub const STOP: &str = "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n";

pub fn chunk(s: &str) -> Result<Vec<u8>> {
    Ok(s.as_bytes().to_vec())
}

/// Yield to other futures until `cond` holds
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
