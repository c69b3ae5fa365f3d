//! Page content handed to the summarize flow

use async_trait::async_trait;
use std::time::Duration;

/// Characters of page text kept before truncation
pub const MAX_PAGE_TEXT_CHARS: usize = 10_000;

/// Text extracted from the page the sidebar is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub title: String,
    pub url: String,
    pub text: String,
}

impl PageSnapshot {
    pub fn new(title: impl Into<String>, url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            text: text.into(),
        }
    }

    /// Render as prompt text: whitespace collapsed, body truncated
    pub fn render(&self) -> String {
        let mut text = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if let Some((idx, _)) = text.char_indices().nth(MAX_PAGE_TEXT_CHARS) {
            text.truncate(idx);
            text.push_str("...");
        }
        format!("Title: {}\nURL: {}\n\nContent:\n{}", self.title, self.url, text)
    }
}

/// Something that can be asked for the current page's content
#[async_trait]
pub trait PageSource: Send + Sync {
    /// `None` when no content is available
    async fn snapshot(&self) -> Option<PageSnapshot>;
}

/// A snapshot captured ahead of time
#[async_trait]
impl PageSource for PageSnapshot {
    async fn snapshot(&self) -> Option<PageSnapshot> {
        Some(self.clone())
    }
}

/// Ask `source` for the page, giving up after `timeout`
pub async fn fetch_page_content(source: &dyn PageSource, timeout: Duration) -> Option<String> {
    match tokio::time::timeout(timeout, source.snapshot()).await {
        Ok(Some(snapshot)) => Some(snapshot.render()),
        Ok(None) => None,
        Err(_) => {
            tracing::warn!("Page content request timed out after {:?}", timeout);
            None
        }
    }
}
