//! Local files standing in for the attached page

use async_trait::async_trait;
use saidebar_core::{PageSnapshot, PageSource};
use std::path::PathBuf;

/// Reads a text file when the page content is requested
pub struct FilePage {
    path: PathBuf,
    title: Option<String>,
}

impl FilePage {
    pub fn new(path: impl Into<PathBuf>, title: Option<String>) -> Self {
        Self {
            path: path.into(),
            title,
        }
    }

    fn url(&self) -> String {
        let path = std::fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone());
        format!("file://{}", path.display())
    }

    /// Title given on the command line, else the file name
    fn title(&self) -> String {
        self.title.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.display().to_string())
        })
    }
}

#[async_trait]
impl PageSource for FilePage {
    async fn snapshot(&self) -> Option<PageSnapshot> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                if text.trim().is_empty() {
                    tracing::debug!("{} is empty", self.path.display());
                    return None;
                }
                Some(PageSnapshot::new(self.title(), self.url(), text))
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", self.path.display(), e);
                None
            }
        }
    }
}
