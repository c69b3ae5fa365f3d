//! Presentation events and the presenter capability

use serde::{Deserialize, Serialize};

/// Notifications emitted to the presentation layer, in transcript order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidebarEvent {
    /// A user message was appended
    UserMessage { text: String },
    /// Waiting for the response headers
    LoadingStarted,
    /// The loading indicator should go away
    LoadingFinished,
    /// An assistant draft was opened
    DraftStarted,
    /// The draft now reads `text` (the full text so far, not a delta)
    DraftUpdated { text: String },
    /// No more deltas will arrive for the draft
    DraftFinalized,
    /// The draft was dropped and must be removed from view
    DraftDiscarded,
    /// A user-facing error; supersedes any earlier one
    Error { message: String },
    /// The conversation was cleared
    ConversationReset,
}

/// Receives [`SidebarEvent`]s synchronously from the session.
///
/// Implementations must not block; they run inside the exchange loop.
pub trait Presenter: Send + Sync {
    fn present(&self, event: SidebarEvent);
}

/// Forward events to a channel, e.g. a UI task
impl Presenter for tokio::sync::mpsc::UnboundedSender<SidebarEvent> {
    fn present(&self, event: SidebarEvent) {
        if self.send(event).is_err() {
            tracing::debug!("Presenter channel closed, dropping event");
        }
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn present(&self, _event: SidebarEvent) {}
}
