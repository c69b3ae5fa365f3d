//! A cloneable handle onto a chat session's shared state.

use parking_lot::{Mutex, MutexGuard};
use saidebar_ai::Message;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::conversation::Conversation;
use crate::events::{Presenter, SidebarEvent};

/// Where the current exchange is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No exchange in flight
    Idle,
    /// Request dispatched, waiting for headers (or for page content)
    Sending,
    /// Receiving deltas
    Streaming,
    /// `message_stop` seen, draining the body
    Finalizing,
}

pub(crate) struct SessionState {
    pub(crate) conversation: Conversation,
    pub(crate) phase: Phase,
    /// Cancels the exchange in flight
    pub(crate) cancel: CancellationToken,
}

/// A cloneable handle for poking the session from other parts of the front end.
///
/// All fields are `Arc`-wrapped, so cloning is cheap. The lock is never held
/// across an await point or while the presenter runs.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) state: Arc<Mutex<SessionState>>,
    pub(crate) presenter: Arc<dyn Presenter>,
}

impl SessionHandle {
    pub(crate) fn new(presenter: Arc<dyn Presenter>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                conversation: Conversation::new(),
                phase: Phase::Idle,
                cancel: CancellationToken::new(),
            })),
            presenter,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock()
    }

    /// Whether an exchange is in flight
    pub fn is_busy(&self) -> bool {
        self.phase() != Phase::Idle
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Snapshot of the committed transcript
    pub fn messages(&self) -> Vec<Message> {
        self.lock().conversation.messages().to_vec()
    }

    /// Text of the streaming draft, if any
    pub fn draft(&self) -> Option<String> {
        self.lock().conversation.draft().map(str::to_string)
    }

    /// Start a new conversation.
    ///
    /// Usable at any time. An exchange in flight is cancelled and, because the
    /// conversation generation moves on, none of its late effects apply.
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            state.conversation.reset();
            state.cancel.cancel();
            state.phase = Phase::Idle;
        }
        tracing::debug!("Conversation reset");
        self.presenter.present(SidebarEvent::ConversationReset);
    }
}
