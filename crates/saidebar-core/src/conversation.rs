//! Conversation state: the committed transcript plus at most one streaming draft.

use saidebar_ai::Message;

/// Proof that a draft was started in a particular conversation generation.
///
/// Draft operations compare the token's generation with the current one, so
/// a token issued before [`Conversation::reset`] can no longer touch the
/// transcript.
#[derive(Debug)]
pub struct DraftToken {
    generation: u64,
}

/// Result of [`Conversation::commit_draft`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// The draft was appended as an assistant message
    Committed,
    /// The draft was empty; nothing was appended
    Empty,
    /// The conversation was reset since the draft started
    Stale,
}

#[derive(Debug)]
struct Draft {
    generation: u64,
    text: String,
}

/// Ordered transcript owned by one chat session
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    draft: Option<Draft>,
    generation: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed messages in insertion order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current generation; bumped by every reset
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Text of the in-progress draft, if any
    pub fn draft(&self) -> Option<&str> {
        self.draft.as_ref().map(|d| d.text.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    /// Start an empty assistant draft, replacing any previous one
    pub fn begin_draft(&mut self) -> DraftToken {
        self.draft = Some(Draft {
            generation: self.generation,
            text: String::new(),
        });
        DraftToken {
            generation: self.generation,
        }
    }

    /// Replace the draft text wholesale. Returns `false` for a stale token.
    pub fn update_draft(&mut self, token: &DraftToken, text: impl Into<String>) -> bool {
        match self.draft.as_mut() {
            Some(draft)
                if draft.generation == token.generation && self.generation == token.generation =>
            {
                draft.text = text.into();
                true
            }
            _ => false,
        }
    }

    /// Move a non-empty draft into the transcript
    pub fn commit_draft(&mut self, token: DraftToken) -> Commit {
        if self.is_stale(&token) {
            return Commit::Stale;
        }
        match self.draft.take() {
            Some(draft) if draft.generation == token.generation => {
                if draft.text.is_empty() {
                    Commit::Empty
                } else {
                    self.messages.push(Message::assistant(draft.text));
                    Commit::Committed
                }
            }
            other => {
                self.draft = other;
                Commit::Stale
            }
        }
    }

    /// Drop the draft without touching the transcript. Returns `false` for a stale token.
    pub fn discard_draft(&mut self, token: DraftToken) -> bool {
        if self.is_stale(&token) {
            return false;
        }
        match &self.draft {
            Some(draft) if draft.generation == token.generation => {
                self.draft = None;
                true
            }
            _ => false,
        }
    }

    /// Whether a token belongs to an earlier generation
    pub fn is_stale(&self, token: &DraftToken) -> bool {
        token.generation != self.generation
    }

    /// Clear history and any draft, starting a new generation
    pub fn reset(&mut self) {
        self.messages.clear();
        self.draft = None;
        self.generation += 1;
    }

    /// The transcript with its final user turn swapped for `content`.
    ///
    /// Used to send an expanded prompt while only a short placeholder is kept
    /// in the visible history.
    pub fn with_last_user_replaced(&self, content: impl Into<String>) -> Vec<Message> {
        let mut messages = self.messages.clone();
        if matches!(messages.last(), Some(m) if m.role == saidebar_ai::Role::User) {
            messages.pop();
        }
        messages.push(Message::user(content));
        messages
    }
}
