//! saidebar-core: Chat session runtime
//!
//! This crate owns the conversation transcript, the persisted connection
//! settings and the exchange state machine that turns a streamed Messages API
//! response into presenter notifications and committed history.

pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod page;
pub mod session;
pub mod settings;

pub use conversation::{Commit, Conversation, DraftToken};
pub use error::{Error, Result};
pub use events::{NullPresenter, Presenter, SidebarEvent};
pub use handle::{Phase, SessionHandle};
pub use page::{PageSnapshot, PageSource};
pub use session::{ChatSession, ExchangeOutcome, SUMMARIZE_PLACEHOLDER};
pub use settings::{FileSettingsStore, MemorySettingsStore, Settings, SettingsStore};
