//! Chat session: one streaming exchange at a time against the Messages API

use futures::StreamExt;
use parking_lot::{Mutex, MutexGuard};
use saidebar_ai::{
    Endpoint, HttpTransport, Message, ModelCatalog, ModelInfo, StreamEvent,
    providers::{AnthropicClient, MessagesRequest},
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    conversation::{Commit, DraftToken},
    error::{Error, Result},
    events::{Presenter, SidebarEvent},
    handle::{Phase, SessionHandle, SessionState},
    page::{PageSource, fetch_page_content},
    settings::Settings,
};

/// How long summarize waits for the page content
pub const PAGE_CONTENT_TIMEOUT: Duration = Duration::from_secs(5);

/// The user turn shown and stored for a summarize request
pub const SUMMARIZE_PLACEHOLDER: &str = "Summarize this page";

const SUMMARIZE_INSTRUCTION: &str = "Summarize the content of the following web page concisely:";

/// How a send or summarize call ended, when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// An assistant message was committed
    Completed,
    /// The stream ended without any text; nothing was committed
    Empty,
    /// Another exchange is in flight; nothing happened
    Busy,
    /// The conversation was reset while the exchange ran
    Cancelled,
    /// The input was blank
    NothingToSend,
}

/// Identifies one exchange: the generation it belongs to and its cancel token
struct Ticket {
    generation: u64,
    cancel: CancellationToken,
}

/// What the presenter currently shows for the exchange
#[derive(Default)]
struct Progress {
    loading: bool,
    draft: Option<DraftToken>,
    finalized: bool,
}

enum StreamEnd {
    Finished,
    Cancelled,
}

/// The chat client for one sidebar lifetime.
///
/// Owns the conversation (through its [`SessionHandle`]), the settings in use,
/// the API client and the model catalog. All methods take `&self`; the busy
/// flag rather than the borrow checker keeps exchanges from overlapping, so a
/// front end can reset or query the session while an exchange is awaiting.
pub struct ChatSession {
    settings: Mutex<Settings>,
    client: AnthropicClient,
    catalog: ModelCatalog,
    presenter: Arc<dyn Presenter>,
    handle: SessionHandle,
    page_timeout: Duration,
}

impl ChatSession {
    pub fn new(
        settings: Settings,
        transport: Arc<dyn HttpTransport>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            settings: Mutex::new(settings),
            client: AnthropicClient::new(transport.clone()),
            catalog: ModelCatalog::new(transport),
            handle: SessionHandle::new(presenter.clone()),
            presenter,
            page_timeout: PAGE_CONTENT_TIMEOUT,
        }
    }

    /// Override the page-content wait
    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Get a cloneable handle to the shared state
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Settings used by the next exchange
    pub fn settings(&self) -> Settings {
        self.settings.lock().clone()
    }

    /// Replace the settings. An exchange in flight keeps the ones it started with.
    pub fn set_settings(&self, settings: Settings) {
        *self.settings.lock() = settings;
    }

    pub fn is_busy(&self) -> bool {
        self.handle.is_busy()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.handle.messages()
    }

    /// Start a new conversation
    pub fn reset(&self) {
        self.handle.reset();
    }

    /// Fetch the model list for the current settings, refreshing the cache
    pub async fn fetch_models(&self) -> Result<Vec<ModelInfo>> {
        let endpoint = self.settings().endpoint();
        Ok(self.catalog.fetch(&endpoint).await?)
    }

    /// Models cached for the current key and endpoint
    pub fn cached_models(&self) -> Option<Vec<ModelInfo>> {
        self.catalog.cached(&self.settings().endpoint())
    }

    /// Append a user message and stream the assistant's answer
    pub async fn send_message(&self, text: &str) -> Result<ExchangeOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(ExchangeOutcome::NothingToSend);
        }
        if self.is_busy() {
            tracing::debug!("Exchange in flight, ignoring send");
            return Ok(ExchangeOutcome::Busy);
        }
        self.require_api_key()?;

        let (ticket, messages) = {
            let mut state = self.handle.lock();
            let Some(ticket) = begin_exchange(&mut state) else {
                return Ok(ExchangeOutcome::Busy);
            };
            state.conversation.append_user(text);
            (ticket, state.conversation.messages().to_vec())
        };
        self.presenter.present(SidebarEvent::UserMessage {
            text: text.to_string(),
        });

        self.run_exchange(ticket, messages).await
    }

    /// Ask the model to summarize the page `source` describes.
    ///
    /// Only [`SUMMARIZE_PLACEHOLDER`] is stored in the transcript; the page
    /// text travels in the request alone.
    pub async fn summarize_page(&self, source: &dyn PageSource) -> Result<ExchangeOutcome> {
        if self.is_busy() {
            tracing::debug!("Exchange in flight, ignoring summarize");
            return Ok(ExchangeOutcome::Busy);
        }
        self.require_api_key()?;

        let Some(ticket) = begin_exchange(&mut self.handle.lock()) else {
            return Ok(ExchangeOutcome::Busy);
        };

        let content = tokio::select! {
            biased;
            _ = ticket.cancel.cancelled() => return Ok(ExchangeOutcome::Cancelled),
            content = fetch_page_content(source, self.page_timeout) => content,
        };
        let Some(content) = content else {
            self.end_exchange(&ticket);
            let err = Error::PageContentUnavailable;
            self.presenter.present(SidebarEvent::Error {
                message: err.user_message(),
            });
            return Err(err);
        };

        let messages = {
            let mut state = self.handle.lock();
            if state.conversation.generation() != ticket.generation {
                return Ok(ExchangeOutcome::Cancelled);
            }
            state.conversation.append_user(SUMMARIZE_PLACEHOLDER);
            state
                .conversation
                .with_last_user_replaced(format!("{}\n\n{}", SUMMARIZE_INSTRUCTION, content))
        };
        self.presenter.present(SidebarEvent::UserMessage {
            text: SUMMARIZE_PLACEHOLDER.to_string(),
        });

        self.run_exchange(ticket, messages).await
    }

    fn require_api_key(&self) -> Result<()> {
        if self.settings.lock().has_api_key() {
            return Ok(());
        }
        let err = Error::from(saidebar_ai::Error::InvalidApiKey);
        self.presenter.present(SidebarEvent::Error {
            message: err.user_message(),
        });
        Err(err)
    }

    async fn run_exchange(
        &self,
        ticket: Ticket,
        messages: Vec<Message>,
    ) -> Result<ExchangeOutcome> {
        let settings = self.settings();
        let request = MessagesRequest::new(
            settings.model.as_deref(),
            messages,
            settings.system_prompt.as_deref(),
        );
        let endpoint = settings.endpoint();

        self.presenter.present(SidebarEvent::LoadingStarted);
        let mut progress = Progress {
            loading: true,
            ..Default::default()
        };

        let result = self
            .stream_exchange(&ticket, &endpoint, &request, &mut progress)
            .await;
        self.finish_exchange(ticket, progress, result)
    }

    /// Dispatch the request and apply deltas to the draft until the body ends
    async fn stream_exchange(
        &self,
        ticket: &Ticket,
        endpoint: &Endpoint,
        request: &MessagesRequest,
        progress: &mut Progress,
    ) -> Result<StreamEnd> {
        let mut events = tokio::select! {
            biased;
            _ = ticket.cancel.cancelled() => return Ok(StreamEnd::Cancelled),
            events = self.client.stream(endpoint, request) => events?,
        };

        let token = {
            let mut state = self.handle.lock();
            if state.conversation.generation() != ticket.generation {
                return Ok(StreamEnd::Cancelled);
            }
            state.phase = Phase::Streaming;
            state.conversation.begin_draft()
        };
        progress.loading = false;
        self.presenter.present(SidebarEvent::LoadingFinished);
        self.presenter.present(SidebarEvent::DraftStarted);
        let token: &DraftToken = progress.draft.insert(token);

        let mut accumulated = String::new();
        let mut stopped = false;
        loop {
            let next = tokio::select! {
                biased;
                _ = ticket.cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                next = events.next() => next,
            };
            let Some(event) = next else {
                break;
            };

            let event = match event {
                Ok(event) => event,
                Err(err) if stopped => {
                    tracing::debug!("Ignoring body error after message_stop: {}", err);
                    break;
                }
                Err(err) => return Err(err.into()),
            };

            match event {
                StreamEvent::TextDelta(delta) if !stopped => {
                    accumulated.push_str(&delta);
                    let applied = self
                        .handle
                        .lock()
                        .conversation
                        .update_draft(token, accumulated.clone());
                    if !applied {
                        return Ok(StreamEnd::Cancelled);
                    }
                    self.presenter.present(SidebarEvent::DraftUpdated {
                        text: accumulated.clone(),
                    });
                }
                StreamEvent::MessageStop if !stopped => {
                    stopped = true;
                    self.set_phase(ticket, Phase::Finalizing);
                    self.presenter.present(SidebarEvent::DraftFinalized);
                }
                StreamEvent::Error(message) if !stopped => {
                    return Err(saidebar_ai::Error::Stream(message).into());
                }
                other => {
                    tracing::debug!("Ignoring {:?} after message_stop", other);
                }
            }
        }

        progress.finalized = stopped;
        Ok(StreamEnd::Finished)
    }

    /// Commit or roll back, then return to idle.
    ///
    /// Nothing is applied once the conversation has moved to a newer
    /// generation; the phase then belongs to whatever exchange came next.
    fn finish_exchange(
        &self,
        ticket: Ticket,
        mut progress: Progress,
        result: Result<StreamEnd>,
    ) -> Result<ExchangeOutcome> {
        match result {
            Ok(StreamEnd::Finished) => {
                let commit = {
                    let Some(mut state) = self.current(&ticket) else {
                        tracing::debug!("Conversation was reset, dropping exchange results");
                        return Ok(ExchangeOutcome::Cancelled);
                    };
                    let commit = progress
                        .draft
                        .take()
                        .map(|token| state.conversation.commit_draft(token));
                    state.phase = Phase::Idle;
                    commit
                };
                match commit {
                    Some(Commit::Committed) => {
                        if !progress.finalized {
                            self.presenter.present(SidebarEvent::DraftFinalized);
                        }
                        Ok(ExchangeOutcome::Completed)
                    }
                    Some(Commit::Empty) | None => {
                        self.presenter.present(SidebarEvent::DraftDiscarded);
                        Ok(ExchangeOutcome::Empty)
                    }
                    Some(Commit::Stale) => Ok(ExchangeOutcome::Cancelled),
                }
            }
            Ok(StreamEnd::Cancelled) => {
                self.rollback(&ticket, &mut progress);
                Ok(ExchangeOutcome::Cancelled)
            }
            Err(err) => {
                if !self.rollback(&ticket, &mut progress) {
                    tracing::debug!("Conversation was reset, dropping error: {}", err);
                    return Ok(ExchangeOutcome::Cancelled);
                }
                tracing::warn!("Exchange failed: {}", err);
                self.presenter.present(SidebarEvent::Error {
                    message: err.user_message(),
                });
                Err(err)
            }
        }
    }

    /// Undo the visible side effects of an exchange that will not be committed.
    ///
    /// Returns `false`, touching nothing, when the exchange is stale.
    fn rollback(&self, ticket: &Ticket, progress: &mut Progress) -> bool {
        let discarded = {
            let Some(mut state) = self.current(ticket) else {
                return false;
            };
            let discarded = progress
                .draft
                .take()
                .is_some_and(|token| state.conversation.discard_draft(token));
            state.phase = Phase::Idle;
            discarded
        };
        if progress.loading {
            progress.loading = false;
            self.presenter.present(SidebarEvent::LoadingFinished);
        }
        if discarded {
            self.presenter.present(SidebarEvent::DraftDiscarded);
        }
        true
    }

    /// The state, locked, if `ticket` still belongs to the current conversation
    fn current(&self, ticket: &Ticket) -> Option<MutexGuard<'_, SessionState>> {
        let state = self.handle.lock();
        (state.conversation.generation() == ticket.generation).then_some(state)
    }

    fn set_phase(&self, ticket: &Ticket, phase: Phase) {
        if let Some(mut state) = self.current(ticket) {
            state.phase = phase;
        }
    }

    /// Return to idle without streaming anything
    fn end_exchange(&self, ticket: &Ticket) {
        self.set_phase(ticket, Phase::Idle);
    }
}

/// Claim the session for a new exchange. `None` when one is already in flight.
fn begin_exchange(state: &mut SessionState) -> Option<Ticket> {
    if state.phase != Phase::Idle {
        return None;
    }
    state.phase = Phase::Sending;
    state.cancel = CancellationToken::new();
    Some(Ticket {
        generation: state.conversation.generation(),
        cancel: state.cancel.clone(),
    })
}
