//! Chat View
//!
//! Drives the chat panel: mounts on a route, pre-selects a model, submits
//! prompts through the [`ChatStore`], pumps streamed events into it and
//! moves the coarse [`ViewState`] from `New` to `Active` on the first send.
//! Emits [`ViewEvent`]s to a channel for the presentation layer to render.

use crate::config::ChatViewConfig;
use crate::ports::credentials::{
    CredentialError, CredentialProvider, NoCredentials, resolve_credentials,
};
use crate::ports::navigator::{Navigator, NoNavigation};
use crate::ports::selection_store::{NoSelectionStore, SelectionStore};
use crate::ports::ui_event::ViewEvent;
use crate::store::{ApplyOutcome, ChatStore, SendReceipt, SendRequest, StoreError};
use chatpanel_domain::{
    ChatRoute, ChatStreamEvent, DomainError, Message, MessageId, ModelCatalog, ModelSelection,
    Session, SessionId, ViewState,
};
use futures::StreamExt;
use futures::stream::{BoxStream, SelectAll};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Errors returned by view operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("No model selected")]
    NoModelSelected,

    #[error("No session is open")]
    NoActiveSession,

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// What a successful submit, retry or edit started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub session_id: SessionId,
    /// The new human message, absent for retries.
    pub human_message_id: Option<MessageId>,
}

/// What the panel shows at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub route: ChatRoute,
    pub state: ViewState,
    /// Present only while no session is open.
    pub greeting: Option<String>,
    /// The live region; present only in `Active`.
    pub message_log: Option<Vec<Message>>,
    pub input: String,
    pub selection: Option<ModelSelection>,
    /// Whether the model selector has anything to offer.
    pub selector_enabled: bool,
    pub send_enabled: bool,
    pub streaming: bool,
    pub last_error: Option<String>,
}

/// Chat panel controller
///
/// Owns the [`ChatStore`]; every store mutation goes through this value.
pub struct ChatView {
    store: ChatStore,
    config: ChatViewConfig,
    selection_store: Arc<dyn SelectionStore>,
    credentials: Arc<dyn CredentialProvider>,
    navigator: Arc<dyn Navigator>,
    /// Channel sender for view events
    tx: mpsc::UnboundedSender<ViewEvent>,
    route: ChatRoute,
    state: ViewState,
    input: String,
    selection: Option<ModelSelection>,
    /// Open exchange streams, possibly for several sessions.
    streams: SelectAll<BoxStream<'static, ChatStreamEvent>>,
}

impl ChatView {
    pub fn new(
        store: ChatStore,
        config: ChatViewConfig,
        tx: mpsc::UnboundedSender<ViewEvent>,
    ) -> Self {
        Self {
            store,
            config,
            selection_store: Arc::new(NoSelectionStore),
            credentials: Arc::new(NoCredentials),
            navigator: Arc::new(NoNavigation),
            tx,
            route: ChatRoute::new_session(),
            state: ViewState::New,
            input: String::new(),
            selection: None,
            streams: SelectAll::new(),
        }
    }

    pub fn with_selection_store(mut self, store: Arc<dyn SelectionStore>) -> Self {
        self.selection_store = store;
        self
    }

    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = provider;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    // ==================== Accessors ====================

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn route(&self) -> &ChatRoute {
        &self.route
    }

    pub fn selection(&self) -> Option<&ModelSelection> {
        self.selection.as_ref()
    }

    pub fn catalog(&self) -> &ModelCatalog {
        self.store.catalog()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Whether the open session has a reply streaming.
    pub fn is_streaming(&self) -> bool {
        self.state
            .session_id()
            .is_some_and(|id| self.store.is_streaming(id))
    }

    /// Whether any exchange stream is still open.
    pub fn has_open_streams(&self) -> bool {
        !self.streams.is_empty()
    }

    /// The most recent AI message of the open session that can be retried.
    pub fn last_retryable(&self) -> Option<&Message> {
        let session_id = self.state.session_id()?;
        self.store
            .messages(session_id)
            .iter()
            .rev()
            .find(|m| m.is_ai() && !m.is_running())
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let message_log = self
            .state
            .session_id()
            .map(|id| self.store.messages(id).to_vec());
        let streaming = self.is_streaming();
        ViewSnapshot {
            route: self.route.clone(),
            state: self.state.clone(),
            greeting: (!self.state.is_active()).then(|| self.config.greeting.clone()),
            message_log,
            input: self.input.clone(),
            selection: self.selection.clone(),
            selector_enabled: !self.store.catalog().is_empty(),
            send_enabled: !streaming && self.selection.is_some(),
            streaming,
            last_error: self.store.last_error().map(str::to_string),
        }
    }

    // ==================== Mount ====================

    /// Mount the view on `route`: load the catalog, pre-select a model and,
    /// for a session route, load its history.
    ///
    /// Streams of earlier exchanges keep being pumped into their own
    /// sessions.
    pub async fn mount(&mut self, route: ChatRoute) {
        info!("Mounting chat view on {}", route);
        self.state = ViewState::for_session(route.session_id.clone());
        self.route = route;
        self.input.clear();

        let loaded = self
            .store
            .fetch_agents(&self.config.catalog_filter)
            .await
            .map(ModelCatalog::len);
        match loaded {
            Ok(entries) => self.emit(ViewEvent::CatalogLoaded { entries }),
            Err(e) => self.emit(ViewEvent::CatalogUnavailable {
                error: e.to_string(),
            }),
        }
        self.selection = self.preselect();

        match self.route.session_id.clone() {
            Some(session_id) => match self.store.fetch_messages(&session_id).await {
                Ok(messages) => self.emit(ViewEvent::HistoryLoaded {
                    session_id,
                    messages,
                }),
                Err(e) => {
                    warn!("Showing a new session instead of {}", session_id);
                    self.state = ViewState::New;
                    self.emit(ViewEvent::HistoryLoadFailed {
                        session_id,
                        error: e.to_string(),
                    });
                }
            },
            None => self.store.clear_active(),
        }

        self.emit(ViewEvent::Mounted {
            state: self.state.clone(),
            selection: self.selection.clone(),
        });
    }

    /// Selection for a fresh mount: route query, then last used, then none.
    fn preselect(&self) -> Option<ModelSelection> {
        let catalog = self.store.catalog();
        if let Some(agent_id) = &self.route.agent_id {
            match catalog.find_agent(agent_id) {
                Some(entry) => return Some(entry.into()),
                None => warn!("Agent '{}' from the route is not in the catalog", agent_id),
            }
        }
        if let Some(workflow_id) = &self.route.workflow_id {
            match catalog.find_workflow(workflow_id) {
                Some(entry) => return Some(entry.into()),
                None => warn!(
                    "Workflow '{}' from the route is not in the catalog",
                    workflow_id
                ),
            }
        }
        let last = self.selection_store.load_last_selection()?;
        if !catalog.is_empty() && !catalog.entries().any(|entry| last.matches(entry)) {
            debug!("Last used selection {} is no longer offered", last);
            return None;
        }
        Some(last)
    }

    /// Open an existing session.
    pub async fn open_session(&mut self, session_id: SessionId) {
        let route = ChatRoute::session(session_id);
        self.navigator.replace(&route);
        self.mount(route).await;
    }

    /// Start over with a new session.
    pub async fn new_session(&mut self) {
        let route = ChatRoute::new_session();
        self.navigator.replace(&route);
        self.mount(route).await;
    }

    /// Known sessions, most recently updated first.
    pub async fn list_sessions(&mut self) -> Result<Vec<Session>, ViewError> {
        Ok(self.store.fetch_conversations().await?.to_vec())
    }

    // ==================== Input ====================

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Select a model and remember it as the last used one.
    pub fn select_model(&mut self, selection: ModelSelection) {
        self.selection_store.save_last_selection(&selection);
        self.selection = Some(selection.clone());
        self.emit(ViewEvent::SelectionChanged(selection));
    }

    /// Send the current input.
    ///
    /// The input is kept when the submit is refused up front (blank text,
    /// no model, a reply still streaming, missing credentials) and cleared
    /// before the send is issued otherwise.
    pub async fn submit(&mut self) -> Result<Submitted, ViewError> {
        if self.input.trim().is_empty() {
            return Err(StoreError::EmptyMessage.into());
        }
        let selection = self.selection.clone().ok_or(ViewError::NoModelSelected)?;
        let session_id = self.state.session_id().cloned();
        if let Some(id) = &session_id
            && self.store.is_streaming(id)
        {
            return Err(StoreError::StreamInFlight(id.clone()).into());
        }
        let credentials = resolve_credentials(self.credentials.as_ref(), &selection)?;

        let text = std::mem::take(&mut self.input);
        self.emit(ViewEvent::InputCleared);

        let mut request = SendRequest::new(text, selection).with_credentials(credentials);
        if let Some(id) = session_id {
            request = request.in_session(id);
        }
        let result = self.store.send_message(request).await;
        self.accept_receipt(result)
    }

    /// Ask again for the reply `message_id` in the open session.
    pub async fn retry(&mut self, message_id: &MessageId) -> Result<Submitted, ViewError> {
        let session_id = self
            .state
            .session_id()
            .cloned()
            .ok_or(ViewError::NoActiveSession)?;
        let selection = self.selection.clone().ok_or(ViewError::NoModelSelected)?;
        let credentials = resolve_credentials(self.credentials.as_ref(), &selection)?;
        let result = self
            .store
            .retry_message(&session_id, message_id, selection, credentials)
            .await;
        self.accept_receipt(result)
    }

    /// Send `text` as a revision of the human message `message_id`.
    pub async fn edit_and_resend(
        &mut self,
        message_id: &MessageId,
        text: impl Into<String>,
    ) -> Result<Submitted, ViewError> {
        let session_id = self
            .state
            .session_id()
            .cloned()
            .ok_or(ViewError::NoActiveSession)?;
        let selection = self.selection.clone().ok_or(ViewError::NoModelSelected)?;
        let credentials = resolve_credentials(self.credentials.as_ref(), &selection)?;
        let request = SendRequest::new(text, selection)
            .in_session(session_id)
            .with_credentials(credentials)
            .revising(message_id.clone());
        let result = self.store.send_message(request).await;
        self.accept_receipt(result)
    }

    fn accept_receipt(
        &mut self,
        result: Result<SendReceipt, StoreError>,
    ) -> Result<Submitted, ViewError> {
        let receipt = match result {
            Ok(receipt) => receipt,
            Err(e) => {
                self.emit(ViewEvent::SendFailed {
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };

        if let Some(human) = receipt
            .human_message_id
            .as_ref()
            .and_then(|id| self.store.message(&receipt.session_id, id))
            .cloned()
        {
            self.emit(ViewEvent::MessageAdded(human));
        }

        if receipt.new_session {
            let transition = self.state.activate(receipt.session_id.clone())?;
            self.route = self.route.with_session(receipt.session_id.clone());
            self.navigator.replace(&self.route);
            info!("Session {} activated", receipt.session_id);
            self.emit(ViewEvent::SessionActivated {
                transition,
                route: self.route.clone(),
            });
        }

        let submitted = Submitted {
            session_id: receipt.session_id,
            human_message_id: receipt.human_message_id,
        };
        self.streams.push(receipt.stream.into_stream().boxed());
        Ok(submitted)
    }

    // ==================== Streaming ====================

    /// Apply the next streamed event from any open exchange.
    ///
    /// Returns `None` once no stream is open.
    pub async fn pump(&mut self) -> Option<ApplyOutcome> {
        let event = self.streams.next().await?;
        let outcome = self.store.handle_event(event);
        self.emit_outcome(&outcome);
        Some(outcome)
    }

    /// Pump until every open stream has delivered its terminal event.
    pub async fn run_until_idle(&mut self) {
        while self.pump().await.is_some() {}
    }

    /// Stop the reply streaming into the open session.
    ///
    /// Returns `false` when nothing was streaming.
    pub async fn stop(&mut self) -> Result<bool, ViewError> {
        let Some(session_id) = self.state.session_id().cloned() else {
            return Ok(false);
        };
        let stopped = self.store.stop_generation(&session_id).await?;
        if stopped {
            self.emit(ViewEvent::GenerationStopped { session_id });
        }
        Ok(stopped)
    }

    fn emit_outcome(&self, outcome: &ApplyOutcome) {
        let event = match outcome.clone() {
            ApplyOutcome::Created {
                session_id,
                message_id,
            } => ViewEvent::StreamStarted {
                session_id,
                message_id,
            },
            ApplyOutcome::Appended {
                session_id,
                message_id,
                fragment,
            } => ViewEvent::StreamFragment {
                session_id,
                message_id,
                fragment,
            },
            ApplyOutcome::Finished {
                session_id,
                message_id,
            } => ViewEvent::StreamFinished {
                session_id,
                message_id,
            },
            ApplyOutcome::ExchangeDone { session_id } => ViewEvent::ExchangeDone { session_id },
            ApplyOutcome::ExchangeFailed {
                session_id,
                message_id,
                error,
            } => ViewEvent::ExchangeFailed {
                session_id,
                message_id,
                error,
            },
            ApplyOutcome::Ignored => return,
        };
        self.emit(event);
    }

    fn emit(&self, event: ViewEvent) {
        let _ = self.tx.send(event);
    }
}
