//! Chat store
//!
//! Single source of truth for conversations, per-session message logs, the
//! active session and the agent catalog. All mutation goes through
//! `&mut self` methods on one owner; streamed events enter through
//! [`ChatStore::handle_event`] only.

use crate::ports::chat_api::{ChatApi, ChatApiError, SendMessagePayload, StreamHandle};
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger, event_types,
};
use chatpanel_domain::{
    CatalogFilter, ChatStreamEvent, DomainError, Message, MessageId, MessageLog, ModelCatalog,
    ModelSelection, Session, SessionId, StreamUpdate, UpdateKind,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Display name used for human messages unless configured otherwise.
pub const DEFAULT_USER_NAME: &str = "User";

/// Errors returned by store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Message content cannot be empty")]
    EmptyMessage,

    #[error("A response is still streaming in session {0}")]
    StreamInFlight(SessionId),

    #[error("Message not found: {0}")]
    UnknownMessage(MessageId),

    #[error("Message {0} cannot be retried")]
    NotRetryable(MessageId),

    #[error("Message {0} cannot be revised")]
    NotRevisable(MessageId),

    #[error("Chat API error: {0}")]
    Api(#[from] ChatApiError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// A message send request.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub text: String,
    pub selection: ModelSelection,
    /// Target session; `None` mints a new one.
    pub session_id: Option<SessionId>,
    pub credentials: HashMap<String, String>,
    /// Human message this one revises.
    pub revision_of: Option<MessageId>,
}

impl SendRequest {
    pub fn new(text: impl Into<String>, selection: ModelSelection) -> Self {
        Self {
            text: text.into(),
            selection,
            session_id: None,
            credentials: HashMap::new(),
            revision_of: None,
        }
    }

    pub fn in_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_credentials(mut self, credentials: HashMap<String, String>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn revising(mut self, message_id: MessageId) -> Self {
        self.revision_of = Some(message_id);
        self
    }
}

/// Result of a successful send or retry.
#[derive(Debug)]
pub struct SendReceipt {
    pub session_id: SessionId,
    /// The optimistic human message (absent for retries).
    pub human_message_id: Option<MessageId>,
    /// Whether the session id was minted by this send.
    pub new_session: bool,
    pub stream: StreamHandle,
}

/// What applying one stream event did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// `begin`: an AI message was created.
    Created {
        session_id: SessionId,
        message_id: MessageId,
    },
    /// `item`: a fragment was appended.
    Appended {
        session_id: SessionId,
        message_id: MessageId,
        fragment: String,
    },
    /// `end`: the message is complete.
    Finished {
        session_id: SessionId,
        message_id: MessageId,
    },
    /// The exchange completed.
    ExchangeDone { session_id: SessionId },
    /// The exchange failed; the AI message (if any) is marked error.
    ExchangeFailed {
        session_id: SessionId,
        message_id: Option<MessageId>,
        error: String,
    },
    /// The event did not apply (late, duplicate or unaddressed).
    Ignored,
}

/// Bookkeeping for the one exchange allowed in flight per session.
#[derive(Debug, Clone)]
struct Exchange {
    /// The human message that prompted this exchange.
    prompt_id: MessageId,
    /// Whether `prompt_id` was inserted optimistically by this exchange.
    optimistic: bool,
    /// Whether the session was minted by this exchange.
    new_session: bool,
    ai_message_id: Option<MessageId>,
    retry_of: Option<MessageId>,
    selection: ModelSelection,
    stop_requested: bool,
}

/// Owned, single-writer chat state.
pub struct ChatStore {
    api: Arc<dyn ChatApi>,
    conversation_logger: Arc<dyn ConversationLogger>,
    user_name: String,
    conversations: Vec<Session>,
    active_session: Option<SessionId>,
    logs: HashMap<SessionId, MessageLog>,
    catalog: ModelCatalog,
    in_flight: HashMap<SessionId, Exchange>,
    last_error: Option<String>,
}

impl ChatStore {
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self {
            api,
            conversation_logger: Arc::new(NoConversationLogger),
            user_name: DEFAULT_USER_NAME.to_string(),
            conversations: Vec::new(),
            active_session: None,
            logs: HashMap::new(),
            catalog: ModelCatalog::new(),
            in_flight: HashMap::new(),
            last_error: None,
        }
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    /// Author name recorded on human messages.
    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = name.into();
        self
    }

    // ==================== Queries ====================

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn conversations(&self) -> &[Session] {
        &self.conversations
    }

    pub fn session(&self, session_id: &SessionId) -> Option<&Session> {
        self.conversations.iter().find(|s| &s.id == session_id)
    }

    pub fn active_session(&self) -> Option<&SessionId> {
        self.active_session.as_ref()
    }

    /// Messages of a session in display order (empty if unknown).
    pub fn messages(&self, session_id: &SessionId) -> &[Message] {
        self.logs
            .get(session_id)
            .map(MessageLog::as_slice)
            .unwrap_or(&[])
    }

    /// Messages of the active session.
    pub fn active_messages(&self) -> &[Message] {
        match &self.active_session {
            Some(id) => self.messages(id),
            None => &[],
        }
    }

    pub fn message(&self, session_id: &SessionId, message_id: &MessageId) -> Option<&Message> {
        self.logs.get(session_id).and_then(|log| log.get(message_id))
    }

    /// Whether an exchange is in flight for the session.
    pub fn is_streaming(&self, session_id: &SessionId) -> bool {
        self.in_flight.contains_key(session_id)
    }

    /// The AI message currently receiving content in the session, if any.
    pub fn streaming_message(&self, session_id: &SessionId) -> Option<&Message> {
        let ai = self.in_flight.get(session_id)?.ai_message_id.as_ref()?;
        self.message(session_id, ai).filter(|m| m.is_running())
    }

    /// The most recent exchange failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ==================== Active session ====================

    /// Show an already loaded session without refetching it.
    pub fn set_active(&mut self, session_id: SessionId) {
        self.logs.entry(session_id.clone()).or_default();
        self.active_session = Some(session_id);
    }

    pub fn clear_active(&mut self) {
        self.active_session = None;
    }

    // ==================== Fetching ====================

    /// Load the catalog and keep the entries matching `filter`.
    ///
    /// On failure the previous catalog is kept.
    pub async fn fetch_agents(
        &mut self,
        filter: &CatalogFilter,
    ) -> Result<&ModelCatalog, StoreError> {
        match self.api.fetch_chat_models().await {
            Ok(catalog) => {
                self.catalog = catalog.filtered(filter);
                info!("Catalog loaded: {} entries", self.catalog.len());
                Ok(&self.catalog)
            }
            Err(e) => {
                warn!("Failed to fetch chat models: {}", e);
                Err(e.into())
            }
        }
    }

    /// Load a conversation's history and make it the active session.
    ///
    /// Returns the number of messages loaded. On failure no session is
    /// active afterwards.
    pub async fn fetch_messages(&mut self, session_id: &SessionId) -> Result<usize, StoreError> {
        let snapshot = match self.api.fetch_single_conversation(session_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to load conversation {}: {}", session_id, e);
                self.active_session = None;
                return Err(e.into());
            }
        };

        let mut log = MessageLog::from_unordered(snapshot.messages);
        if let Err(e) = log.validate_lineage(session_id) {
            warn!("Conversation {} has inconsistent lineage: {}", session_id, e);
        }

        // Keep a reply that is still streaming into this session.
        if let Some(exchange) = self.in_flight.get_mut(session_id)
            && let Some(previous) = self.logs.get(session_id)
        {
            // A new session's prompt may already be stored under the backend's id.
            if exchange.optimistic
                && exchange.new_session
                && !log.contains(&exchange.prompt_id)
                && let Some(prompt) = previous.get(&exchange.prompt_id)
                && let Some(stored) = log
                    .as_slice()
                    .iter()
                    .rev()
                    .find(|m| m.is_human() && m.content == prompt.content)
            {
                debug!("Prompt {} is {} on the backend", exchange.prompt_id, stored.id);
                exchange.prompt_id = stored.id.clone();
            }
            for id in [Some(&exchange.prompt_id), exchange.ai_message_id.as_ref()]
                .into_iter()
                .flatten()
            {
                if let Some(message) = previous.get(id)
                    && !log.contains(id)
                {
                    log.upsert(message.clone());
                }
            }
        }

        let count = log.len();
        self.logs.insert(session_id.clone(), log);
        self.upsert_conversation(snapshot.session);
        self.active_session = Some(session_id.clone());
        debug!("Loaded {} messages for session {}", count, session_id);
        Ok(count)
    }

    /// Reload the conversation list.
    ///
    /// Sessions created locally that the backend does not list yet are kept.
    pub async fn fetch_conversations(&mut self) -> Result<&[Session], StoreError> {
        let mut sessions = self.api.fetch_conversations().await.inspect_err(|e| {
            warn!("Failed to fetch conversations: {}", e);
        })?;
        for local in &self.conversations {
            if !sessions.iter().any(|s| s.id == local.id) {
                sessions.push(local.clone());
            }
        }
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        self.conversations = sessions;
        Ok(&self.conversations)
    }

    // ==================== Sending ====================

    /// Insert the human message optimistically and start the streamed reply.
    pub async fn send_message(&mut self, request: SendRequest) -> Result<SendReceipt, StoreError> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(StoreError::EmptyMessage);
        }

        let (session_id, new_session) = match request.session_id {
            Some(id) => (id, false),
            None => (SessionId::generate(), true),
        };
        if self.is_streaming(&session_id) {
            return Err(StoreError::StreamInFlight(session_id));
        }

        let log = self.logs.entry(session_id.clone()).or_default();
        if let Some(original) = &request.revision_of {
            match log.get(original) {
                Some(m) if m.is_human() => {}
                Some(_) => return Err(StoreError::NotRevisable(original.clone())),
                None => return Err(StoreError::UnknownMessage(original.clone())),
            }
        }

        let previous = log.last().map(|m| m.id.clone());
        let human_id = MessageId::generate();
        let mut human = Message::human(
            human_id.clone(),
            session_id.clone(),
            text,
            self.user_name.clone(),
        )
        .with_previous(previous.clone())
        .with_attribution(request.selection.attribution());
        human.lineage.revision_of = request.revision_of.clone();
        log.upsert(human);
        if let Some(original) = &request.revision_of
            && let Some(message) = log.get_mut(original)
        {
            message.add_alternative(human_id.clone());
        }

        match self.conversations.iter_mut().find(|s| s.id == session_id) {
            Some(session) => session.touch(),
            None => self
                .conversations
                .insert(0, Session::from_first_prompt(session_id.clone(), text)),
        }
        self.active_session = Some(session_id.clone());

        let payload = SendMessagePayload {
            message: text.to_string(),
            selection: request.selection.clone(),
            session_id: session_id.clone(),
            credentials: request.credentials,
            message_id: (!new_session).then(|| human_id.clone()),
            previous_message_id: if new_session { None } else { previous },
            retry_of: None,
            revision_of: request.revision_of,
        };
        let exchange = Exchange {
            prompt_id: human_id,
            optimistic: true,
            new_session,
            ai_message_id: None,
            retry_of: None,
            selection: request.selection,
            stop_requested: false,
        };
        self.start_exchange(payload, exchange).await
    }

    /// Ask again for the reply to the human message behind `message_id`.
    ///
    /// The next AI message of the session gets `retry_of = message_id` and
    /// is listed among the original's alternatives.
    pub async fn retry_message(
        &mut self,
        session_id: &SessionId,
        message_id: &MessageId,
        selection: ModelSelection,
        credentials: HashMap<String, String>,
    ) -> Result<SendReceipt, StoreError> {
        if self.is_streaming(session_id) {
            return Err(StoreError::StreamInFlight(session_id.clone()));
        }
        let log = self
            .logs
            .get(session_id)
            .ok_or_else(|| StoreError::UnknownMessage(message_id.clone()))?;
        let original = log
            .get(message_id)
            .ok_or_else(|| StoreError::UnknownMessage(message_id.clone()))?;
        if !original.is_ai() || original.is_running() {
            return Err(StoreError::NotRetryable(message_id.clone()));
        }
        let prompt = original
            .previous_message_id()
            .and_then(|id| log.get(id))
            .filter(|m| m.is_human())
            .ok_or_else(|| StoreError::NotRetryable(message_id.clone()))?;

        let payload = SendMessagePayload {
            message: prompt.content.clone(),
            selection: selection.clone(),
            session_id: session_id.clone(),
            credentials,
            message_id: None,
            previous_message_id: Some(prompt.id.clone()),
            retry_of: Some(message_id.clone()),
            revision_of: None,
        };
        let exchange = Exchange {
            prompt_id: prompt.id.clone(),
            optimistic: false,
            new_session: false,
            ai_message_id: None,
            retry_of: Some(message_id.clone()),
            selection,
            stop_requested: false,
        };
        self.active_session = Some(session_id.clone());
        self.start_exchange(payload, exchange).await
    }

    async fn start_exchange(
        &mut self,
        payload: SendMessagePayload,
        exchange: Exchange,
    ) -> Result<SendReceipt, StoreError> {
        let session_id = payload.session_id.clone();
        let log_payload = serde_json::json!({
            "session_id": session_id.as_str(),
            "message_id": exchange.prompt_id.as_str(),
            "provider": payload.selection.provider,
            "model": payload.selection.name,
            "retry_of": payload.retry_of.as_ref().map(MessageId::as_str),
            "revision_of": payload.revision_of.as_ref().map(MessageId::as_str),
            "bytes": payload.message.len(),
        });
        let human_message_id = exchange.optimistic.then(|| exchange.prompt_id.clone());
        let new_session = exchange.new_session;
        self.in_flight.insert(session_id.clone(), exchange);

        match self.api.send_message(payload).await {
            Ok(stream) => {
                info!("Message sent to session {}", session_id);
                self.conversation_logger.log(ConversationEvent::new(
                    event_types::MESSAGE_SENT,
                    log_payload,
                ));
                Ok(SendReceipt {
                    session_id,
                    human_message_id,
                    new_session,
                    stream,
                })
            }
            Err(e) => {
                warn!("Send to session {} rejected: {}", session_id, e);
                self.reject_exchange(&session_id);
                self.last_error = Some(e.to_string());
                self.conversation_logger.log(ConversationEvent::new(
                    event_types::SEND_REJECTED,
                    serde_json::json!({
                        "session_id": session_id.as_str(),
                        "error": e.to_string(),
                    }),
                ));
                Err(e.into())
            }
        }
    }

    /// Clear the in-flight marker of an exchange the backend refused to
    /// start, marking its optimistic human message as error.
    ///
    /// A session minted by the refused send is forgotten again.
    fn reject_exchange(&mut self, session_id: &SessionId) {
        let Some(exchange) = self.in_flight.remove(session_id) else {
            return;
        };
        if exchange.new_session {
            self.conversations.retain(|s| &s.id != session_id);
            self.logs.remove(session_id);
            if self.active_session.as_ref() == Some(session_id) {
                self.active_session = None;
            }
            return;
        }
        if exchange.optimistic
            && let Some(message) = self
                .logs
                .get_mut(session_id)
                .and_then(|log| log.get_mut(&exchange.prompt_id))
        {
            message.mark_error();
        }
    }

    /// Request that generation stops for the session.
    ///
    /// Returns `false` when nothing is streaming. The exchange stays in
    /// flight until its terminal event arrives.
    pub async fn stop_generation(&mut self, session_id: &SessionId) -> Result<bool, StoreError> {
        let Some(exchange) = self.in_flight.get_mut(session_id) else {
            return Ok(false);
        };
        if exchange.stop_requested {
            return Ok(true);
        }
        exchange.stop_requested = true;
        self.api.stop_generation(session_id).await?;
        info!("Stop requested for session {}", session_id);
        self.conversation_logger.log(ConversationEvent::new(
            event_types::GENERATION_STOPPED,
            serde_json::json!({ "session_id": session_id.as_str() }),
        ));
        Ok(true)
    }

    // ==================== Stream events ====================

    /// Apply one event from an exchange's stream.
    ///
    /// Events are routed by the session id they carry, so replies to a
    /// session that is no longer active land in that session's own log.
    pub fn handle_event(&mut self, event: ChatStreamEvent) -> ApplyOutcome {
        match event {
            ChatStreamEvent::Update(update) => self.apply_update(update),
            ChatStreamEvent::Done { session_id } => self.finish_exchange(&session_id),
            ChatStreamEvent::Error {
                session_id,
                message,
            } => self.fail_exchange(&session_id, message),
        }
    }

    /// Apply every event of `stream` until its terminal event.
    pub async fn drain(&mut self, stream: &mut StreamHandle) -> Vec<ApplyOutcome> {
        let mut outcomes = Vec::new();
        while let Some(event) = stream.recv().await {
            outcomes.push(self.handle_event(event));
        }
        outcomes
    }

    fn apply_update(&mut self, update: StreamUpdate) -> ApplyOutcome {
        let StreamUpdate {
            kind,
            content,
            metadata,
        } = update;
        let session_id = metadata.session_id;
        let message_id = metadata.message_id;

        match kind {
            UpdateKind::Begin => {
                let log = self.logs.entry(session_id.clone()).or_default();
                if log.contains(&message_id) {
                    debug!("Duplicate begin for message {}", message_id);
                    return ApplyOutcome::Ignored;
                }
                let mut exchange = self.in_flight.get_mut(&session_id);

                let mut previous = metadata.previous_message_id;
                // A new session's prompt gets its backend id with the first begin.
                if let Some(id) = &previous
                    && let Some(exchange) = exchange.as_deref_mut()
                    && exchange.optimistic
                    && exchange.new_session
                    && exchange.ai_message_id.is_none()
                    && !log.contains(id)
                    && log.rekey(&exchange.prompt_id, id.clone())
                {
                    debug!("Prompt {} is {} on the backend", exchange.prompt_id, id);
                    exchange.prompt_id = id.clone();
                }
                if let Some(id) = &previous
                    && !log.get(id).is_some_and(Message::is_human)
                {
                    warn!(
                        "Begin for {} points at {}, which is not a human message",
                        message_id, id
                    );
                    previous = None;
                }
                let previous = previous.or_else(|| exchange.as_ref().map(|e| e.prompt_id.clone()));

                let mut message =
                    Message::ai_placeholder(message_id.clone(), session_id.clone(), previous);
                let mut retry_of = None;
                if let Some(exchange) = exchange {
                    message = message
                        .with_attribution(exchange.selection.attribution())
                        .with_author(exchange.selection.name.clone());
                    message.lineage.retry_of = exchange.retry_of.clone();
                    retry_of = exchange.retry_of.clone();
                    exchange.ai_message_id = Some(message_id.clone());
                }
                log.upsert(message);
                if let Some(original) = retry_of
                    && let Some(original) = log.get_mut(&original)
                {
                    original.add_alternative(message_id.clone());
                }

                self.conversation_logger.log(ConversationEvent::new(
                    event_types::STREAM_BEGIN,
                    serde_json::json!({
                        "session_id": session_id.as_str(),
                        "message_id": message_id.as_str(),
                    }),
                ));
                ApplyOutcome::Created {
                    session_id,
                    message_id,
                }
            }
            UpdateKind::Item => {
                let Some(message) = self
                    .logs
                    .get_mut(&session_id)
                    .and_then(|log| log.get_mut(&message_id))
                else {
                    warn!("Item for unknown message {} (no begin)", message_id);
                    return ApplyOutcome::Ignored;
                };
                if !message.is_running() {
                    debug!("Item for finished message {} ignored", message_id);
                    return ApplyOutcome::Ignored;
                }
                message.append(&content);
                ApplyOutcome::Appended {
                    session_id,
                    message_id,
                    fragment: content,
                }
            }
            UpdateKind::End => {
                let Some(message) = self
                    .logs
                    .get_mut(&session_id)
                    .and_then(|log| log.get_mut(&message_id))
                else {
                    warn!("End for unknown message {}", message_id);
                    return ApplyOutcome::Ignored;
                };
                if !message.is_running() {
                    return ApplyOutcome::Ignored;
                }
                message.mark_success();
                self.conversation_logger.log(ConversationEvent::new(
                    event_types::STREAM_END,
                    serde_json::json!({
                        "session_id": session_id.as_str(),
                        "message_id": message_id.as_str(),
                        "bytes": message.content.len(),
                    }),
                ));
                ApplyOutcome::Finished {
                    session_id,
                    message_id,
                }
            }
        }
    }

    fn finish_exchange(&mut self, session_id: &SessionId) -> ApplyOutcome {
        let Some(exchange) = self.in_flight.remove(session_id) else {
            debug!("Done for session {} with no exchange in flight", session_id);
            return ApplyOutcome::Ignored;
        };
        if let Some(ai) = &exchange.ai_message_id
            && let Some(message) = self
                .logs
                .get_mut(session_id)
                .and_then(|log| log.get_mut(ai))
            && message.is_running()
        {
            message.mark_success();
        }
        if let Some(session) = self.conversations.iter_mut().find(|s| &s.id == session_id) {
            session.touch();
        }
        self.conversation_logger.log(ConversationEvent::new(
            event_types::EXCHANGE_DONE,
            serde_json::json!({
                "session_id": session_id.as_str(),
                "message_id": exchange.ai_message_id.as_ref().map(MessageId::as_str),
                "stopped": exchange.stop_requested,
            }),
        ));
        ApplyOutcome::ExchangeDone {
            session_id: session_id.clone(),
        }
    }

    fn fail_exchange(&mut self, session_id: &SessionId, error: String) -> ApplyOutcome {
        let Some(exchange) = self.in_flight.remove(session_id) else {
            debug!("Error for session {} with no exchange in flight", session_id);
            return ApplyOutcome::Ignored;
        };
        warn!("Exchange in session {} failed: {}", session_id, error);
        if let Some(ai) = &exchange.ai_message_id
            && let Some(message) = self
                .logs
                .get_mut(session_id)
                .and_then(|log| log.get_mut(ai))
            && message.is_running()
        {
            message.mark_error();
        }
        self.last_error = Some(error.clone());
        self.conversation_logger.log(ConversationEvent::new(
            event_types::EXCHANGE_ERROR,
            serde_json::json!({
                "session_id": session_id.as_str(),
                "message_id": exchange.ai_message_id.as_ref().map(MessageId::as_str),
                "error": error,
            }),
        ));
        ApplyOutcome::ExchangeFailed {
            session_id: session_id.clone(),
            message_id: exchange.ai_message_id,
            error,
        }
    }

    fn upsert_conversation(&mut self, session: Session) {
        match self.conversations.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session,
            None => self.conversations.insert(0, session),
        }
    }
}
