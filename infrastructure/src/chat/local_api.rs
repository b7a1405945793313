//! Offline chat backend
//!
//! [`LocalChatApi`] implements the [`ChatApi`] port without a network: the
//! catalog and stored conversations come from a fixture (or a built-in
//! catalog), and replies are rendered from a template and streamed in
//! fragments by a tokio task. Stopping a reply cancels the task's
//! [`CancellationToken`]; the reply then ends with what was produced so far.

use super::fixture::{Fixture, FixtureError};
use async_trait::async_trait;
use chatpanel_application::{
    ChatApi, ChatApiError, ConversationSnapshot, SendMessagePayload, StreamHandle,
};
use chatpanel_domain::{
    CUSTOM_AGENT_PROVIDER, CatalogEntry, ChatStreamEvent, Message, MessageId, ModelCatalog,
    Session, SessionId, StreamUpdate, UpdateMetadata,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Provider name of the built-in catalog's models.
pub const LOCAL_PROVIDER: &str = "local";

/// Reply rendering and pacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalReplySettings {
    /// `{prompt}` and `{model}` are substituted.
    pub template: String,
    /// Characters per fragment (at least one).
    pub chunk_size: usize,
    pub chunk_delay: Duration,
}

impl Default for LocalReplySettings {
    fn default() -> Self {
        Self {
            template: crate::config::DEFAULT_REPLY_TEMPLATE.to_string(),
            chunk_size: 12,
            chunk_delay: Duration::from_millis(40),
        }
    }
}

impl LocalReplySettings {
    fn render(&self, prompt: &str, model: &str) -> String {
        self.template
            .replace("{model}", model)
            .replace("{prompt}", prompt)
    }

    fn chunks(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.chunk_size.max(1))
            .map(|chunk| chunk.iter().collect())
            .collect()
    }
}

type Conversations = Arc<Mutex<HashMap<SessionId, ConversationSnapshot>>>;
type Running = Arc<Mutex<HashMap<SessionId, CancellationToken>>>;

/// What the reply task records once it finishes.
struct ReplyRecord {
    message: Message,
    retry_of: Option<MessageId>,
}

/// In-process [`ChatApi`] implementation.
pub struct LocalChatApi {
    catalog: ModelCatalog,
    conversations: Conversations,
    running: Running,
    settings: LocalReplySettings,
}

impl LocalChatApi {
    pub fn new(catalog: ModelCatalog) -> Self {
        Self {
            catalog,
            conversations: Arc::new(Mutex::new(HashMap::new())),
            running: Arc::new(Mutex::new(HashMap::new())),
            settings: LocalReplySettings::default(),
        }
    }

    /// Backend with the built-in catalog and no stored conversations.
    pub fn builtin() -> Self {
        Self::new(builtin_catalog())
    }

    /// Backend seeded from a JSON fixture.
    ///
    /// An empty fixture catalog falls back to the built-in one.
    pub fn from_fixture(path: &Path) -> Result<Self, FixtureError> {
        let fixture = Fixture::load(path)?;
        info!(
            "Loaded fixture {}: {} catalog entries, {} conversations",
            path.display(),
            fixture.catalog.len(),
            fixture.conversations.len()
        );
        Ok(Self::from(fixture))
    }

    pub fn with_settings(mut self, settings: LocalReplySettings) -> Self {
        self.settings = settings;
        self
    }

    fn conversations(&self) -> MutexGuard<'_, HashMap<SessionId, ConversationSnapshot>> {
        lock(&self.conversations)
    }

    /// Record the human side of an exchange and return the prompt's id.
    fn record_prompt(&self, payload: &SendMessagePayload) -> MessageId {
        let mut conversations = self.conversations();
        let snapshot = conversations
            .entry(payload.session_id.clone())
            .or_insert_with(|| ConversationSnapshot {
                session: Session::from_first_prompt(payload.session_id.clone(), &payload.message),
                messages: Vec::new(),
            });
        snapshot.session.touch();

        if payload.retry_of.is_some()
            && let Some(previous) = &payload.previous_message_id
        {
            return previous.clone();
        }

        let id = payload.message_id.clone().unwrap_or_else(MessageId::generate);
        let mut human = Message::human(
            id.clone(),
            payload.session_id.clone(),
            payload.message.clone(),
            chatpanel_application::DEFAULT_USER_NAME,
        )
        .with_previous(payload.previous_message_id.clone())
        .with_attribution(payload.selection.attribution());
        human.lineage.revision_of = payload.revision_of.clone();
        if let Some(original) = &payload.revision_of
            && let Some(message) = snapshot.messages.iter_mut().find(|m| &m.id == original)
        {
            message.add_alternative(id.clone());
        }
        snapshot.messages.push(human);
        id
    }
}

impl From<Fixture> for LocalChatApi {
    fn from(fixture: Fixture) -> Self {
        let catalog = if fixture.catalog.is_empty() {
            builtin_catalog()
        } else {
            fixture.catalog
        };
        let api = Self::new(catalog);
        api.conversations().extend(
            fixture
                .conversations
                .into_iter()
                .map(|c| (c.session.id.clone(), c)),
        );
        api
    }
}

/// Catalog offered when no fixture provides one.
pub fn builtin_catalog() -> ModelCatalog {
    let mut catalog = ModelCatalog::new();
    catalog.insert(
        CatalogEntry::model(LOCAL_PROVIDER, "echo")
            .with_description("Repeats your prompt back"),
    );
    catalog.insert(
        CatalogEntry::agent(CUSTOM_AGENT_PROVIDER, "echo-agent", "Echo agent")
            .with_description("Custom agent that needs no credentials"),
    );
    catalog.insert(CatalogEntry::workflow(
        CUSTOM_AGENT_PROVIDER,
        "echo-workflow",
        "Echo workflow",
    ));
    catalog
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ChatApi for LocalChatApi {
    async fn fetch_chat_models(&self) -> Result<ModelCatalog, ChatApiError> {
        Ok(self.catalog.clone())
    }

    async fn fetch_single_conversation(
        &self,
        session_id: &SessionId,
    ) -> Result<ConversationSnapshot, ChatApiError> {
        self.conversations()
            .get(session_id)
            .cloned()
            .ok_or_else(|| ChatApiError::NotFound(session_id.clone()))
    }

    async fn fetch_conversations(&self) -> Result<Vec<Session>, ChatApiError> {
        let mut sessions: Vec<Session> = self
            .conversations()
            .values()
            .map(|c| c.session.clone())
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn send_message(
        &self,
        payload: SendMessagePayload,
    ) -> Result<StreamHandle, ChatApiError> {
        if !self
            .catalog
            .entries()
            .any(|entry| payload.selection.matches(entry))
        {
            return Err(ChatApiError::Rejected(format!(
                "unknown model {}",
                payload.selection
            )));
        }
        if lock(&self.running).contains_key(&payload.session_id) {
            return Err(ChatApiError::Rejected(format!(
                "a reply is already running in session {}",
                payload.session_id
            )));
        }

        // A new session's prompt is only known by this id, so begin always carries it.
        let prompt_id = self.record_prompt(&payload);
        let ai_id = MessageId::generate();
        let metadata = UpdateMetadata {
            message_id: ai_id.clone(),
            session_id: payload.session_id.clone(),
            previous_message_id: Some(prompt_id.clone()),
        };

        let text = self
            .settings
            .render(&payload.message, &payload.selection.name);
        let chunks = self.settings.chunks(&text);
        let mut message =
            Message::ai_placeholder(ai_id, payload.session_id.clone(), Some(prompt_id))
                .with_attribution(payload.selection.attribution())
                .with_author(payload.selection.name.clone());
        message.lineage.retry_of = payload.retry_of.clone();
        let record = ReplyRecord {
            message,
            retry_of: payload.retry_of.clone(),
        };

        let token = CancellationToken::new();
        lock(&self.running).insert(payload.session_id.clone(), token.clone());
        let (tx, handle) = StreamHandle::channel(payload.session_id.clone());
        debug!(
            "Streaming {} fragments into session {}",
            chunks.len(),
            payload.session_id
        );

        let task = ReplyTask {
            tx,
            metadata,
            chunks,
            delay: self.settings.chunk_delay,
            token,
            record,
            conversations: self.conversations.clone(),
            running: self.running.clone(),
        };
        tokio::spawn(task.run());
        Ok(handle)
    }

    async fn stop_generation(&self, session_id: &SessionId) -> Result<(), ChatApiError> {
        match lock(&self.running).get(session_id) {
            Some(token) => {
                info!("Stopping reply in session {}", session_id);
                token.cancel();
            }
            None => debug!("Nothing to stop in session {}", session_id),
        }
        Ok(())
    }
}

/// One streamed reply, run on its own tokio task.
struct ReplyTask {
    tx: mpsc::Sender<ChatStreamEvent>,
    metadata: UpdateMetadata,
    chunks: Vec<String>,
    delay: Duration,
    token: CancellationToken,
    record: ReplyRecord,
    conversations: Conversations,
    running: Running,
}

impl ReplyTask {
    async fn run(self) {
        let ReplyTask {
            tx,
            metadata,
            chunks,
            delay,
            token,
            mut record,
            conversations,
            running,
        } = self;
        let session_id = metadata.session_id.clone();
        let mut delivered = tx
            .send(ChatStreamEvent::Update(StreamUpdate::begin(metadata.clone())))
            .await
            .is_ok();

        for chunk in chunks {
            if !delivered {
                break;
            }
            if !delay.is_zero() {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            } else if token.is_cancelled() {
                break;
            }
            record.message.append(&chunk);
            delivered = tx
                .send(ChatStreamEvent::Update(StreamUpdate::item(
                    metadata.clone(),
                    chunk,
                )))
                .await
                .is_ok();
        }

        if token.is_cancelled() {
            info!("Reply in session {} stopped", session_id);
        }
        if delivered {
            record.message.mark_success();
        } else {
            warn!("Receiver for session {} went away", session_id);
            record.message.mark_error();
        }

        // The reply is stored and the session free again before the caller
        // sees the terminal event.
        record.store(&conversations, &session_id);
        lock(&running).remove(&session_id);

        if delivered {
            let _ = tx
                .send(ChatStreamEvent::Update(StreamUpdate::end(metadata)))
                .await;
            let _ = tx.send(ChatStreamEvent::Done { session_id }).await;
        }
    }
}

impl ReplyRecord {
    fn store(self, conversations: &Conversations, session_id: &SessionId) {
        let mut conversations = lock(conversations);
        let Some(snapshot) = conversations.get_mut(session_id) else {
            return;
        };
        let id = self.message.id.clone();
        if let Some(original) = &self.retry_of
            && let Some(message) = snapshot.messages.iter_mut().find(|m| &m.id == original)
        {
            message.add_alternative(id);
        }
        snapshot.messages.push(self.message);
        snapshot.session.touch();
    }
}
