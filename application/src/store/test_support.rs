//! Scripted ChatApi used by the store and view tests.

use crate::ports::chat_api::{
    ChatApi, ChatApiError, ConversationSnapshot, SendMessagePayload, StreamHandle,
};
use async_trait::async_trait;
use chatpanel_domain::{
    CatalogEntry, ChatStreamEvent, MessageId, ModelCatalog, ModelSelection, Session, SessionId,
    StreamUpdate, UpdateMetadata,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// How the mock answers the next sends.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// begin, one item per fragment, end, done
    Fragments(Vec<String>),
    /// begin, one item per fragment, then an error
    FailAfter(Vec<String>, String),
    /// The send itself is refused.
    Reject(ChatApiError),
    /// Nothing is sent; the test drives the stream through `sender()`.
    Manual,
}

pub(crate) struct MockChatApi {
    catalog: Mutex<Result<ModelCatalog, ChatApiError>>,
    conversations: Mutex<HashMap<SessionId, Result<ConversationSnapshot, ChatApiError>>>,
    reply: Mutex<Reply>,
    sent: Mutex<Vec<SendMessagePayload>>,
    senders: Mutex<Vec<mpsc::Sender<ChatStreamEvent>>>,
    stops: Mutex<Vec<SessionId>>,
    catalog_calls: AtomicUsize,
    replies: AtomicUsize,
}

impl MockChatApi {
    pub(crate) fn new() -> Self {
        Self {
            catalog: Mutex::new(Ok(sample_catalog())),
            conversations: Mutex::new(HashMap::new()),
            reply: Mutex::new(Reply::Fragments(vec!["Hel".into(), "lo".into()])),
            sent: Mutex::new(Vec::new()),
            senders: Mutex::new(Vec::new()),
            stops: Mutex::new(Vec::new()),
            catalog_calls: AtomicUsize::new(0),
            replies: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_reply(self, reply: Reply) -> Self {
        *self.reply.lock().unwrap() = reply;
        self
    }

    pub(crate) fn with_catalog(self, catalog: Result<ModelCatalog, ChatApiError>) -> Self {
        *self.catalog.lock().unwrap() = catalog;
        self
    }

    pub(crate) fn with_conversation(self, snapshot: ConversationSnapshot) -> Self {
        self.conversations
            .lock()
            .unwrap()
            .insert(snapshot.session.id.clone(), Ok(snapshot));
        self
    }

    pub(crate) fn with_missing_conversation(self, session_id: SessionId) -> Self {
        self.conversations
            .lock()
            .unwrap()
            .insert(session_id.clone(), Err(ChatApiError::NotFound(session_id)));
        self
    }

    /// Replace what the backend has stored for a session.
    pub(crate) fn put_conversation(&self, snapshot: ConversationSnapshot) {
        self.conversations
            .lock()
            .unwrap()
            .insert(snapshot.session.id.clone(), Ok(snapshot));
    }

    pub(crate) fn set_catalog(&self, catalog: Result<ModelCatalog, ChatApiError>) {
        *self.catalog.lock().unwrap() = catalog;
    }

    pub(crate) fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub(crate) fn sent(&self) -> Vec<SendMessagePayload> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn stops(&self) -> Vec<SessionId> {
        self.stops.lock().unwrap().clone()
    }

    pub(crate) fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }

    /// Sender of the n-th `Manual` exchange.
    pub(crate) fn sender(&self, index: usize) -> mpsc::Sender<ChatStreamEvent> {
        self.senders.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ChatApi for MockChatApi {
    async fn fetch_chat_models(&self) -> Result<ModelCatalog, ChatApiError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.catalog.lock().unwrap().clone()
    }

    async fn fetch_single_conversation(
        &self,
        session_id: &SessionId,
    ) -> Result<ConversationSnapshot, ChatApiError> {
        self.conversations
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_else(|| Err(ChatApiError::NotFound(session_id.clone())))
    }

    async fn fetch_conversations(&self) -> Result<Vec<Session>, ChatApiError> {
        Ok(self
            .conversations
            .lock()
            .unwrap()
            .values()
            .filter_map(|c| c.as_ref().ok().map(|c| c.session.clone()))
            .collect())
    }

    async fn send_message(
        &self,
        payload: SendMessagePayload,
    ) -> Result<StreamHandle, ChatApiError> {
        let reply = self.reply.lock().unwrap().clone();
        if let Reply::Reject(error) = &reply {
            return Err(error.clone());
        }
        self.sent.lock().unwrap().push(payload.clone());

        let n = self.replies.fetch_add(1, Ordering::SeqCst);
        let metadata = UpdateMetadata {
            message_id: MessageId::new(format!("ai-{}", n + 1)),
            session_id: payload.session_id.clone(),
            previous_message_id: payload.message_id.clone(),
        };
        let (tx, handle) = StreamHandle::channel(payload.session_id.clone());
        let scripted = |fragments: &[String]| {
            let mut events = vec![ChatStreamEvent::Update(StreamUpdate::begin(metadata.clone()))];
            events.extend(fragments.iter().map(|f| {
                ChatStreamEvent::Update(StreamUpdate::item(metadata.clone(), f.clone()))
            }));
            events
        };
        let events = match reply {
            Reply::Fragments(fragments) => {
                let mut events = scripted(&fragments);
                events.push(ChatStreamEvent::Update(StreamUpdate::end(metadata.clone())));
                events.push(ChatStreamEvent::Done {
                    session_id: payload.session_id.clone(),
                });
                events
            }
            Reply::FailAfter(fragments, error) => {
                let mut events = scripted(&fragments);
                events.push(ChatStreamEvent::Error {
                    session_id: payload.session_id.clone(),
                    message: error,
                });
                events
            }
            Reply::Manual | Reply::Reject(_) => Vec::new(),
        };
        for event in events {
            tx.try_send(event).unwrap();
        }
        // Keep the sender alive so the handle does not synthesize a close error.
        self.senders.lock().unwrap().push(tx);
        Ok(handle)
    }

    async fn stop_generation(&self, session_id: &SessionId) -> Result<(), ChatApiError> {
        self.stops.lock().unwrap().push(session_id.clone());
        Ok(())
    }
}

pub(crate) fn sample_catalog() -> ModelCatalog {
    let mut catalog = ModelCatalog::new();
    catalog.insert(CatalogEntry::model("openai", "gpt-4o"));
    catalog.insert(CatalogEntry::model("openai", "gpt-4o-mini"));
    catalog.insert(CatalogEntry::agent(
        chatpanel_domain::CUSTOM_AGENT_PROVIDER,
        "agent-7",
        "Release notes writer",
    ));
    catalog.insert(CatalogEntry::workflow(
        chatpanel_domain::CUSTOM_AGENT_PROVIDER,
        "wf-3",
        "Triage workflow",
    ));
    catalog
}

pub(crate) fn gpt4o() -> ModelSelection {
    ModelSelection::from(&CatalogEntry::model("openai", "gpt-4o"))
}
