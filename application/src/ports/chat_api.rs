//! Chat API port
//!
//! Defines the interface for talking to the chat backend: catalog,
//! conversation history and streamed message sends.

use async_trait::async_trait;
use chatpanel_domain::{
    ChatStreamEvent, Message, MessageId, ModelCatalog, ModelSelection, Session, SessionId,
    UpdateKind,
};
use futures::Stream;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;

/// Default buffer size of a stream channel.
pub const DEFAULT_STREAM_CAPACITY: usize = 64;

/// Errors that can occur during chat API operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatApiError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Conversation not found: {0}")]
    NotFound(SessionId),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Stream closed before completion")]
    StreamClosed,

    #[error("Other error: {0}")]
    Other(String),
}

/// Body of a send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessagePayload {
    /// The user's message text.
    pub message: String,
    /// Selected provider/model/agent/workflow.
    pub selection: ModelSelection,
    pub session_id: SessionId,
    /// Provider credentials; empty when the provider needs none.
    pub credentials: HashMap<String, String>,
    /// Id of the new human message (existing sessions only).
    pub message_id: Option<MessageId>,
    /// Id of the message the new one follows (existing sessions only).
    pub previous_message_id: Option<MessageId>,
    /// AI message being retried.
    pub retry_of: Option<MessageId>,
    /// Human message being revised.
    pub revision_of: Option<MessageId>,
}

/// A conversation as returned by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSnapshot {
    pub session: Session,
    /// Messages in no particular order; the store orders them.
    pub messages: Vec<Message>,
}

/// Handle for receiving the events of one exchange.
///
/// Wraps an `mpsc::Receiver<ChatStreamEvent>`. If the sender side is dropped
/// before a terminal event was seen, [`recv`](Self::recv) yields one
/// synthesized `Error` so consumers always observe a terminal.
pub struct StreamHandle {
    session_id: SessionId,
    receiver: mpsc::Receiver<ChatStreamEvent>,
    finished: bool,
}

impl StreamHandle {
    pub fn new(session_id: SessionId, receiver: mpsc::Receiver<ChatStreamEvent>) -> Self {
        Self {
            session_id,
            receiver,
            finished: false,
        }
    }

    /// Create a connected sender/handle pair.
    pub fn channel(session_id: SessionId) -> (mpsc::Sender<ChatStreamEvent>, Self) {
        let (tx, rx) = mpsc::channel(DEFAULT_STREAM_CAPACITY);
        (tx, Self::new(session_id, rx))
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Whether a terminal event has been delivered.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Receive the next event; `None` after the terminal event.
    pub async fn recv(&mut self) -> Option<ChatStreamEvent> {
        if self.finished {
            return None;
        }
        match self.receiver.recv().await {
            Some(event) => {
                if event.is_terminal() {
                    self.finished = true;
                }
                Some(event)
            }
            None => {
                self.finished = true;
                Some(ChatStreamEvent::Error {
                    session_id: self.session_id.clone(),
                    message: ChatApiError::StreamClosed.to_string(),
                })
            }
        }
    }

    /// Consume the handle as a `Stream` of events ending with the terminal.
    pub fn into_stream(self) -> impl Stream<Item = ChatStreamEvent> {
        futures::stream::unfold(self, |mut handle| async move {
            handle.recv().await.map(|event| (event, handle))
        })
    }

    /// Consume the stream and concatenate all `item` fragments.
    pub async fn collect_text(mut self) -> Result<String, ChatApiError> {
        let mut text = String::new();
        while let Some(event) = self.recv().await {
            match event {
                ChatStreamEvent::Update(update) if update.kind == UpdateKind::Item => {
                    text.push_str(&update.content);
                }
                ChatStreamEvent::Update(_) => {}
                ChatStreamEvent::Done { .. } => return Ok(text),
                ChatStreamEvent::Error { message, .. } => {
                    return Err(ChatApiError::Other(message));
                }
            }
        }
        Ok(text)
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("session_id", &self.session_id)
            .field("finished", &self.finished)
            .finish()
    }
}

/// Chat backend port
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Fetch the provider → agent/workflow/model catalog.
    async fn fetch_chat_models(&self) -> Result<ModelCatalog, ChatApiError>;

    /// Fetch one conversation with its messages.
    async fn fetch_single_conversation(
        &self,
        session_id: &SessionId,
    ) -> Result<ConversationSnapshot, ChatApiError>;

    /// List conversation summaries.
    async fn fetch_conversations(&self) -> Result<Vec<Session>, ChatApiError>;

    /// Send a message. Events of the exchange arrive on the returned handle.
    async fn send_message(&self, payload: SendMessagePayload)
    -> Result<StreamHandle, ChatApiError>;

    /// Ask the backend to stop generating for a session.
    ///
    /// The stream still delivers a terminal event afterwards.
    async fn stop_generation(&self, session_id: &SessionId) -> Result<(), ChatApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatpanel_domain::{StreamUpdate, UpdateMetadata};
    use futures::StreamExt;

    fn meta() -> UpdateMetadata {
        UpdateMetadata {
            message_id: MessageId::new("ai-1"),
            session_id: SessionId::new("s1"),
            previous_message_id: None,
        }
    }

    #[tokio::test]
    async fn collect_text_concatenates_items() {
        let (tx, handle) = StreamHandle::channel(SessionId::new("s1"));
        tx.send(ChatStreamEvent::Update(StreamUpdate::begin(meta())))
            .await
            .unwrap();
        tx.send(ChatStreamEvent::Update(StreamUpdate::item(meta(), "Hel")))
            .await
            .unwrap();
        tx.send(ChatStreamEvent::Update(StreamUpdate::item(meta(), "lo")))
            .await
            .unwrap();
        tx.send(ChatStreamEvent::Update(StreamUpdate::end(meta())))
            .await
            .unwrap();
        tx.send(ChatStreamEvent::Done {
            session_id: SessionId::new("s1"),
        })
        .await
        .unwrap();

        assert_eq!(handle.collect_text().await.unwrap(), "Hello");
    }

    #[tokio::test]
    async fn dropped_sender_yields_one_synthesized_error() {
        let (tx, mut handle) = StreamHandle::channel(SessionId::new("s1"));
        drop(tx);

        let event = handle.recv().await.unwrap();
        assert!(matches!(event, ChatStreamEvent::Error { .. }));
        assert!(handle.is_finished());
        assert!(handle.recv().await.is_none());
    }

    #[tokio::test]
    async fn into_stream_stops_after_terminal() {
        let (tx, handle) = StreamHandle::channel(SessionId::new("s1"));
        tx.send(ChatStreamEvent::Update(StreamUpdate::begin(meta())))
            .await
            .unwrap();
        tx.send(ChatStreamEvent::Done {
            session_id: SessionId::new("s1"),
        })
        .await
        .unwrap();
        // Anything after the terminal is never observed.
        tx.send(ChatStreamEvent::Update(StreamUpdate::end(meta())))
            .await
            .unwrap();

        let events: Vec<_> = handle.into_stream().collect().await;
        assert_eq!(events.len(), 2);
        assert!(events[1].is_terminal());
    }

    #[tokio::test]
    async fn collect_text_surfaces_errors() {
        let (tx, handle) = StreamHandle::channel(SessionId::new("s1"));
        tx.send(ChatStreamEvent::Error {
            session_id: SessionId::new("s1"),
            message: "quota".to_string(),
        })
        .await
        .unwrap();

        let err = handle.collect_text().await.unwrap_err();
        assert_eq!(err, ChatApiError::Other("quota".to_string()));
    }
}
