//! REPL (Read-Eval-Print Loop) for the chat panel

use super::command::ReplCommand;
use crate::ConsoleFormatter;
use crate::ReplySpinner;
use chatpanel_application::{ChatView, Submitted, ViewError, ViewEvent};
use chatpanel_domain::{ChatRoute, MessageId, ModelSelection, SessionId};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::debug;

/// Interactive chat REPL
///
/// Reads prompts and slash commands, drives the [`ChatView`] and renders
/// the events it emits.
pub struct ChatRepl {
    view: ChatView,
    events: mpsc::UnboundedReceiver<ViewEvent>,
    history_path: Option<PathBuf>,
    show_progress: bool,
}

impl ChatRepl {
    /// Create a new ChatRepl over a view and the receiving end of its event channel
    pub fn new(view: ChatView, events: mpsc::UnboundedReceiver<ViewEvent>) -> Self {
        Self {
            view,
            events,
            history_path: None,
            show_progress: true,
        }
    }

    /// Set whether to show the waiting spinner
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Set where the line history is kept
    pub fn with_history_path(mut self, path: Option<PathBuf>) -> Self {
        self.history_path = path;
        self
    }

    pub fn view(&self) -> &ChatView {
        &self.view
    }

    /// Mount the view on `route` and print what it shows.
    pub async fn mount(&mut self, route: ChatRoute) {
        self.view.mount(route).await;
        self.render_events();
    }

    /// Run the interactive REPL
    pub async fn run(mut self) -> RlResult<()> {
        let mut rl = DefaultEditor::new()?;

        if let Some(ref path) = self.history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(path);
        }

        self.print_welcome();

        loop {
            match rl.readline(">>> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line.starts_with('/') {
                        if self.handle_command(line).await {
                            break;
                        }
                        continue;
                    }
                    let _ = rl.add_history_entry(line);
                    self.send(line).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = rl.save_history(path);
        }

        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│                 chatpanel                   │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!("Type a message to chat, /help for commands, Ctrl-C to stop a reply.");
        println!();
    }

    fn print_help(&self) {
        println!();
        println!("Commands:");
        println!("  /help, /h, /?        - Show this help");
        println!("  /new                 - Start a new session");
        println!("  /sessions            - List sessions");
        println!("  /open <id>           - Open a session");
        println!("  /models              - List models, agents and workflows");
        println!("  /use <n>             - Select entry n of /models");
        println!("  /retry               - Ask again for the last reply");
        println!("  /edit <n> <text>     - Resend message n of /log with new text");
        println!("  /log                 - Show the session's messages");
        println!("  /quit, /exit, /q     - Exit chat");
        println!();
    }

    /// Handle slash commands. Returns true if should exit.
    async fn handle_command(&mut self, line: &str) -> bool {
        let command = match ReplCommand::parse(line) {
            Ok(command) => command,
            Err(usage) => {
                println!("{}", usage);
                return false;
            }
        };

        match command {
            ReplCommand::Quit => {
                println!("Bye!");
                return true;
            }
            ReplCommand::Help => self.print_help(),
            ReplCommand::New => self.view.new_session().await,
            ReplCommand::Open(session_id) => self.view.open_session(session_id).await,
            ReplCommand::Sessions => match self.view.list_sessions().await {
                Ok(sessions) => print!(
                    "{}",
                    ConsoleFormatter::format_sessions(&sessions, self.view.state().session_id())
                ),
                Err(e) => eprintln!("{}", ConsoleFormatter::format_error(&e)),
            },
            ReplCommand::Models => print!(
                "{}",
                ConsoleFormatter::format_catalog(self.view.catalog(), self.view.selection())
            ),
            ReplCommand::Use(n) => {
                if let Err(message) = self.use_entry(n) {
                    println!("{}", message);
                }
            }
            ReplCommand::Retry => match self.view.last_retryable().map(|m| m.id.clone()) {
                Some(message_id) => {
                    let result = self.view.retry(&message_id).await;
                    self.follow(result).await;
                }
                None => println!("Nothing to retry"),
            },
            ReplCommand::Edit { index, text } => match self.message_at(index) {
                Some(message_id) => {
                    let result = self.view.edit_and_resend(&message_id, text).await;
                    self.follow(result).await;
                }
                None => println!("No message {}; see /log", index),
            },
            ReplCommand::Log => match self.view.snapshot().message_log {
                Some(log) => print!("{}", ConsoleFormatter::format_log(&log)),
                None => println!("{}", "No session is open".dimmed()),
            },
        }
        self.render_events();
        false
    }

    /// Select the n-th catalog entry (1-based).
    fn use_entry(&mut self, n: usize) -> Result<(), String> {
        let selection = self
            .view
            .catalog()
            .entries()
            .nth(n.saturating_sub(1))
            .filter(|_| n > 0)
            .map(ModelSelection::from)
            .ok_or_else(|| format!("No entry {}; see /models", n))?;
        self.view.select_model(selection);
        Ok(())
    }

    /// Id of the n-th message (1-based) of the open session.
    fn message_at(&self, index: usize) -> Option<MessageId> {
        let session_id = self.view.state().session_id()?;
        index
            .checked_sub(1)
            .and_then(|i| self.view.store().messages(session_id).get(i))
            .map(|m| m.id.clone())
    }

    /// Send a prompt and stream its reply.
    async fn send(&mut self, text: &str) {
        self.view.set_input(text);
        let result = self.view.submit().await;
        self.follow(result).await;
    }

    async fn follow(&mut self, result: Result<Submitted, ViewError>) {
        match result {
            Ok(submitted) => self.stream_reply(submitted.session_id).await,
            Err(e) => {
                self.render_events();
                eprintln!("{}", ConsoleFormatter::format_error(&e));
            }
        }
    }

    /// Print the reply for `session_id` as it streams in.
    ///
    /// Ctrl-C asks the backend to stop; the loop still waits for the
    /// terminal event so the log ends up consistent.
    async fn stream_reply(&mut self, session_id: SessionId) {
        let label = self
            .view
            .selection()
            .map_or_else(|| "AI".to_string(), |s| s.name.clone());
        let mut spinner = ReplySpinner::start(self.show_progress, &label);
        self.render_events();

        let mut printing = false;
        let mut stopping = false;
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            let pumped = tokio::select! {
                outcome = self.view.pump() => Some(outcome.is_some()),
                _ = &mut ctrl_c, if !stopping => None,
            };
            match pumped {
                None => {
                    stopping = true;
                    spinner.finish();
                    if let Err(e) = self.view.stop().await {
                        eprintln!("{}", ConsoleFormatter::format_error(&e));
                    }
                }
                Some(false) => {
                    debug!("No open reply streams left");
                    self.render_stream(&session_id, &mut spinner, &mut printing);
                    break;
                }
                Some(true) => {}
            }
            self.render_stream(&session_id, &mut spinner, &mut printing);
            if !self.view.store().is_streaming(&session_id) {
                break;
            }
        }

        spinner.finish();
        if printing {
            println!();
        }
        println!();
    }

    /// Render queued events while a reply streams.
    fn render_stream(
        &mut self,
        session_id: &SessionId,
        spinner: &mut ReplySpinner,
        printing: &mut bool,
    ) {
        while let Ok(event) = self.events.try_recv() {
            match &event {
                ViewEvent::StreamFragment {
                    session_id: sid,
                    message_id,
                    fragment,
                } if sid == session_id => {
                    if !*printing {
                        spinner.finish();
                        let author = self
                            .view
                            .store()
                            .message(sid, message_id)
                            .map_or("AI", |m| m.author.as_str());
                        print!("{}", ConsoleFormatter::reply_prefix(author));
                        *printing = true;
                    }
                    print!("{}", fragment);
                    let _ = std::io::stdout().flush();
                }
                _ => {
                    if let Some(line) = ConsoleFormatter::format_event(&event) {
                        spinner.finish();
                        if *printing {
                            println!();
                            *printing = false;
                        }
                        println!("{}", line);
                    }
                }
            }
        }
    }

    /// Render every queued event outside of streaming.
    fn render_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            if let ViewEvent::Mounted { .. } = event {
                println!();
                print!("{}", ConsoleFormatter::format_mounted(&self.view.snapshot()));
                continue;
            }
            if let Some(line) = ConsoleFormatter::format_event(&event) {
                println!("{}", line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatpanel_application::{
        ChatApi, ChatApiError, ChatStore, ChatViewConfig, ConversationSnapshot,
        SendMessagePayload, StreamHandle,
    };
    use chatpanel_domain::{
        CUSTOM_AGENT_PROVIDER, CatalogEntry, ChatStreamEvent, MessageStatus, ModelCatalog,
        Session, StreamUpdate, UpdateMetadata,
    };
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies "echo: <prompt>" in two fragments.
    #[derive(Default)]
    struct EchoApi {
        replies: AtomicUsize,
    }

    #[async_trait]
    impl ChatApi for EchoApi {
        async fn fetch_chat_models(&self) -> Result<ModelCatalog, ChatApiError> {
            let mut catalog = ModelCatalog::new();
            catalog.insert(CatalogEntry::agent(CUSTOM_AGENT_PROVIDER, "a-1", "Echo agent"));
            catalog.insert(CatalogEntry::agent(CUSTOM_AGENT_PROVIDER, "a-2", "Shout agent"));
            Ok(catalog)
        }

        async fn fetch_single_conversation(
            &self,
            session_id: &SessionId,
        ) -> Result<ConversationSnapshot, ChatApiError> {
            Err(ChatApiError::NotFound(session_id.clone()))
        }

        async fn fetch_conversations(&self) -> Result<Vec<Session>, ChatApiError> {
            Ok(Vec::new())
        }

        async fn send_message(
            &self,
            payload: SendMessagePayload,
        ) -> Result<StreamHandle, ChatApiError> {
            let n = self.replies.fetch_add(1, Ordering::SeqCst) + 1;
            let metadata = UpdateMetadata {
                message_id: MessageId::new(format!("ai-{}", n)),
                session_id: payload.session_id.clone(),
                previous_message_id: payload.message_id.clone(),
            };
            let (tx, handle) = StreamHandle::channel(payload.session_id.clone());
            let events = [
                ChatStreamEvent::Update(StreamUpdate::begin(metadata.clone())),
                ChatStreamEvent::Update(StreamUpdate::item(metadata.clone(), "echo: ")),
                ChatStreamEvent::Update(StreamUpdate::item(metadata.clone(), payload.message)),
                ChatStreamEvent::Update(StreamUpdate::end(metadata)),
                ChatStreamEvent::Done {
                    session_id: payload.session_id,
                },
            ];
            for event in events {
                let _ = tx.try_send(event);
            }
            Ok(handle)
        }

        async fn stop_generation(&self, _session_id: &SessionId) -> Result<(), ChatApiError> {
            Ok(())
        }
    }

    fn repl() -> ChatRepl {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = ChatStore::new(Arc::new(EchoApi::default()));
        let view = ChatView::new(store, ChatViewConfig::default(), tx);
        ChatRepl::new(view, rx).with_progress(false)
    }

    #[tokio::test]
    async fn test_send_streams_reply_into_log() {
        let mut repl = repl();
        repl.mount(ChatRoute::new_session()).await;
        assert!(!repl.handle_command("/use 1").await);

        repl.send("hello").await;

        let log = repl.view().snapshot().message_log.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].content, "hello");
        assert_eq!(log[1].content, "echo: hello");
        assert_eq!(log[1].status, MessageStatus::Success);
        assert!(!repl.view().is_streaming());
    }

    #[tokio::test]
    async fn test_send_without_model_keeps_view_new() {
        let mut repl = repl();
        repl.mount(ChatRoute::new_session()).await;

        repl.send("hello").await;

        assert!(!repl.view().state().is_active());
        assert!(repl.view().snapshot().message_log.is_none());
    }

    #[tokio::test]
    async fn test_use_out_of_range() {
        let mut repl = repl();
        repl.mount(ChatRoute::new_session()).await;

        assert!(repl.use_entry(9).is_err());
        assert!(repl.view().selection().is_none());
        repl.use_entry(2).unwrap();
        assert_eq!(repl.view().selection().unwrap().name, "Shout agent");
    }

    #[tokio::test]
    async fn test_retry_and_edit() {
        let mut repl = repl();
        repl.mount(ChatRoute::new_session()).await;
        repl.handle_command("/use 1").await;
        repl.send("frist").await;

        repl.handle_command("/retry").await;
        repl.handle_command("/edit 1 first").await;

        let log = repl.view().snapshot().message_log.unwrap();
        assert_eq!(log.len(), 5);
        assert!(log[2].lineage.retry_of.is_some());
        assert_eq!(log[3].content, "first");
        assert_eq!(log[3].lineage.revision_of.as_ref(), Some(&log[0].id));
        assert_eq!(log[4].content, "echo: first");
    }

    #[tokio::test]
    async fn test_edit_rejects_reply_index() {
        let mut repl = repl();
        repl.mount(ChatRoute::new_session()).await;
        repl.handle_command("/use 1").await;
        repl.send("hello").await;

        assert_eq!(repl.message_at(3), None);
        repl.handle_command("/edit 2 nope").await;
        assert_eq!(repl.view().snapshot().message_log.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_new_and_quit() {
        let mut repl = repl();
        repl.mount(ChatRoute::new_session()).await;
        repl.handle_command("/use 1").await;
        repl.send("hello").await;
        assert!(repl.view().state().is_active());

        assert!(!repl.handle_command("/new").await);
        assert!(!repl.view().state().is_active());
        assert!(repl.handle_command("/quit").await);
    }
}
