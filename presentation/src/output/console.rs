//! Console output formatter for the chat panel

use chatpanel_application::{ViewEvent, ViewSnapshot};
use chatpanel_domain::{
    EntryKind, Message, MessageStatus, ModelCatalog, ModelSelection, Session, SessionId,
};
use colored::Colorize;

/// Formats chat panel state for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Banner plus whatever the panel shows right after mounting.
    pub fn format_mounted(snapshot: &ViewSnapshot) -> String {
        let mut output = String::new();
        output.push_str(&format!("{} {}\n", "Route:".cyan().bold(), snapshot.route));
        output.push_str(&format!(
            "{} {}\n",
            "Model:".cyan().bold(),
            Self::selection_label(snapshot.selection.as_ref())
        ));
        if !snapshot.selector_enabled {
            output.push_str(&format!("{}\n", "No models available".yellow()));
        }
        output.push('\n');

        if let Some(greeting) = &snapshot.greeting {
            output.push_str(&format!("{}\n", greeting.bold()));
        }
        if let Some(log) = &snapshot.message_log {
            output.push_str(&Self::format_log(log));
        }
        output
    }

    /// Every message of a log, numbered from 1.
    pub fn format_log(messages: &[Message]) -> String {
        if messages.is_empty() {
            return format!("{}\n", "(no messages yet)".dimmed());
        }
        messages
            .iter()
            .enumerate()
            .map(|(i, message)| Self::format_message(i + 1, message))
            .collect()
    }

    /// One message with its number, author and status.
    pub fn format_message(index: usize, message: &Message) -> String {
        let number = format!("[{}]", index).dimmed();
        let author = if message.is_human() {
            message.author.green().bold()
        } else {
            message.author.yellow().bold()
        };
        let mut output = format!("{} {}: {}", number, author, message.content);

        match message.status {
            MessageStatus::Running => output.push_str(&format!(" {}", "…".dimmed())),
            MessageStatus::Error => output.push_str(&format!(" {}", "[error]".red().bold())),
            MessageStatus::Success => {}
        }

        let lineage = &message.lineage;
        if let Some(of) = &lineage.retry_of {
            output.push_str(&format!(" {}", format!("(retry of {})", of).dimmed()));
        }
        if let Some(of) = &lineage.revision_of {
            output.push_str(&format!(" {}", format!("(edit of {})", of).dimmed()));
        }
        if !lineage.alternative_ids.is_empty() {
            output.push_str(&format!(
                " {}",
                format!("({} alternative(s))", lineage.alternative_ids.len()).dimmed()
            ));
        }
        output.push('\n');
        output
    }

    /// The catalog as a numbered list; the current selection is starred.
    ///
    /// Numbers follow [`ModelCatalog::entries`] order, which is what
    /// `/use <n>` indexes into.
    pub fn format_catalog(catalog: &ModelCatalog, selected: Option<&ModelSelection>) -> String {
        if catalog.is_empty() {
            return format!("{}\n", "No models available".yellow());
        }
        let mut output = String::new();
        for (i, entry) in catalog.entries().enumerate() {
            let marker = if selected.is_some_and(|s| s.matches(entry)) {
                "*".green().bold()
            } else {
                " ".normal()
            };
            let kind = match entry.kind() {
                EntryKind::Model => "model",
                EntryKind::Agent => "agent",
                EntryKind::Workflow => "workflow",
            };
            output.push_str(&format!(
                "{} {:>2}. {} {}\n",
                marker,
                i + 1,
                entry.name.bold(),
                format!("[{} / {}]", entry.provider, kind).dimmed()
            ));
            if !entry.description.is_empty() {
                output.push_str(&format!("       {}\n", entry.description.dimmed()));
            }
        }
        output
    }

    /// Known sessions; the open one is starred.
    pub fn format_sessions(sessions: &[Session], active: Option<&SessionId>) -> String {
        if sessions.is_empty() {
            return format!("{}\n", "No sessions yet".dimmed());
        }
        sessions
            .iter()
            .map(|session| {
                let marker = if active == Some(&session.id) {
                    "*".green().bold()
                } else {
                    " ".normal()
                };
                format!(
                    "{} {}  {}  {}\n",
                    marker,
                    session.id.as_str().cyan(),
                    session.updated_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                    session.title
                )
            })
            .collect()
    }

    /// Status line for an event, or `None` for events shown elsewhere.
    ///
    /// Fragments are printed as they arrive; send failures come back as the
    /// error of the call that caused them.
    pub fn format_event(event: &ViewEvent) -> Option<String> {
        let line = match event {
            ViewEvent::CatalogUnavailable { error } => {
                format!("{} {}", "Could not load models:".yellow().bold(), error)
            }
            ViewEvent::HistoryLoadFailed { session_id, error } => format!(
                "{} {} ({}); starting a new session",
                "Could not open session".yellow().bold(),
                session_id,
                error
            ),
            ViewEvent::SelectionChanged(selection) => {
                format!("{} {}", "Using".cyan().bold(), selection)
            }
            ViewEvent::SessionActivated { route, .. } => {
                format!("{} {}", "Session started:".cyan(), route).dimmed().to_string()
            }
            ViewEvent::ExchangeFailed { error, .. } => {
                format!("{} {}", "Reply failed:".red().bold(), error)
            }
            ViewEvent::GenerationStopped { .. } => "Stopping…".yellow().to_string(),
            ViewEvent::Mounted { .. }
            | ViewEvent::CatalogLoaded { .. }
            | ViewEvent::HistoryLoaded { .. }
            | ViewEvent::InputCleared
            | ViewEvent::SendFailed { .. }
            | ViewEvent::MessageAdded(_)
            | ViewEvent::StreamStarted { .. }
            | ViewEvent::StreamFragment { .. }
            | ViewEvent::StreamFinished { .. }
            | ViewEvent::ExchangeDone { .. } => return None,
        };
        Some(line)
    }

    /// Prefix printed before a streamed reply.
    pub fn reply_prefix(author: &str) -> String {
        format!("{}: ", author.yellow().bold())
    }

    pub fn format_error(error: &dyn std::fmt::Display) -> String {
        format!("{} {}", "Error:".red().bold(), error)
    }

    fn selection_label(selection: Option<&ModelSelection>) -> String {
        match selection {
            Some(selection) => selection.to_string(),
            None => "none (use /models and /use <n>)".dimmed().to_string(),
        }
    }
}
