//! CLI entrypoint for chatpanel
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use chatpanel_application::{
    ChatApi, ChatStore, ChatView, Navigator, NoSelectionStore, SelectionStore,
};
use chatpanel_domain::ChatRoute;
use chatpanel_infrastructure::{
    ConfigLoader, EnvCredentialProvider, FileBackendConfig, FileSelectionStore,
    JsonlConversationLogger, LocalChatApi, LocalReplySettings,
};
use chatpanel_presentation::{ChatRepl, Cli, ConsoleFormatter};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Logs route changes; the terminal has no address bar to update.
struct LogNavigator;

impl Navigator for LogNavigator {
    fn replace(&self, route: &ChatRoute) {
        debug!("Route is now {}", route);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(cli.verbose, cli.log_dir.as_deref())?;

    info!("Starting chatpanel");

    // === Configuration ===
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        println!();
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let issues = config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("{}", ConsoleFormatter::format_error(issue));
        }
        bail!("Invalid configuration ({} issue(s))", issues.len());
    }

    let route = cli.route()?;

    // === Dependency Injection ===
    let api = chat_api(&config.backend)?;

    let mut store = ChatStore::new(api).with_user_name(config.chat.user_name.clone());
    if let Some(path) = config.logging.conversation_log_path()
        && let Some(logger) = JsonlConversationLogger::open(&path)
    {
        info!("Logging conversations to {}", logger.path().display());
        store = store.with_conversation_logger(Arc::new(logger));
    }

    let selections: Arc<dyn SelectionStore> = match config.storage.selection_path() {
        Some(path) => Arc::new(FileSelectionStore::new(path)),
        None => {
            warn!("No data directory; the last used model will not be remembered");
            Arc::new(NoSelectionStore)
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let view = ChatView::new(store, config.view_config()?, tx)
        .with_selection_store(selections)
        .with_credentials(Arc::new(EnvCredentialProvider::new()))
        .with_navigator(Arc::new(LogNavigator));

    let mut repl = ChatRepl::new(view, rx)
        .with_progress(!cli.quiet)
        .with_history_path(config.storage.history_path());
    repl.mount(route).await;
    repl.run().await?;

    Ok(())
}

/// Initialize logging based on verbosity level.
///
/// With `log_dir`, logs go to a daily rolling file instead of stderr so they
/// do not interleave with streamed replies.
fn init_logging(verbose: u8, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "chatpanel.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

/// The offline backend, seeded from the configured fixture if any.
fn chat_api(backend: &FileBackendConfig) -> Result<Arc<dyn ChatApi>> {
    let api = match &backend.fixture {
        Some(fixture) => LocalChatApi::from_fixture(&PathBuf::from(fixture))?,
        None => LocalChatApi::builtin(),
    };
    let settings = LocalReplySettings {
        template: backend.reply_template.clone(),
        chunk_size: backend.chunk_size,
        chunk_delay: Duration::from_millis(backend.chunk_delay_ms),
    };
    Ok(Arc::new(api.with_settings(settings)))
}

