//! CLI command definitions

use chatpanel_domain::{ChatRoute, DomainError, SessionId};
use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for chatpanel
#[derive(Parser, Debug)]
#[command(name = "chatpanel")]
#[command(author, version, about = "Terminal chat panel with streamed replies")]
#[command(long_about = r#"
chatpanel opens a chat session against the configured backend and streams
replies into the terminal as they are generated.

Configuration files are loaded from (in priority order):
1. CHATPANEL_* environment variables (e.g. CHATPANEL_CHAT__GREETING)
2. --config <path>      Explicit config file
3. ./chatpanel.toml     Project-level config (or ./.chatpanel.toml)
4. ~/.config/chatpanel/config.toml   Global config

Example:
  chatpanel
  chatpanel --session 3f2a9c
  chatpanel --agent echo-agent
  chatpanel --route '/chat?workflowId=echo-workflow'
"#)]
pub struct Cli {
    /// Open an existing session instead of a new one
    #[arg(short, long, value_name = "ID", conflicts_with = "route")]
    pub session: Option<String>,

    /// Pre-select an agent by id
    #[arg(long, value_name = "ID", conflicts_with = "route")]
    pub agent: Option<String>,

    /// Pre-select a workflow by id
    #[arg(long, value_name = "ID", conflicts_with = "route")]
    pub workflow: Option<String>,

    /// Start from a chat route such as /chat/<id>?agentId=<id>
    #[arg(long, value_name = "PATH")]
    pub route: Option<String>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress the waiting spinner
    #[arg(short, long)]
    pub quiet: bool,

    /// Write logs to daily files in this directory instead of stderr
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show the effective configuration and its sources, then exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    /// Route the view mounts on first.
    pub fn route(&self) -> Result<ChatRoute, DomainError> {
        if let Some(path) = &self.route {
            return ChatRoute::parse(path);
        }
        let mut route = match &self.session {
            Some(id) => ChatRoute::session(SessionId::new(id.clone())),
            None => ChatRoute::new_session(),
        };
        if let Some(agent) = &self.agent {
            route = route.with_agent(agent.clone());
        }
        if let Some(workflow) = &self.workflow {
            route = route.with_workflow(workflow.clone());
        }
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("chatpanel").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_route_is_new_session() {
        let cli = parse(&[]);
        assert_eq!(cli.route().unwrap(), ChatRoute::new_session());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_route_from_flags() {
        let cli = parse(&["--session", "s-1", "--agent", "a-1", "-vv"]);
        let route = cli.route().unwrap();
        assert_eq!(route.session_id, Some(SessionId::new("s-1")));
        assert_eq!(route.agent_id.as_deref(), Some("a-1"));
        assert_eq!(route.workflow_id, None);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_route_from_path() {
        let cli = parse(&["--route", "/chat/s-9?workflowId=wf-1"]);
        let route = cli.route().unwrap();
        assert_eq!(route.session_id, Some(SessionId::new("s-9")));
        assert_eq!(route.workflow_id.as_deref(), Some("wf-1"));
    }

    #[test]
    fn test_route_conflicts_with_session() {
        let result =
            Cli::try_parse_from(["chatpanel", "--route", "/chat", "--session", "s-1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_route_path() {
        let cli = parse(&["--route", "/settings"]);
        assert!(cli.route().is_err());
    }
}
