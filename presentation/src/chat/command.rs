//! Slash commands understood by the chat REPL

use chatpanel_domain::SessionId;

/// A parsed `/command` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Quit,
    /// Start a new session
    New,
    /// List known sessions
    Sessions,
    /// Open a session by id
    Open(SessionId),
    /// List the catalog with selection numbers
    Models,
    /// Select the n-th catalog entry (1-based)
    Use(usize),
    /// Retry the last finished reply
    Retry,
    /// Resend the n-th message of the log (1-based) with new text
    Edit { index: usize, text: String },
    /// Print the whole message log
    Log,
}

impl ReplCommand {
    /// Parse a line starting with `/`.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        match name {
            "/help" | "/h" | "/?" => Ok(Self::Help),
            "/quit" | "/exit" | "/q" => Ok(Self::Quit),
            "/new" => Ok(Self::New),
            "/sessions" | "/ls" => Ok(Self::Sessions),
            "/open" => {
                if rest.is_empty() {
                    return Err("Usage: /open <session-id>".to_string());
                }
                Ok(Self::Open(SessionId::new(rest)))
            }
            "/models" => Ok(Self::Models),
            "/use" => parse_index(rest)
                .map(Self::Use)
                .ok_or_else(|| "Usage: /use <n>  (see /models)".to_string()),
            "/retry" => Ok(Self::Retry),
            "/edit" => {
                let usage = || "Usage: /edit <n> <text>  (see /log)".to_string();
                let (index, text) = rest.split_once(char::is_whitespace).ok_or_else(usage)?;
                let index = parse_index(index).ok_or_else(usage)?;
                let text = text.trim();
                if text.is_empty() {
                    return Err(usage());
                }
                Ok(Self::Edit {
                    index,
                    text: text.to_string(),
                })
            }
            "/log" => Ok(Self::Log),
            _ => Err(format!(
                "Unknown command: {}\nType /help for available commands",
                name
            )),
        }
    }
}

fn parse_index(s: &str) -> Option<usize> {
    s.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(ReplCommand::parse("/help"), Ok(ReplCommand::Help));
        assert_eq!(ReplCommand::parse("/q"), Ok(ReplCommand::Quit));
        assert_eq!(ReplCommand::parse("/new"), Ok(ReplCommand::New));
        assert_eq!(ReplCommand::parse("  /log  "), Ok(ReplCommand::Log));
    }

    #[test]
    fn test_open_needs_id() {
        assert_eq!(
            ReplCommand::parse("/open s-1"),
            Ok(ReplCommand::Open(SessionId::new("s-1")))
        );
        assert!(ReplCommand::parse("/open").is_err());
    }

    #[test]
    fn test_use_index() {
        assert_eq!(ReplCommand::parse("/use 3"), Ok(ReplCommand::Use(3)));
        assert!(ReplCommand::parse("/use 0").is_err());
        assert!(ReplCommand::parse("/use gpt-4o").is_err());
    }

    #[test]
    fn test_edit_keeps_inner_spaces() {
        assert_eq!(
            ReplCommand::parse("/edit 2 what about  lifetimes?"),
            Ok(ReplCommand::Edit {
                index: 2,
                text: "what about  lifetimes?".to_string()
            })
        );
        assert!(ReplCommand::parse("/edit 2").is_err());
        assert!(ReplCommand::parse("/edit two words").is_err());
    }

    #[test]
    fn test_unknown_command() {
        let err = ReplCommand::parse("/frobnicate now").unwrap_err();
        assert!(err.contains("/frobnicate"));
    }
}
