//! Slash commands for the interactive loop

use saidebar_ai::ApiProvider;
use std::path::PathBuf;

/// A parsed slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a new conversation
    New,
    /// Summarize a local text file as if it were the current page
    Summarize { path: PathBuf, title: Option<String> },
    /// Fetch and list the available models
    Models,
    /// Use a model for the next exchanges
    Model(String),
    /// Switch provider, optionally with a custom base URL
    Provider { provider: ApiProvider, url: Option<String> },
    /// Set the API key
    Key(String),
    /// Set or clear the system prompt
    System(Option<String>),
    /// Show the current settings
    Settings,
    Help,
    Quit,
    /// Recognized command with bad arguments
    Usage(&'static str),
    Unknown(String),
}

/// Parse a line of input. Returns `None` when it is not a slash command.
pub fn parse(input: &str) -> Option<Command> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    Some(match name.to_lowercase().as_str() {
        "new" | "n" => Command::New,

        "summarize" | "s" => {
            let (path, title) = match args.split_once(char::is_whitespace) {
                Some((path, title)) => (path, Some(title.trim().to_string())),
                None => (args, None),
            };
            if path.is_empty() {
                return Some(Command::Usage("/summarize <file> [title]"));
            }
            Command::Summarize {
                path: PathBuf::from(path),
                title,
            }
        }

        "models" => Command::Models,

        "model" | "m" => {
            if args.is_empty() {
                Command::Usage("/model <id>")
            } else {
                Command::Model(args.to_string())
            }
        }

        "provider" | "p" => {
            let mut parts = args.split_whitespace();
            match parts.next().and_then(ApiProvider::parse) {
                Some(provider) => Command::Provider {
                    provider,
                    url: parts.next().map(str::to_string),
                },
                None => Command::Usage("/provider <anthropic|zai|custom> [url]"),
            }
        }

        "key" => {
            if args.is_empty() {
                Command::Usage("/key <key>")
            } else {
                Command::Key(args.to_string())
            }
        }

        "system" => Command::System((!args.is_empty()).then(|| args.to_string())),

        "settings" => Command::Settings,

        "help" | "h" | "?" => Command::Help,

        "quit" | "exit" | "q" => Command::Quit,

        other => Command::Unknown(other.to_string()),
    })
}

pub fn help_message() -> String {
    r#"Available commands:
  /new, /n                        Start a new conversation
  /summarize, /s <file> [title]   Summarize a local text file
  /models                         List models for the current key
  /model, /m <id>                 Use a model
  /provider, /p <name> [url]      Switch to anthropic, zai or custom
  /key <key>                      Set the API key
  /system [prompt]                Set the system prompt (clears it with no argument)
  /settings                       Show the current settings
  /help, /h, /?                   Show this help message
  /quit, /exit, /q                Exit saidebar

Ctrl-C while a reply streams starts a new conversation; otherwise it exits.
Anything else is sent as a chat message."#
        .to_string()
}
