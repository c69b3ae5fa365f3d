//! saidebar - chat with Claude from the terminal

mod commands;
mod page;
mod ui;

use clap::Parser;
use commands::Command;
use saidebar_ai::{ApiProvider, ReqwestTransport, providers::anthropic::DEFAULT_MODEL};
use saidebar_core::{ChatSession, ExchangeOutcome, FileSettingsStore, Settings, SettingsStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

/// saidebar - chat with Claude from the terminal
#[derive(Parser, Debug)]
#[command(name = "saidebar")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (default: <config dir>/saidebar/settings.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Send a single prompt, print the reply and exit
    #[arg(short = 'c', long)]
    command: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("saidebar=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let store = match args.config {
        Some(path) => FileSettingsStore::new(path),
        None => FileSettingsStore::open_default(),
    };
    tracing::debug!("Using settings at {}", store.path().display());

    let session = Arc::new(ChatSession::new(
        store.load(),
        Arc::new(ReqwestTransport::new()),
        Arc::new(ui::ConsolePresenter::new()),
    ));
    tokio::spawn(watch_interrupts(session.clone()));

    // Non-interactive mode
    if let Some(command) = args.command {
        if session.send_message(&command).await.is_err() {
            std::process::exit(1);
        }
        return Ok(());
    }

    run_interactive(&session, &store).await
}

/// Listen for Ctrl-C for the life of the process
async fn watch_interrupts(session: Arc<ChatSession>) {
    loop {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        if !handle_interrupt(&session) {
            println!();
            std::process::exit(130);
        }
    }
}

/// Ctrl-C abandons the reply in flight by starting a new conversation.
/// Returns `false` when nothing was in flight and the process should exit.
fn handle_interrupt(session: &ChatSession) -> bool {
    if !session.is_busy() {
        return false;
    }
    session.reset();
    true
}

async fn run_interactive(session: &ChatSession, store: &dyn SettingsStore) -> anyhow::Result<()> {
    let interactive = std::io::IsTerminal::is_terminal(&std::io::stdin());
    if interactive {
        let settings = session.settings();
        eprintln!(
            "saidebar ({}, {})",
            settings.api_provider.name(),
            settings.model.as_deref().unwrap_or(DEFAULT_MODEL)
        );
        if !settings.has_api_key() {
            eprintln!("No API key set. Use /key <key> to add one.");
        }
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        if interactive {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
        }

        let Some(line) = lines.next_line().await? else {
            // EOF
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let Some(command) = commands::parse(input) else {
            // Failures are already shown by the presenter
            if let Ok(ExchangeOutcome::Busy) = session.send_message(input).await {
                eprintln!("Still waiting for the previous reply");
            }
            continue;
        };

        if !run_command(session, store, command).await {
            break;
        }
    }

    Ok(())
}

/// Execute a slash command. Returns `false` when the loop should end.
async fn run_command(session: &ChatSession, store: &dyn SettingsStore, command: Command) -> bool {
    match command {
        Command::New => session.reset(),

        Command::Summarize { path, title } => {
            let source = page::FilePage::new(path, title);
            if let Ok(ExchangeOutcome::Busy) = session.summarize_page(&source).await {
                eprintln!("Still waiting for the previous reply");
            }
        }

        Command::Models => match session.fetch_models().await {
            Ok(models) => println!("{}", list_models(&session.settings(), &models)),
            Err(e) => eprintln!("{}", e.user_message()),
        },

        Command::Model(id) => {
            if let Some(models) = session.cached_models() {
                if !models.iter().any(|m| m.id == id) {
                    eprintln!("'{}' is not in the model list; using it anyway", id);
                }
            }
            update_settings(session, store, |s| s.model = Some(id.clone()));
            println!("Model: {}", id);
        }

        Command::Provider { provider, url } => {
            update_settings(session, store, |s| {
                s.api_provider = provider;
                if url.is_some() {
                    s.custom_api_url = url.clone();
                }
            });
            println!("Provider: {} ({})", provider.name(), session.settings().base_url());
        }

        Command::Key(key) => {
            update_settings(session, store, |s| s.api_key = key.clone());
            println!("API key: {}", session.settings().masked_api_key());
        }

        Command::System(prompt) => {
            let cleared = prompt.is_none();
            update_settings(session, store, |s| s.system_prompt = prompt.clone());
            if cleared {
                println!("System prompt cleared");
            } else {
                println!("System prompt set");
            }
        }

        Command::Settings => println!("{}", describe_settings(&session.settings())),

        Command::Help => println!("{}", commands::help_message()),

        Command::Quit => return false,

        Command::Usage(usage) => eprintln!("Usage: {}", usage),

        Command::Unknown(name) => {
            eprintln!("Unknown command: /{}. Type /help for commands.", name)
        }
    }
    true
}

/// Apply `change`, hand the result to the session and persist it
fn update_settings(
    session: &ChatSession,
    store: &dyn SettingsStore,
    change: impl FnOnce(&mut Settings),
) {
    let mut settings = session.settings();
    change(&mut settings);
    if let Err(e) = store.save(&settings) {
        eprintln!("Failed to save settings: {}", e);
    }
    session.set_settings(settings);
}

fn describe_settings(settings: &Settings) -> String {
    format!(
        "Provider:      {}\nBase URL:      {}\nAPI key:       {}\n\
         Model:         {}\nSystem prompt: {}",
        settings.api_provider.name(),
        settings.base_url(),
        settings.masked_api_key(),
        settings.model.as_deref().unwrap_or(DEFAULT_MODEL),
        settings.system_prompt.as_deref().unwrap_or("(none)"),
    )
}

fn list_models(settings: &Settings, models: &[saidebar_ai::ModelInfo]) -> String {
    if models.is_empty() {
        return "No models available".to_string();
    }

    let current = settings.model.as_deref().unwrap_or(DEFAULT_MODEL);
    let mut output = String::from("Available models:\n");
    for model in models {
        let marker = if model.id == current { " *" } else { "" };
        output.push_str(&format!("  {} ({}){}\n", model.id, model.label(), marker));
    }
    output.pop();
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use saidebar_ai::ModelInfo;
    use saidebar_ai::http::{HttpRequest, HttpResponse, HttpTransport};
    use saidebar_core::{MemorySettingsStore, NullPresenter};

    fn session() -> ChatSession {
        ChatSession::new(
            Settings::default(),
            Arc::new(ReqwestTransport::new()),
            Arc::new(NullPresenter),
        )
    }

    /// Never answers, so an exchange stays in flight
    struct Stalled;

    #[async_trait::async_trait]
    impl HttpTransport for Stalled {
        async fn send(&self, _request: HttpRequest) -> saidebar_ai::Result<HttpResponse> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_interrupt_resets_exchange_or_exits() {
        let settings = Settings {
            api_key: "sk-test".into(),
            ..Default::default()
        };
        let session = ChatSession::new(settings, Arc::new(Stalled), Arc::new(NullPresenter));

        // Idle: Ctrl-C ends the process
        assert!(!handle_interrupt(&session));

        let (outcome, keep_running) = tokio::join!(session.send_message("hi"), async {
            while !session.is_busy() {
                tokio::task::yield_now().await;
            }
            handle_interrupt(&session)
        });
        assert!(keep_running);
        assert_eq!(outcome.unwrap(), ExchangeOutcome::Cancelled);
        assert!(session.messages().is_empty());
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_summarize_while_busy_keeps_loop_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Meeting notes").unwrap();

        let settings = Settings {
            api_key: "sk-test".into(),
            ..Default::default()
        };
        let session = ChatSession::new(settings, Arc::new(Stalled), Arc::new(NullPresenter));
        let store = MemorySettingsStore::new();

        let (outcome, keep_running) = tokio::join!(session.send_message("hi"), async {
            while !session.is_busy() {
                tokio::task::yield_now().await;
            }
            let summarize = Command::Summarize { path, title: None };
            let keep_running = run_command(&session, &store, summarize).await;
            session.reset();
            keep_running
        });
        assert!(keep_running);
        assert_eq!(outcome.unwrap(), ExchangeOutcome::Cancelled);
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_settings_commands_persist() {
        let session = session();
        let store = MemorySettingsStore::new();

        assert!(run_command(&session, &store, Command::Key("sk-ant-abcd1234".into())).await);
        assert!(
            run_command(
                &session,
                &store,
                Command::Provider {
                    provider: ApiProvider::Custom,
                    url: Some("https://proxy.local/".into()),
                },
            )
            .await
        );
        run_command(&session, &store, Command::System(Some("Be terse.".into()))).await;

        let saved = store.load();
        assert_eq!(saved, session.settings());
        assert_eq!(saved.api_key, "sk-ant-abcd1234");
        assert_eq!(saved.base_url(), "https://proxy.local");
        assert_eq!(saved.system_prompt.as_deref(), Some("Be terse."));

        run_command(&session, &store, Command::System(None)).await;
        assert_eq!(store.load().system_prompt, None);
    }

    #[tokio::test]
    async fn test_quit_ends_loop() {
        let store = MemorySettingsStore::new();
        assert!(!run_command(&session(), &store, Command::Quit).await);
    }

    #[test]
    fn test_describe_settings_masks_key() {
        let settings = Settings {
            api_key: "sk-ant-secret-9876".into(),
            ..Default::default()
        };
        let text = describe_settings(&settings);
        assert!(text.contains("9876"));
        assert!(!text.contains("secret"));
        assert!(text.contains(DEFAULT_MODEL));
    }

    #[test]
    fn test_list_models_marks_current() {
        let settings = Settings {
            model: Some("claude-opus-4-1".into()),
            ..Default::default()
        };
        let models = vec![
            ModelInfo {
                id: "claude-opus-4-1".into(),
                display_name: Some("Claude Opus 4.1".into()),
            },
            ModelInfo {
                id: "claude-haiku".into(),
                display_name: None,
            },
        ];
        let text = list_models(&settings, &models);
        assert!(text.contains("claude-opus-4-1 (Claude Opus 4.1) *"));
        assert!(text.ends_with("  claude-haiku (claude-haiku)"));
        assert_eq!(list_models(&settings, &[]), "No models available");
    }
}
