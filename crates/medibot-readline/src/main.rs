mod commands;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing_subscriber::EnvFilter;

use medibot_core::conversation::{
    ConversationController, ConversationState, Feedback, Message, MessageRole,
    NewConversationOutcome,
};
use medibot_core::session::{InMemorySessionStore, SessionStatus, SessionStore};
use medibot_infrastructure::{ConfigService, TomlSessionStore};
use medibot_interaction::HttpSessionClient;

use crate::commands::{ReplCommand, completions};

#[derive(Parser)]
#[command(name = "medibot")]
#[command(about = "MediBot symptom checker - terminal chat client", long_about = None)]
struct Args {
    /// Backend base URL (overrides config and MEDIBOT_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path of the file holding the current session id
    #[arg(long, conflicts_with = "ephemeral")]
    session_file: Option<PathBuf>,

    /// Keep the session id in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// CLI helper for rustyline: completes slash commands and `/feedback`
/// ratings, highlights commands, and hints the rest of a unique match.
#[derive(Clone, Default)]
struct CliHelper;

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, words) = completions(&line[..pos]);
        let candidates = words
            .into_iter()
            .map(|word| Pair {
                display: word.to_string(),
                replacement: word.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        match line.split_once(' ') {
            Some((command, rest)) if line.starts_with('/') => {
                Owned(format!("{} {}", command.bright_cyan(), rest))
            }
            None if line.starts_with('/') => Owned(line.bright_cyan().to_string()),
            _ => Borrowed(line),
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let (start, words) = completions(line);
        let typed = &line[start..];
        match words.as_slice() {
            [only] if only.len() > typed.len() => Some(only[typed.len()..].to_string()),
            _ => None,
        }
    }
}

impl Validator for CliHelper {}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("MEDIBOT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn open_store(args: &Args) -> Result<Arc<dyn SessionStore>> {
    if args.ephemeral {
        return Ok(Arc::new(InMemorySessionStore::new()));
    }
    let store = match &args.session_file {
        Some(path) => TomlSessionStore::with_path(path.clone()).await,
        None => TomlSessionStore::new().await,
    }
    .context("Failed to open session store")?;
    Ok(Arc::new(store))
}

fn print_message(position: usize, message: &Message) {
    let tag = format!("#{}", position).bright_black();
    match (message.role, message.is_error) {
        (MessageRole::User, _) => {
            println!("{} {}", tag, format!("> {}", message.text).green());
        }
        (MessageRole::Assistant, true) => {
            println!("{} {}", tag, message.text.red());
        }
        (MessageRole::Assistant, false) => {
            println!("{} {}", tag, "[MediBot]".bright_magenta());
            for line in message.text.lines() {
                println!("{}", line.bright_blue());
            }
        }
    }

    if let Some(metadata) = &message.metadata {
        let mut notes = Vec::new();
        if metadata.has_context {
            notes.push("used conversation context".to_string());
        }
        if !metadata.sources.is_empty() {
            notes.push(format!("sources: {}", metadata.sources.join(", ")));
        }
        if let Some(secs) = metadata.generation_time {
            notes.push(format!("{:.1}s", secs));
        }
        if !notes.is_empty() {
            println!("   {}", notes.join(" | ").bright_black());
        }
    }
    match message.feedback {
        Some(Feedback::Positive) => println!("   {}", "rated helpful".bright_black()),
        Some(Feedback::Negative) => println!("   {}", "rated not helpful".bright_black()),
        None => {}
    }
}

fn print_transcript(state: &ConversationState) {
    for (index, message) in state.messages.iter().enumerate() {
        print_message(index + 1, message);
    }
}

fn print_status(state: &ConversationState) {
    let session = state
        .session_info
        .short_id()
        .map(|id| format!("...{}", id))
        .unwrap_or_else(|| "none".to_string());
    println!(
        "{}",
        format!(
            "Session: {} ({:?}) | phase: {:?} | messages: {} | started: {}",
            session,
            state.session_status,
            state.phase,
            state.messages.len(),
            state.started
        )
        .bright_black()
    );
}

fn print_help() {
    println!("{}", "Type a health question to ask MediBot.".bright_black());
    println!("{}", "  /new                          start a new conversation".bright_black());
    println!("{}", "  /clear                        clear this conversation's messages".bright_black());
    println!("{}", "  /feedback <n> up|down|none    rate message #n".bright_black());
    println!("{}", "  /history                      show the whole conversation".bright_black());
    println!("{}", "  /status                       show session details".bright_black());
    println!("{}", "  /health                       check the backend".bright_black());
    println!("{}", "  quit | exit                   leave".bright_black());
}

/// Runs one parsed command. Returns `false` when the REPL should stop.
async fn dispatch(
    command: ReplCommand,
    controller: &ConversationController,
    client: &HttpSessionClient,
) -> bool {
    match command {
        ReplCommand::Quit => return false,
        ReplCommand::Send(text) => {
            let before = controller.state().session_info.session_id;
            match controller.send(&text).await {
                Ok(reply) => {
                    let state = controller.state();
                    print_message(state.messages.len(), &reply);
                    if reply.is_error
                        && before.is_some()
                        && state.session_status == SessionStatus::Expired
                    {
                        println!(
                            "{}",
                            "Your session has expired; the next message starts a new one.".yellow()
                        );
                    }
                    if let (Some(previous), Some(current)) =
                        (before, state.session_info.session_id.as_deref())
                    {
                        if previous != current {
                            println!(
                                "{}",
                                "The server started a new session; earlier messages are no longer used as context."
                                    .yellow()
                            );
                        }
                    }
                }
                Err(e) => println!("{}", e.to_string().yellow()),
            }
        }
        ReplCommand::New => match controller.new_conversation().await {
            Ok(NewConversationOutcome::Started { .. }) => {
                println!("{}", "Started a new conversation.".bright_green());
                print_transcript(&controller.state());
            }
            Ok(NewConversationOutcome::Degraded { error, .. }) => {
                println!(
                    "{}",
                    format!("Started over locally; the server was unavailable ({})", error)
                        .yellow()
                );
                print_transcript(&controller.state());
            }
            Err(e) => println!("{}", e.to_string().yellow()),
        },
        ReplCommand::Clear => match controller.clear_conversation().await {
            Ok(true) => {
                println!("{}", "Conversation cleared.".bright_green());
                print_transcript(&controller.state());
            }
            Ok(false) => println!("{}", "Nothing was cleared on the server.".yellow()),
            Err(e) => println!("{}", format!("Failed to clear: {}", e).red()),
        },
        ReplCommand::Feedback { position, feedback } => {
            let target = controller
                .state()
                .messages
                .get(position - 1)
                .map(|m| m.id);
            match target {
                Some(id) if controller.record_feedback(id, feedback) => {
                    println!("{}", "Thanks for the feedback.".bright_green());
                }
                _ => println!(
                    "{}",
                    format!("Message #{} cannot be rated", position).yellow()
                ),
            }
        }
        ReplCommand::History => print_transcript(&controller.state()),
        ReplCommand::Status => print_status(&controller.state()),
        ReplCommand::Health => match client.health().await {
            Ok(health) => println!(
                "{}",
                format!(
                    "Backend {} at {} (version {})",
                    health.status,
                    client.base_url(),
                    health.version.as_deref().unwrap_or("unknown")
                )
                .bright_green()
            ),
            Err(e) => println!("{}", format!("Backend unreachable: {}", e).red()),
        },
        ReplCommand::Help => print_help(),
        ReplCommand::Invalid(reason) => println!("{}", reason.bright_black()),
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config_service = match &args.config {
        Some(path) => ConfigService::with_path(path.clone()),
        None => ConfigService::new(),
    };
    let mut config = config_service.get_config();
    if let Some(url) = &args.api_url {
        config.api_base_url = url.clone();
    }

    let store = open_store(&args).await?;
    let client = Arc::new(HttpSessionClient::new(&config)?);
    let controller = ConversationController::new(store, client.clone(), config);

    println!("{}", "=== MediBot Symptom Checker ===".bright_magenta().bold());
    println!(
        "{}",
        "MediBot provides general information only and is not a substitute for a doctor."
            .bright_black()
    );
    println!("{}", "Type '/help' for commands, or 'quit' to exit.".bright_black());
    println!();

    if let Err(e) = controller.initialize().await {
        eprintln!("{}", format!("Failed to restore session: {}", e).red());
    }
    print_transcript(&controller.state());

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper));

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                if !dispatch(ReplCommand::parse(trimmed), &controller, &client).await {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}
