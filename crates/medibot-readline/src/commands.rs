//! REPL input parsing.

use medibot_core::conversation::Feedback;

/// Slash commands offered for completion and hints.
pub const COMMANDS: &[&str] = &[
    "/new", "/clear", "/feedback", "/history", "/status", "/health", "/help",
];

/// Ratings accepted by `/feedback <n> <rating>`, besides their aliases.
pub const RATINGS: &[&str] = &["up", "down", "none"];

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Plain text to send to MediBot
    Send(String),
    New,
    Clear,
    /// Rate the message at a 1-based position in the transcript
    Feedback {
        position: usize,
        feedback: Option<Feedback>,
    },
    History,
    Status,
    Health,
    Help,
    Quit,
    /// A malformed or unknown command, with the reason to show
    Invalid(String),
}

impl ReplCommand {
    /// Parses a trimmed, non-empty input line.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line == "quit" || line == "exit" {
            return ReplCommand::Quit;
        }
        if !line.starts_with('/') {
            return ReplCommand::Send(line.to_string());
        }

        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match (command, args.as_slice()) {
            ("/new", []) => ReplCommand::New,
            ("/clear", []) => ReplCommand::Clear,
            ("/history", []) => ReplCommand::History,
            ("/status", []) => ReplCommand::Status,
            ("/health", []) => ReplCommand::Health,
            ("/help", []) => ReplCommand::Help,
            ("/quit" | "/exit", []) => ReplCommand::Quit,
            ("/feedback", [position, rating]) => parse_feedback(position, rating),
            ("/feedback", _) => {
                ReplCommand::Invalid("Usage: /feedback <number> up|down|none".to_string())
            }
            (other, _) if COMMANDS.contains(&other) => {
                ReplCommand::Invalid(format!("{} takes no arguments", other))
            }
            (other, _) => ReplCommand::Invalid(format!("Unknown command: {}", other)),
        }
    }
}

/// Completion candidates for the word ending at the end of `line`.
///
/// Returns the byte offset where that word starts together with the
/// candidates. Slash commands complete in first position; ratings complete
/// after `/feedback <n>`.
pub fn completions(line: &str) -> (usize, Vec<&'static str>) {
    if !line.starts_with('/') {
        return (line.len(), Vec::new());
    }

    let words: Vec<&str> = line.split(' ').collect();
    match words.as_slice() {
        [command] => (
            0,
            COMMANDS
                .iter()
                .copied()
                .filter(|c| c.starts_with(command))
                .collect(),
        ),
        ["/feedback", position, rating] if is_position(position) => (
            line.len() - rating.len(),
            RATINGS
                .iter()
                .copied()
                .filter(|r| r.starts_with(rating))
                .collect(),
        ),
        _ => (line.len(), Vec::new()),
    }
}

fn is_position(word: &str) -> bool {
    let digits = word.trim_start_matches('#');
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn parse_feedback(position: &str, rating: &str) -> ReplCommand {
    let position = match position.trim_start_matches('#').parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => return ReplCommand::Invalid(format!("Not a message number: {}", position)),
    };
    let feedback = match rating.to_ascii_lowercase().as_str() {
        "up" | "+" | "good" => Some(Feedback::Positive),
        "down" | "-" | "bad" => Some(Feedback::Negative),
        "none" | "clear" => None,
        other => return ReplCommand::Invalid(format!("Unknown rating: {}", other)),
    };
    ReplCommand::Feedback { position, feedback }
}
