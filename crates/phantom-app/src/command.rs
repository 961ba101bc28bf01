//! Parsing of prompt lines into REPL commands.

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Plain text to submit.
    Say(String),
    New,
    List,
    /// 1-based position in the session list.
    Select(usize),
    Delete,
    Image { source: String, text: String },
    Voice,
    /// Deliver a final transcript to the listening recognizer.
    Heard(String),
    /// Speak the given text, or the latest reply when empty.
    Speak(String),
    Help,
    Quit,
    Invalid(String),
}

pub const HELP: &str = "\
commands:
  <text>                 ask a question
  /image <src> [text]    send an image file or data: URL, optionally with a question
  /new                   start a new session
  /list                  list sessions
  /select <n>            switch to session n from /list
  /delete                delete the active session
  /voice                 start or stop listening
  /heard <words>         what the microphone hears while listening
  /speak [text]          read text, or the latest reply, aloud
  /help                  show this help
  /quit                  exit";

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Say(line.to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "new" => Command::New,
        "list" | "ls" => Command::List,
        "select" => match arg.parse::<usize>() {
            Ok(n) if n > 0 => Command::Select(n),
            _ => Command::Invalid(format!("usage: /select <n>, got `{arg}`")),
        },
        "delete" => Command::Delete,
        "image" => {
            if arg.is_empty() {
                return Command::Invalid("usage: /image <path or data: URL> [text]".to_string());
            }
            let (source, text) = match arg.split_once(char::is_whitespace) {
                Some((source, text)) => (source, text.trim()),
                None => (arg, ""),
            };
            Command::Image {
                source: source.to_string(),
                text: text.to_string(),
            }
        }
        "voice" => Command::Voice,
        "heard" => Command::Heard(arg.to_string()),
        "speak" => Command::Speak(arg.to_string()),
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => Command::Invalid(format!("unknown command `/{other}`, try /help")),
    }
}
