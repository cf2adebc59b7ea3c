/// One line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    NewTopic,
    ListTopics,
    /// One-based position in the topic list.
    Select(usize),
    Cancel,
    Dismiss,
    Help,
    Quit,
    Invalid(String),
    Empty,
}

pub const HELP_TEXT: &str = "\
Type a question and press Enter to ask it in the selected chat.
  /new         start a new chat
  /topics      list chats, newest first
  /select <n>  open chat number n
  /cancel      stop waiting for the current answer
  /dismiss     clear the error notification
  /help        show this help
  /quit        exit";

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Ask(line.to_string());
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let argument = parts.next();
    match (name, argument) {
        ("new", None) => Command::NewTopic,
        ("topics", None) => Command::ListTopics,
        ("select", Some(position)) => match position.parse::<usize>() {
            Ok(position) if position > 0 => Command::Select(position),
            _ => Command::Invalid(format!("not a chat number: {position}")),
        },
        ("select", None) => Command::Invalid("usage: /select <n>".to_string()),
        ("cancel", None) => Command::Cancel,
        ("dismiss", None) => Command::Dismiss,
        ("help", None) => Command::Help,
        ("quit" | "exit", None) => Command::Quit,
        _ => Command::Invalid(format!("unknown command: {line}")),
    }
}
