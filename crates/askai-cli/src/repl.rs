use askai_types::{Notice, NoticeLevel, Profile, Thread};

pub const HELP: &str = "\
Commands:
  /new [profile]        start a thread, optionally bound to a profile
  /threads              list threads, most recent first
  /select <n|id>        switch to a thread
  /delete <n|id>...     delete one or more threads
  /clear                clear the current thread
  /profiles             list profiles
  /bind <profile|none>  bind the current thread to a profile
  /help                 show this help
  /quit                 exit
Anything else is sent as a message.";

/// One line of terminal input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    New(Option<String>),
    Threads,
    Select(String),
    Delete(Vec<String>),
    Clear,
    Profiles,
    Bind(Option<String>),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Send(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let arg = (!arg.is_empty()).then(|| arg.to_string());

        match (name, arg) {
            ("new", arg) => Command::New(arg),
            ("threads" | "ls", None) => Command::Threads,
            ("select" | "s", Some(target)) => Command::Select(target),
            ("delete" | "rm", Some(targets)) => {
                Command::Delete(targets.split_whitespace().map(str::to_string).collect())
            }
            ("clear", None) => Command::Clear,
            ("profiles", None) => Command::Profiles,
            ("bind", Some(target)) if target.eq_ignore_ascii_case("none") => Command::Bind(None),
            ("bind", Some(target)) => Command::Bind(Some(target)),
            ("help" | "?", None) => Command::Help,
            ("quit" | "exit" | "q", None) => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Resolve a 1-based position in `threads`, a thread id or a unique id prefix
pub fn resolve_thread<'a>(threads: &'a [Thread], target: &str) -> Option<&'a Thread> {
    if let Ok(position) = target.parse::<usize>() {
        return position.checked_sub(1).and_then(|i| threads.get(i));
    }
    if let Some(exact) = threads.iter().find(|t| t.id == target) {
        return Some(exact);
    }
    let mut matches = threads.iter().filter(|t| t.id.starts_with(target));
    match (matches.next(), matches.next()) {
        (Some(thread), None) => Some(thread),
        _ => None,
    }
}

pub fn format_thread_line(position: usize, thread: &Thread, current: bool) -> String {
    let marker = if current { "*" } else { " " };
    format!(
        "{} {:>2}. {}  ({})",
        marker,
        position,
        thread.title,
        thread.updated_at.format("%Y-%m-%d %H:%M")
    )
}

pub fn format_profile_line(profile: &Profile) -> String {
    let provider = profile.provider.unwrap_or_default();
    let model = profile.model.as_deref().unwrap_or("provider default");
    let default = if profile.is_default() { " [default]" } else { "" };
    format!("{} - {} / {}{}", profile.name, provider, model, default)
}

pub fn format_notice(notice: &Notice) -> String {
    let prefix = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Failure => "error",
    };
    match &notice.message {
        Some(message) => format!("[{}] {}: {}", prefix, notice.title, message),
        None => format!("[{}] {}", prefix, notice.title),
    }
}

/// Prints a growing reply incrementally
#[derive(Debug, Default)]
pub struct StreamPrinter {
    message_id: Option<String>,
    printed: String,
}

impl StreamPrinter {
    /// Text not yet shown for `message_id`, given its full content so far
    pub fn next_chunk(&mut self, message_id: &str, content: &str) -> Option<String> {
        if self.message_id.as_deref() != Some(message_id) {
            self.message_id = Some(message_id.to_string());
            self.printed.clear();
        }
        if content == self.printed {
            return None;
        }

        let chunk = match content.strip_prefix(self.printed.as_str()) {
            Some(suffix) => suffix.to_string(),
            // Content was replaced rather than extended
            None => format!("\n{}", content),
        };
        self.printed = content.to_string();
        Some(chunk)
    }
}
