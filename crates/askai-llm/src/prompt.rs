use askai_types::{Message, MessageRole};

/// Explicit system prompt followed by system-turn contents, newline joined.
/// Empty parts and exact repeats are dropped.
pub fn combined_system_prompt(system_prompt: Option<&str>, messages: &[Message]) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    let candidates = system_prompt
        .into_iter()
        .chain(messages.iter().filter(|m| m.is_system()).map(|m| m.content.as_str()));

    for part in candidates {
        if !part.is_empty() && !parts.contains(&part) {
            parts.push(part);
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

/// `[User]` / `[Assistant]` blocks separated by a blank line; system turns omitted
pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .filter_map(|m| match m.role {
            MessageRole::User => Some(format!("[User]\n{}", m.content)),
            MessageRole::Assistant => Some(format!("[Assistant]\n{}", m.content)),
            MessageRole::System => None,
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Like [`format_transcript`], but a lone turn is passed through verbatim
pub fn format_single_or_transcript(messages: &[Message]) -> String {
    let mut turns = messages.iter().filter(|m| !m.is_system());
    match (turns.next(), turns.next()) {
        (Some(only), None) => only.content.clone(),
        _ => format_transcript(messages),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_labels_and_skips_system() {
        let messages = vec![
            Message::system("t", "rules"),
            Message::user("t", "hi"),
            Message::assistant("t", "hello"),
            Message::user("t", "how are you"),
        ];

        assert_eq!(
            format_transcript(&messages),
            "[User]\nhi\n\n[Assistant]\nhello\n\n[User]\nhow are you"
        );
    }

    #[test]
    fn test_single_turn_is_verbatim() {
        let messages = vec![Message::system("t", "rules"), Message::user("t", "just this")];
        assert_eq!(format_single_or_transcript(&messages), "just this");
    }

    #[test]
    fn test_combined_system_prompt_dedupes() {
        let messages = vec![Message::system("t", "be brief"), Message::system("t", "use English")];

        assert_eq!(
            combined_system_prompt(Some("be brief"), &messages).as_deref(),
            Some("be brief\nuse English")
        );
        assert_eq!(combined_system_prompt(Some(""), &[]), None);
    }
}
