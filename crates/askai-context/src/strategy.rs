use askai_types::Message;

/// Outcome of fitting a conversation into a context budget
#[derive(Debug, Clone)]
pub struct TrimResult {
    pub trimmed: Vec<Message>,
    pub was_trimmed: bool,
    /// The minimal kept set still does not fit; the request must not be sent
    pub exceeds_limit: bool,
}

impl TrimResult {
    pub fn unchanged(messages: Vec<Message>) -> Self {
        Self {
            trimmed: messages,
            was_trimmed: false,
            exceeds_limit: false,
        }
    }
}

/// Strategy for reducing conversation history before dispatch
pub trait ContextStrategy: Send + Sync {
    fn trim(&self, messages: Vec<Message>, model: &str) -> TrimResult;
}
