use askai_types::Message;

/// Fixed per-message cost for role and framing
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Tokens held back for the model's answer
pub const RESPONSE_BUFFER_TOKENS: usize = 4096;

/// Context window assumed for models missing from the table
pub const DEFAULT_CONTEXT_LIMIT: usize = 128_000;

const MODEL_CONTEXT_LIMITS: &[(&str, usize)] = &[
    ("gpt-4.1-nano", 1_047_576),
    ("gpt-4.1-mini", 1_047_576),
    ("gpt-4.1", 1_047_576),
    ("gpt-5-nano", 400_000),
    ("gpt-5-mini", 400_000),
    ("gpt-5.2", 400_000),
];

/// Models that accept a reasoning effort parameter
pub const REASONING_MODELS: &[&str] = &["gpt-5-nano", "gpt-5-mini", "gpt-5.2"];

pub fn is_reasoning_model(model: &str) -> bool {
    REASONING_MODELS.contains(&model)
}

/// Rough token estimate: two characters per token, rounded up
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(2)
}

pub fn estimate_message_tokens(message: &Message) -> usize {
    estimate_tokens(&message.content) + MESSAGE_OVERHEAD_TOKENS
}

pub fn estimate_messages_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

/// Raw context window of a model
pub fn model_context_limit(model: &str) -> usize {
    MODEL_CONTEXT_LIMITS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, limit)| *limit)
        .unwrap_or(DEFAULT_CONTEXT_LIMIT)
}

/// Usable prompt budget in estimated tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    pub limit: usize,
}

impl ContextBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Model window minus the response reservation
    pub fn for_model(model: &str) -> Self {
        Self::new(model_context_limit(model).saturating_sub(RESPONSE_BUFFER_TOKENS))
    }

    pub fn fits(&self, tokens: usize) -> bool {
        tokens <= self.limit
    }
}
