mod budget;
mod default;
mod strategy;

pub use budget::{
    estimate_message_tokens, estimate_messages_tokens, estimate_tokens, is_reasoning_model,
    model_context_limit, ContextBudget, DEFAULT_CONTEXT_LIMIT, MESSAGE_OVERHEAD_TOKENS,
    REASONING_MODELS, RESPONSE_BUFFER_TOKENS,
};
pub use default::{trim_messages_for_context, trim_to_budget, DefaultContextStrategy};
pub use strategy::{ContextStrategy, TrimResult};
