use askai_types::Message;

use crate::budget::{estimate_message_tokens, estimate_messages_tokens, ContextBudget};
use crate::strategy::{ContextStrategy, TrimResult};

/// Keep every system message and the newest turn, then fill the remaining
/// budget greedily from newest to oldest.
///
/// Turns that do not fit are skipped rather than ending the walk, so a large
/// old turn does not shadow smaller ones before it. The kept set is returned
/// in chronological order.
pub fn trim_to_budget(messages: Vec<Message>, budget: ContextBudget) -> TrimResult {
    if budget.fits(estimate_messages_tokens(&messages)) {
        return TrimResult::unchanged(messages);
    }

    let (mut kept, mut history): (Vec<Message>, Vec<Message>) =
        messages.into_iter().partition(Message::is_system);
    history.sort_by_key(|m| m.created_at);

    let mut used = estimate_messages_tokens(&kept);
    let newest = history.len().checked_sub(1);

    for (index, message) in history.into_iter().enumerate().rev() {
        let cost = estimate_message_tokens(&message);
        if !budget.fits(used + cost) && Some(index) != newest {
            continue;
        }
        used += cost;
        kept.push(message);
    }

    // Stable, so equal timestamps keep system-first insertion order
    kept.sort_by_key(|m| m.created_at);

    let exceeds_limit = !budget.fits(used);
    tracing::debug!(
        kept = kept.len(),
        used_tokens = used,
        limit = budget.limit,
        exceeds_limit,
        "trimmed conversation history"
    );

    TrimResult {
        trimmed: kept,
        was_trimmed: true,
        exceeds_limit,
    }
}

/// Trim using the budget derived from the model's context window
pub fn trim_messages_for_context(messages: Vec<Message>, model: &str) -> TrimResult {
    trim_to_budget(messages, ContextBudget::for_model(model))
}

/// Heuristic trimmer used by the engine
///
/// Looks the budget up per model unless a fixed limit was configured.
#[derive(Debug, Clone, Default)]
pub struct DefaultContextStrategy {
    fixed_limit: Option<usize>,
}

impl DefaultContextStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `limit` estimated tokens for every model
    pub fn with_context_limit(mut self, limit: usize) -> Self {
        self.fixed_limit = Some(limit);
        self
    }
}

impl ContextStrategy for DefaultContextStrategy {
    fn trim(&self, messages: Vec<Message>, model: &str) -> TrimResult {
        match self.fixed_limit {
            Some(limit) => trim_to_budget(messages, ContextBudget::new(limit)),
            None => trim_messages_for_context(messages, model),
        }
    }
}
