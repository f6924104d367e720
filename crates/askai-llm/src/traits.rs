use askai_types::{Message, ProviderId, ReasoningEffort};
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

/// Receives the full text produced so far after every increment
#[derive(Debug, Clone)]
pub struct DeltaSink {
    tx: mpsc::UnboundedSender<String>,
}

impl DeltaSink {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Send the running text; a dropped receiver is ignored
    pub fn emit(&self, text_so_far: &str) {
        let _ = self.tx.send(text_so_far.to_string());
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub model: Option<String>,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub system_prompt: Option<String>,
    pub on_delta: Option<DeltaSink>,
}

impl CompletionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_delta_sink(mut self, sink: DeltaSink) -> Self {
        self.on_delta = Some(sink);
        self
    }

    pub(crate) fn emit(&self, text_so_far: &str) {
        if let Some(sink) = &self.on_delta {
            sink.emit(text_so_far);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub content: String,
    /// Model that actually answered, or a descriptive fallback label
    pub model: String,
    pub used_web_search: Option<bool>,
}

/// One completion backend
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Run a completion over `messages`, reporting running text through
    /// `options.on_delta`
    async fn complete(&self, messages: &[Message], options: CompletionOptions)
        -> Result<CompletionResult>;
}
