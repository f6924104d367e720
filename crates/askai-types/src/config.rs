use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_THREAD_TITLE: &str = "New conversation";
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Tunables for the conversation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum spacing between UI-visible cache updates while streaming
    pub ui_flush_interval: Duration,
    /// Minimum spacing between partial-content writes to storage while streaming
    pub storage_flush_interval: Duration,
    pub title_max_chars: usize,
    pub placeholder_title: String,
    /// Model used when neither the profile nor the provider supplies one
    pub default_model: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ui_flush_interval: Duration::from_millis(150),
            storage_flush_interval: Duration::from_secs(3),
            title_max_chars: 30,
            placeholder_title: DEFAULT_THREAD_TITLE.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ui_flush_interval(mut self, interval: Duration) -> Self {
        self.ui_flush_interval = interval;
        self
    }

    pub fn with_storage_flush_interval(mut self, interval: Duration) -> Self {
        self.storage_flush_interval = interval;
        self
    }

    pub fn with_title_max_chars(mut self, max: usize) -> Self {
        self.title_max_chars = max;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Derive a thread title from the first user message
    pub fn derive_title(&self, text: &str) -> String {
        if text.chars().count() > self.title_max_chars {
            let head: String = text.chars().take(self.title_max_chars).collect();
            format!("{}...", head)
        } else {
            text.to_string()
        }
    }
}
