use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend family a profile dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "openai-api")]
    OpenAiApi,
    #[serde(rename = "codex-cli")]
    CodexCli,
    #[serde(rename = "claude-cli")]
    ClaudeCli,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [ProviderId::OpenAiApi, ProviderId::CodexCli, ProviderId::ClaudeCli];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAiApi => "openai-api",
            ProviderId::CodexCli => "codex-cli",
            ProviderId::ClaudeCli => "claude-cli",
        }
    }

    pub fn is_cli(&self) -> bool {
        matches!(self, ProviderId::CodexCli | ProviderId::ClaudeCli)
    }
}

impl Default for ProviderId {
    fn default() -> Self {
        ProviderId::OpenAiApi
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProviderError(pub String);

impl fmt::Display for ParseProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown provider: {}", self.0)
    }
}

impl std::error::Error for ParseProviderError {}

impl FromStr for ProviderId {
    type Err = ParseProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParseProviderError(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named bundle of system prompt, provider and model defaults bindable to a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_selected_text: Option<bool>,
}

impl Profile {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            id: crate::new_id(),
            name: name.into(),
            system_prompt: system_prompt.into(),
            model: None,
            icon: None,
            provider: None,
            reasoning_effort: None,
            is_default: None,
            use_selected_text: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    pub fn is_default(&self) -> bool {
        self.is_default.unwrap_or(false)
    }
}
