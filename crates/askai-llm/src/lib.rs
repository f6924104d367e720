pub mod buffer_utils;
pub mod classify;
pub mod cli;
pub mod dispatcher;
pub mod error;
pub mod openai;
pub mod prompt;
pub mod traits;

pub use buffer_utils::{CircularLineBuffer, SseLineParser};
pub use classify::classify_provider_error;
pub use cli::{ClaudeCliProvider, CliConfig, CodexCliProvider, ShellEnv};
pub use dispatcher::ProviderDispatcher;
pub use error::{ProviderError, Result};
pub use openai::{OpenAIConfig, OpenAIProvider};
pub use traits::{CompletionOptions, CompletionProvider, CompletionResult, DeltaSink};
