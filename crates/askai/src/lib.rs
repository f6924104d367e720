//! # Ask AI
//!
//! A chat-session engine that keeps threads of messages, sends each turn to
//! one of several completion providers and persists state so a reply cut off
//! by a crash can be recovered.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use askai::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = OpenAIProvider::new(OpenAIConfig::new(std::env::var("OPENAI_API_KEY")?))?;
//!
//!     let engine = ConversationEngine::builder()
//!         .store(Arc::new(MemoryStore::new()))
//!         .dispatcher(ProviderDispatcher::new().with_provider(Arc::new(provider)))
//!         .build()?;
//!
//!     engine.initialize(InitOptions::resume()).await;
//!     engine.send_message("Hello!").await;
//!
//!     for message in engine.messages().await {
//!         println!("{}: {}", message.role.as_str(), message.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`askai-types`**: messages, threads, profiles and engine events
//! - **`askai-context`**: token estimation and history trimming
//! - **`askai-persist`**: key-value storage, conversation records and the profile catalog
//! - **`askai-llm`**: the OpenAI Responses client, the codex and claude CLI providers and the dispatcher
//! - **`askai-engine`**: the conversation engine

pub mod prelude;

pub use askai_types::{
    ApiError, EngineConfig, EngineEvent, ErrorKind, Message, MessageRole, Notice, NoticeLevel,
    Profile, ProviderId, ReasoningEffort, Thread,
};

pub use askai_context::{ContextBudget, ContextStrategy, DefaultContextStrategy, TrimResult};

pub use askai_persist::{
    ConversationStore, JsonFileStore, KeyValueStore, MemoryStore, MoveDirection, PersistError,
    ProfileCatalog, PromptCatalog, StorageKeys,
};

pub use askai_llm::{
    classify_provider_error, ClaudeCliProvider, CliConfig, CodexCliProvider, CompletionOptions,
    CompletionProvider, CompletionResult, DeltaSink, OpenAIConfig, OpenAIProvider,
    ProviderDispatcher, ProviderError, ShellEnv,
};

pub use askai_engine::{
    ConversationEngine, EngineBuilder, EngineError, InitOptions, SendOutcome, Throttle,
};
