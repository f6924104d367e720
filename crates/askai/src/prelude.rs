//! Prelude module for convenient imports
//!
//! ```rust
//! use askai::prelude::*;
//! ```

pub use crate::{
    ConversationEngine, EngineBuilder, EngineConfig, EngineEvent, InitOptions, SendOutcome,
    Message, MessageRole, Notice, Thread, Profile, ProviderId,
    ProviderDispatcher, CompletionProvider, OpenAIProvider, OpenAIConfig,
    ClaudeCliProvider, CodexCliProvider, CliConfig,
    MemoryStore, JsonFileStore, KeyValueStore, PromptCatalog, ProfileCatalog,
    DefaultContextStrategy,
};
