pub mod config;
pub mod error;
pub mod events;
pub mod message;
pub mod profile;

pub use config::{EngineConfig, DEFAULT_MODEL, DEFAULT_THREAD_TITLE};
pub use error::{ApiError, ErrorKind};
pub use events::{EngineEvent, Notice, NoticeLevel};
pub use message::{Message, MessageRole, Thread};
pub use profile::{ParseProviderError, Profile, ProviderId, ReasoningEffort};

/// Generate a fresh unique identifier for threads, messages and profiles
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
