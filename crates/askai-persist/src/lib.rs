pub mod catalog;
pub mod conversation;
pub mod error;
pub mod file_store;
pub mod keys;
pub mod store;

pub use catalog::{MoveDirection, ProfileCatalog, PromptCatalog, DEFAULT_PROFILE_NAME};
pub use conversation::ConversationStore;
pub use error::{PersistError, Result};
pub use file_store::JsonFileStore;
pub use keys::StorageKeys;
pub use store::{KeyValueStore, MemoryStore};
