mod builder;
mod engine;
mod error;
mod lock;
mod throttle;
mod turn;

pub use builder::EngineBuilder;
pub use engine::{ConversationEngine, InitOptions, SendOutcome};
pub use error::{EngineError, Result};
pub use lock::{SendGuard, SendLock};
pub use throttle::Throttle;
