mod claude;
mod codex;
mod config;
mod env;
mod process;

pub use claude::{ClaudeCliProvider, ClaudeStreamState, CLAUDE_LOCAL_DEFAULT};
pub use codex::{CodexCliProvider, CODEX_LOCAL_DEFAULT};
pub use config::CliConfig;
pub use env::{augmented_path, ShellEnv};
