use askai_types::ProviderId;
use thiserror::Error;

/// Longest diagnostic capture carried in a CLI failure
pub const MAX_STDERR_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("{command} failed to start: {message}")]
    CliLaunch { command: String, message: String },

    #[error("{command} timed out after {seconds}s")]
    CliTimeout { command: String, seconds: u64 },

    #[error("{command} exited abnormally (code {code:?}): {stderr}")]
    CliExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Provider {0} is not configured")]
    NotConfigured(ProviderId),
}

impl ProviderError {
    pub fn cli_exit(command: impl Into<String>, code: Option<i32>, stderr: &str) -> Self {
        Self::CliExit {
            command: command.into(),
            code,
            stderr: stderr.chars().take(MAX_STDERR_CHARS).collect(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else if e.is_connect() {
            ProviderError::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            ProviderError::Http {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            ProviderError::Request(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
