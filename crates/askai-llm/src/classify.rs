use askai_types::{ApiError, ErrorKind, ProviderId};

use crate::error::ProviderError;

/// Map a provider failure onto the user-facing taxonomy
pub fn classify_provider_error(provider: ProviderId, error: &ProviderError) -> ApiError {
    if let ProviderError::NotConfigured(id) = error {
        return ApiError::new(
            ErrorKind::Auth,
            format!("Provider {} is not configured. Check your settings.", id),
        );
    }

    if provider.is_cli() {
        classify_cli_error(error)
    } else {
        classify_api_error(error)
    }
}

fn classify_api_error(error: &ProviderError) -> ApiError {
    match error {
        ProviderError::Timeout(_) => {
            ApiError::new(ErrorKind::Timeout, "The request timed out. Please try again.")
        }
        ProviderError::Connection(_) => ApiError::new(
            ErrorKind::Network,
            "Network connection failed. Check your connection.",
        ),
        ProviderError::Http { status: 401, .. } => {
            ApiError::new(ErrorKind::Auth, "The API key is invalid. Check your settings.")
        }
        ProviderError::Http { status: 429, .. } => ApiError::new(
            ErrorKind::RateLimit,
            "Rate limit reached. Wait a moment and try again.",
        ),
        other => ApiError::new(
            ErrorKind::Unknown,
            format!("An unexpected error occurred: {}", other),
        ),
    }
}

fn classify_cli_error(error: &ProviderError) -> ApiError {
    match error {
        ProviderError::CliTimeout { .. } => ApiError::new(ErrorKind::Timeout, error.to_string()),
        ProviderError::CliLaunch { .. } => {
            ApiError::new(ErrorKind::Network, format!("Failed to run CLI: {}", error))
        }
        other => ApiError::new(ErrorKind::Unknown, format!("CLI error: {}", other)),
    }
}
