use thiserror::Error;

use crate::error::RelayError;

/// Errors raised while obtaining, refreshing or storing OAuth tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not connected to HubSpot")]
    NotConfigured,
    #[error("Token endpoint returned status {status}: {body}")]
    ExchangeFailed { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<AuthError> for RelayError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::NotConfigured => RelayError::NotConfigured,
            AuthError::Io(message) | AuthError::Serialization(message) => {
                RelayError::Storage(message)
            }
            other @ (AuthError::ExchangeFailed { .. }
            | AuthError::InvalidResponse(_)
            | AuthError::Network(_)) => RelayError::AuthExchangeFailed(other.to_string()),
        }
    }
}
