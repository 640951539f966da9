//! Error types for the relay.

use thiserror::Error;

/// Primary error type for all relay operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// No refresh token is stored; the CRM account must be connected first.
    #[error("HubSpot is not connected: no refresh token stored")]
    NotConfigured,

    #[error("OAuth token exchange failed: {0}")]
    AuthExchangeFailed(String),

    #[error("HubSpot catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("HubSpot submission failed{}: {body}", status_suffix(.status))]
    RemoteSubmitFailed { status: Option<u16>, body: String },

    #[error("Invalid field mapping: {0}")]
    InvalidMapping(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The admin has to connect (or reconnect) the HubSpot account.
    Authorization,
    /// The remote API could not be reached or refused the request.
    Remote,
    /// Bad local input: mapping or configuration values.
    Input,
    /// Local persistence or serialization.
    Storage,
    /// Side channel such as the debug mail.
    Notification,
}

impl RelayError {
    pub fn submit_failed(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::RemoteSubmitFailed {
            status,
            body: body.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotConfigured | Self::AuthExchangeFailed(_) => ErrorCategory::Authorization,
            Self::CatalogUnavailable(_) | Self::RemoteSubmitFailed { .. } => ErrorCategory::Remote,
            Self::InvalidMapping(_) | Self::Configuration(_) => ErrorCategory::Input,
            Self::Storage(_) | Self::Io(_) | Self::Serialization(_) => ErrorCategory::Storage,
            Self::Mail(_) => ErrorCategory::Notification,
        }
    }

    /// Whether calling the same operation again later may succeed without
    /// any admin intervention.
    ///
    /// Catalog failures are retried lazily on the next call. A submit that
    /// never got a response (no status) is transient; a rejected submit is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::CatalogUnavailable(_) => true,
            Self::RemoteSubmitFailed { status, .. } => match status {
                None => true,
                Some(code) => *code == 429 || (500..=599).contains(code),
            },
            _ => false,
        }
    }

    /// Short admin-facing hint for the error.
    pub fn admin_hint(&self) -> &'static str {
        match self {
            Self::NotConfigured => "Connect the HubSpot account.",
            Self::AuthExchangeFailed(_) => "Re-authorize the HubSpot integration.",
            Self::CatalogUnavailable(_) => "Unable to load HubSpot form info.",
            Self::RemoteSubmitFailed { .. } => "Submission was not delivered to HubSpot.",
            Self::InvalidMapping(_) => "Review the field mapping.",
            Self::Configuration(_) => "Review the HubSpot settings.",
            Self::Storage(_) | Self::Io(_) | Self::Serialization(_) => {
                "Check the relay data directory."
            }
            Self::Mail(_) => "Check the debug mail transport.",
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, RelayError>;
