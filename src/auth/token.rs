use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// OAuth token triple held by a [`TokenStore`](super::TokenStore).
///
/// All three fields are always present together; a store writes and reads
/// the record as one unit.
///
/// # Example
/// ```
/// use chrono::{Duration, Utc};
/// use hubspot_relay::auth::Token;
///
/// let token = Token::issued("access", "refresh", Utc::now(), 1800)?;
/// assert!(!token.is_expired_at(Utc::now()));
/// assert!(token.is_expired_at(Utc::now() + Duration::hours(1)));
/// # Ok::<(), hubspot_relay::auth::AuthError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Build a token whose expiry is `requested_at + expires_in` seconds.
    ///
    /// A lifetime that does not fit a timestamp is an
    /// [`AuthError::InvalidResponse`].
    pub fn issued(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        requested_at: DateTime<Utc>,
        expires_in: i64,
    ) -> Result<Self, AuthError> {
        let expires_at = Duration::try_seconds(expires_in)
            .and_then(|lifetime| requested_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::InvalidResponse(format!("token lifetime out of range: {expires_in}s"))
            })?;
        Ok(Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
        })
    }

    /// A token is usable strictly before its expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.trim().is_empty()
    }
}
