use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::error::AuthError;
use crate::auth::store::TokenStore;
use crate::auth::token::Token;
use crate::client::{http, CrmClient, Endpoints};

/// OAuth scopes requested from HubSpot.
pub const OAUTH_SCOPES: &str = "oauth forms";

/// App credentials registered with HubSpot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl OAuthCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }
}

/// HubSpot OAuth session: connects the account and hands out clients bound
/// to a valid access token.
///
/// Refreshes are not coordinated across requests or processes. Two
/// overlapping refreshes both store a valid triple and the last save wins.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use hubspot_relay::auth::{FileTokenStore, OAuthCredentials, OAuthSession, TokenStoreConfig};
///
/// let store = FileTokenStore::new(TokenStoreConfig::new(std::path::PathBuf::from("/tmp")));
/// let session = OAuthSession::new(
///     Arc::new(store),
///     OAuthCredentials::new("client-id", "secret", "https://example.com/oauth/callback"),
/// );
/// println!("{}", session.authorization_url()?);
/// # Ok::<(), hubspot_relay::auth::AuthError>(())
/// ```
pub struct OAuthSession {
    client: reqwest::Client,
    token_store: Arc<dyn TokenStore>,
    credentials: OAuthCredentials,
    endpoints: Endpoints,
    cached_client: Mutex<Option<CrmClient>>,
}

impl OAuthSession {
    pub fn new(token_store: Arc<dyn TokenStore>, credentials: OAuthCredentials) -> Self {
        Self {
            client: http::shared_client(),
            token_store,
            credentials,
            endpoints: Endpoints::default(),
            cached_client: Mutex::new(None),
        }
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.endpoints.authorize_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.endpoints.token_url = url.into();
        self
    }

    pub fn credentials(&self) -> &OAuthCredentials {
        &self.credentials
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// True iff a refresh token is stored.
    ///
    /// A store that cannot be read counts as "not connected".
    pub fn is_authorized(&self) -> bool {
        match self.token_store.load() {
            Ok(Some(token)) => token.has_refresh_token(),
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(error = %err, "token store unreadable");
                false
            }
        }
    }

    /// Stored token, if any.
    pub fn stored_token(&self) -> Result<Option<Token>, AuthError> {
        self.token_store.load()
    }

    /// Vendor authorization URL the admin is redirected to.
    pub fn authorization_url(&self) -> Result<String, AuthError> {
        let url = reqwest::Url::parse_with_params(
            &self.endpoints.authorize_url,
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ("scope", OAUTH_SCOPES),
            ],
        )
        .map_err(|err| AuthError::InvalidResponse(format!("invalid authorize URL: {err}")))?;
        Ok(url.to_string())
    }

    /// Exchange an authorization code for the initial token triple.
    pub async fn complete_authorization(&self, code: &str) -> Result<Token, AuthError> {
        let requested_at = Utc::now();
        self.complete_authorization_at(code, requested_at).await
    }

    /// Same as [`complete_authorization`](Self::complete_authorization) with an
    /// explicit request time; the expiry is `requested_at + expires_in`.
    pub async fn complete_authorization_at(
        &self,
        code: &str,
        requested_at: DateTime<Utc>,
    ) -> Result<Token, AuthError> {
        if code.trim().is_empty() {
            return Err(AuthError::InvalidResponse(
                "authorization code is empty".to_string(),
            ));
        }
        let token = self
            .exchange(&[("grant_type", "authorization_code"), ("code", code)], requested_at)
            .await?;
        self.token_store.save(&token)?;
        self.reset_cached_client();
        tracing::info!(expires_at = %token.expires_at, "HubSpot account connected");
        Ok(token)
    }

    /// Client bound to a valid access token, refreshing first when the stored
    /// token has expired.
    ///
    /// Fails with [`AuthError::NotConfigured`] without any network call when no
    /// refresh token is stored.
    pub async fn authorized_client(&self) -> Result<CrmClient, AuthError> {
        let token = self
            .token_store
            .load()?
            .filter(Token::has_refresh_token)
            .ok_or(AuthError::NotConfigured)?;

        let now = Utc::now();
        let token = if token.is_expired_at(now) {
            self.refresh(&token, now).await?
        } else {
            token
        };

        if let Some(client) = self.read_cached_client(&token.access_token) {
            return Ok(client);
        }
        let client = CrmClient::new(
            self.client.clone(),
            token.access_token.clone(),
            self.endpoints.clone(),
        );
        self.write_cached_client(client.clone());
        Ok(client)
    }

    /// Forget the stored token and the cached client.
    pub fn disconnect(&self) -> Result<(), AuthError> {
        self.token_store.clear()?;
        self.reset_cached_client();
        Ok(())
    }

    async fn refresh(
        &self,
        token: &Token,
        requested_at: DateTime<Utc>,
    ) -> Result<Token, AuthError> {
        tracing::debug!(expired_at = %token.expires_at, "refreshing HubSpot access token");
        let refreshed = self
            .exchange(
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", token.refresh_token.as_str()),
                ],
                requested_at,
            )
            .await?;
        self.token_store.save(&refreshed)?;
        self.reset_cached_client();
        tracing::info!(expires_at = %refreshed.expires_at, "HubSpot access token refreshed");
        Ok(refreshed)
    }

    async fn exchange(
        &self,
        grant: &[(&str, &str)],
        requested_at: DateTime<Utc>,
    ) -> Result<Token, AuthError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
        ];
        form.extend_from_slice(grant);

        let resp = self
            .client
            .post(&self.endpoints.token_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = http::body_text(resp).await;
            tracing::warn!(status = status.as_u16(), "HubSpot token exchange rejected");
            return Err(AuthError::ExchangeFailed {
                status: status.as_u16(),
                body,
            });
        }
        let payload: TokenResponse = resp.json().await?;
        if payload.access_token.is_empty() || payload.refresh_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "token response is missing access or refresh token".to_string(),
            ));
        }
        Token::issued(
            payload.access_token,
            payload.refresh_token,
            requested_at,
            payload.expires_in,
        )
    }

    fn read_cached_client(&self, access_token: &str) -> Option<CrmClient> {
        let guard = self.cached_client.lock().ok()?;
        guard
            .as_ref()
            .filter(|client| client.access_token() == access_token)
            .cloned()
    }

    fn write_cached_client(&self, client: CrmClient) {
        if let Ok(mut guard) = self.cached_client.lock() {
            *guard = Some(client);
        }
    }

    fn reset_cached_client(&self) {
        if let Ok(mut guard) = self.cached_client.lock() {
            *guard = None;
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    expires_in: i64,
}
