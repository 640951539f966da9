//! Authorized HubSpot API client.

pub mod http;
pub mod types;

pub use types::{
    Communication, ConsentBlock, FieldGroup, FieldValue, LegalConsentOptions, RemoteField,
    RemoteForm, SubmissionBody, SubmissionContext, SubmitResponse, SubscriptionType,
};

use crate::error::{RelayError, Result};
use types::SubscriptionDefinitions;

pub const DEFAULT_AUTHORIZE_URL: &str = "https://app.hubspot.com/oauth/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://api.hubapi.com/oauth/v1/token";
pub const DEFAULT_API_BASE_URL: &str = "https://api.hubapi.com";
pub const DEFAULT_SUBMIT_BASE_URL: &str = "https://api.hsforms.com";
pub const DEFAULT_RECENT_CONTACTS: u32 = 5;

/// HubSpot endpoint locations.
///
/// Overridable so a deployment can go through a proxy and tests can point at
/// a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
    pub submit_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            submit_base_url: DEFAULT_SUBMIT_BASE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Point every endpoint at one base URL (mock servers, proxies).
    pub fn all_at(base: impl Into<String>) -> Self {
        let base = base.into();
        let base = base.trim_end_matches('/').to_string();
        Self {
            authorize_url: format!("{base}/oauth/authorize"),
            token_url: format!("{base}/oauth/v1/token"),
            api_base_url: base.clone(),
            submit_base_url: base,
        }
    }

    fn api(&self, path: &str) -> String {
        format!("{}{path}", self.api_base_url.trim_end_matches('/'))
    }

    fn submit(&self, path: &str) -> String {
        format!("{}{path}", self.submit_base_url.trim_end_matches('/'))
    }
}

/// HubSpot client bound to one access token.
///
/// Obtained from [`OAuthSession::authorized_client`](crate::auth::OAuthSession::authorized_client);
/// cheap to clone.
#[derive(Clone)]
pub struct CrmClient {
    http: reqwest::Client,
    access_token: String,
    endpoints: Endpoints,
}

impl std::fmt::Debug for CrmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmClient")
            .field("access_token", &"..")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl CrmClient {
    pub fn new(
        http: reqwest::Client,
        access_token: impl Into<String>,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            http,
            access_token: access_token.into(),
            endpoints,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Fetch every form of the portal with its field groups.
    pub async fn list_forms(&self) -> Result<Vec<RemoteForm>> {
        let resp = self
            .http
            .get(self.endpoints.api("/forms/v2/forms"))
            .headers(http::bearer_headers(&self.access_token))
            .send()
            .await
            .map_err(|err| RelayError::CatalogUnavailable(err.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = http::body_text(resp).await;
            return Err(RelayError::CatalogUnavailable(format!(
                "forms request failed with status {status}: {body}"
            )));
        }
        resp.json()
            .await
            .map_err(|err| RelayError::CatalogUnavailable(err.to_string()))
    }

    /// Fetch the email subscription definitions of the portal.
    pub async fn list_subscription_types(&self) -> Result<Vec<SubscriptionType>> {
        let resp = self
            .http
            .get(self.endpoints.api("/email/public/v1/subscriptions"))
            .headers(http::bearer_headers(&self.access_token))
            .send()
            .await
            .map_err(|err| RelayError::CatalogUnavailable(err.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = http::body_text(resp).await;
            return Err(RelayError::CatalogUnavailable(format!(
                "subscriptions request failed with status {status}: {body}"
            )));
        }
        let payload: SubscriptionDefinitions = resp
            .json()
            .await
            .map_err(|err| RelayError::CatalogUnavailable(err.to_string()))?;
        Ok(payload.definitions)
    }

    /// Most recently updated contacts, as returned by HubSpot.
    pub async fn recent_contacts(&self, count: u32) -> Result<serde_json::Value> {
        let resp = self
            .http
            .get(self.endpoints.api("/contacts/v1/lists/recently_updated/contacts/recent"))
            .headers(http::bearer_headers(&self.access_token))
            .query(&[("count", count)])
            .send()
            .await
            .map_err(|err| RelayError::CatalogUnavailable(err.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = http::body_text(resp).await;
            return Err(RelayError::CatalogUnavailable(format!(
                "recent contacts request failed with status {status}: {body}"
            )));
        }
        resp.json()
            .await
            .map_err(|err| RelayError::CatalogUnavailable(err.to_string()))
    }

    /// Submit a form to HubSpot.
    ///
    /// Non-2xx answers and transport errors become
    /// [`RelayError::RemoteSubmitFailed`] carrying the response (or error) body.
    pub async fn submit_form(
        &self,
        portal_id: &str,
        form_guid: &str,
        body: &SubmissionBody,
    ) -> Result<SubmitResponse> {
        let url = self.endpoints.submit(&format!(
            "/submissions/v3/integration/secure/submit/{portal_id}/{form_guid}"
        ));
        let resp = self
            .http
            .post(url)
            .headers(http::bearer_headers(&self.access_token))
            .json(body)
            .send()
            .await
            .map_err(|err| RelayError::submit_failed(None, err.to_string()))?;
        let status = resp.status().as_u16();
        let text = http::body_text(resp).await;
        if !(200..300).contains(&status) {
            return Err(RelayError::submit_failed(Some(status), text));
        }
        Ok(SubmitResponse { status, body: text })
    }
}
