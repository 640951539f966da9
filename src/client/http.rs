//! Shared HTTP client and header helpers.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
///
/// The relay imposes no timeout policy of its own; this is the only bound on
/// an outbound call.
pub fn shared_client() -> reqwest::Client {
    SHARED_CLIENT
        .get_or_init(|| {
            reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .pool_max_idle_per_host(4)
                .build()
                .unwrap_or_else(|err| {
                    tracing::warn!(error = %err, "falling back to default HTTP client");
                    reqwest::Client::new()
                })
        })
        .clone()
}

/// Headers for a HubSpot OAuth bearer call.
pub fn bearer_headers(access_token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {access_token}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Read a response body for logging, never failing.
pub async fn body_text(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|err| format!("<unreadable body: {err}>"))
}
