#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use hubspot_relay::auth::{AuthError, OAuthCredentials, OAuthSession, Token, TokenStore};
use hubspot_relay::client::Endpoints;
use hubspot_relay::relay::{DebugMail, DebugMailer};
use hubspot_relay::RelayError;
use wiremock::MockServer;

pub const PORTAL_ID: &str = "4242";

#[derive(Default)]
pub struct InMemoryTokenStore {
    token: Mutex<Option<Token>>,
    saves: AtomicUsize,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: Token) -> Self {
        let store = Self::default();
        store.seed(token);
        store
    }

    pub fn seed(&self, token: Token) {
        *self.token.lock().expect("store lock poisoned") = Some(token);
    }

    pub fn get(&self) -> Option<Token> {
        self.token.lock().expect("store lock poisoned").clone()
    }

    pub fn clear_token(&self) {
        *self.token.lock().expect("store lock poisoned") = None;
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self) -> Result<Option<Token>, AuthError> {
        Ok(self.get())
    }

    fn save(&self, token: &Token) -> Result<(), AuthError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.seed(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        self.clear_token();
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<DebugMail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<DebugMail> {
        self.sent.lock().expect("mailer lock poisoned").clone()
    }
}

#[async_trait]
impl DebugMailer for RecordingMailer {
    async fn send(&self, mail: &DebugMail) -> hubspot_relay::Result<()> {
        self.sent
            .lock()
            .expect("mailer lock poisoned")
            .push(mail.clone());
        if self.fail {
            return Err(RelayError::Mail("smtp unavailable".to_string()));
        }
        Ok(())
    }
}

pub fn credentials() -> OAuthCredentials {
    OAuthCredentials::new("client-1", "secret-1", "https://site.test/oauth/callback")
}

/// Session whose every endpoint points at the mock server.
pub fn session(store: Arc<InMemoryTokenStore>, server: &MockServer) -> OAuthSession {
    OAuthSession::new(store, credentials())
        .with_http_client(reqwest::Client::new())
        .with_endpoints(Endpoints::all_at(server.uri()))
}

pub fn fresh_token() -> Token {
    Token::issued("access-fresh", "refresh-1", Utc::now(), 1800).expect("token")
}

pub fn expired_token() -> Token {
    Token::issued(
        "access-old",
        "refresh-old",
        Utc::now() - Duration::hours(2),
        1800,
    )
    .expect("token")
}
