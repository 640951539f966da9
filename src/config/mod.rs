//! Configuration system (layered: env > TOML file > defaults).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::auth::OAuthCredentials;
use crate::client::Endpoints;
use crate::error::{RelayError, Result};
use crate::legacy::FormsMapping;
use crate::relay::{RelaySettings, SmtpSettings};
use crate::util::fs::{default_data_dir, read_optional};

/// Env var naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "HUBSPOT_RELAY_CONFIG";
const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Administrative settings of the relay.
///
/// Resolution order:
/// 1. `HUBSPOT_*` environment variables (a `.env` file is loaded first)
/// 2. the TOML config file (`$HUBSPOT_RELAY_CONFIG` or `<data dir>/config.toml`)
/// 3. defaults
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub portal_id: Option<String>,
    pub debug_on: bool,
    pub debug_email: Option<String>,
    pub site_mail: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub api_base_url: Option<String>,
    pub submit_base_url: Option<String>,
    /// `remoteGuid|localFormId` lines.
    pub forms_mapping: Option<String>,
    pub listen_addr: Option<String>,
    /// Read the client IP from proxy headers.
    pub trust_proxy: bool,
    /// Debug mails go through this SMTP relay when set; otherwise they are
    /// only logged.
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| ".."))
            .field("redirect_uri", &self.redirect_uri)
            .field("portal_id", &self.portal_id)
            .field("debug_on", &self.debug_on)
            .field("debug_email", &self.debug_email)
            .field("site_mail", &self.site_mail)
            .field("data_dir", &self.data_dir)
            .field("listen_addr", &self.listen_addr)
            .field("trust_proxy", &self.trust_proxy)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_user", &self.smtp_user)
            .finish_non_exhaustive()
    }
}

impl RelayConfig {
    /// Load the config file (if any) and apply the process environment.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Like [`from_env`](Self::from_env) with an explicit config file path.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| default_data_dir().join(CONFIG_FILE_NAME));
        let mut config = Self::load_file(&path)?.unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML config file; `None` when it does not exist.
    pub fn load_file(path: &Path) -> Result<Option<Self>> {
        let Some(raw) = read_optional(path)? else {
            return Ok(None);
        };
        Self::from_toml_str(&raw)
            .map(Some)
            .map_err(|err| RelayError::Configuration(format!("{}: {err}", path.display())))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| RelayError::Configuration(err.to_string()))
    }

    /// Override fields from `HUBSPOT_*` variables resolved through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let strings: [(&str, &mut Option<String>); 15] = [
            ("HUBSPOT_CLIENT_ID", &mut self.client_id),
            ("HUBSPOT_CLIENT_SECRET", &mut self.client_secret),
            ("HUBSPOT_REDIRECT_URI", &mut self.redirect_uri),
            ("HUBSPOT_PORTAL_ID", &mut self.portal_id),
            ("HUBSPOT_DEBUG_EMAIL", &mut self.debug_email),
            ("HUBSPOT_SITE_MAIL", &mut self.site_mail),
            ("HUBSPOT_AUTHORIZE_URL", &mut self.authorize_url),
            ("HUBSPOT_TOKEN_URL", &mut self.token_url),
            ("HUBSPOT_API_BASE_URL", &mut self.api_base_url),
            ("HUBSPOT_SUBMIT_BASE_URL", &mut self.submit_base_url),
            ("HUBSPOT_FORMS_MAPPING", &mut self.forms_mapping),
            ("HUBSPOT_LISTEN_ADDR", &mut self.listen_addr),
            ("HUBSPOT_SMTP_HOST", &mut self.smtp_host),
            ("HUBSPOT_SMTP_USER", &mut self.smtp_user),
            ("HUBSPOT_SMTP_PASSWORD", &mut self.smtp_password),
        ];
        for (var, slot) in strings {
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                *slot = Some(value);
            }
        }
        if let Some(dir) = lookup("HUBSPOT_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(port) = lookup("HUBSPOT_SMTP_PORT").and_then(|v| v.trim().parse().ok()) {
            self.smtp_port = Some(port);
        }
        if let Some(flag) = lookup("HUBSPOT_DEBUG_ON") {
            self.debug_on = env_flag(&flag);
        }
        if let Some(flag) = lookup("HUBSPOT_TRUST_PROXY") {
            self.trust_proxy = env_flag(&flag);
        }
    }

    /// OAuth app credentials; every part is required.
    pub fn require_credentials(&self) -> Result<OAuthCredentials> {
        let client_id = required(&self.client_id, "client_id")?;
        let client_secret = required(&self.client_secret, "client_secret")?;
        let redirect_uri = required(&self.redirect_uri, "redirect_uri")?;
        Ok(OAuthCredentials::new(client_id, client_secret, redirect_uri))
    }

    pub fn relay_settings(&self) -> Result<RelaySettings> {
        let portal_id = required(&self.portal_id, "portal_id")?;
        Ok(RelaySettings {
            portal_id: portal_id.to_string(),
            debug_on: self.debug_on,
            debug_email: self.debug_email.clone(),
            site_mail: self.site_mail.clone(),
        })
    }

    /// SMTP relay for debug mails; `None` when no host is configured.
    ///
    /// The sender defaults to `site_mail`, then to the SMTP user.
    pub fn smtp_settings(&self) -> Result<Option<SmtpSettings>> {
        let Some(host) = self.smtp_host.as_deref().map(str::trim).filter(|h| !h.is_empty())
        else {
            return Ok(None);
        };
        let from = [&self.site_mail, &self.smtp_user]
            .into_iter()
            .find_map(|value| value.as_deref().map(str::trim).filter(|v| !v.is_empty()))
            .ok_or_else(|| {
                RelayError::Configuration("smtp_host is set but site_mail is not".to_string())
            })?;
        Ok(Some(SmtpSettings {
            host: host.to_string(),
            port: self.smtp_port,
            username: self.smtp_user.clone(),
            password: self.smtp_password.clone(),
            from: from.to_string(),
        }))
    }

    pub fn endpoints(&self) -> Endpoints {
        let mut endpoints = Endpoints::default();
        if let Some(url) = &self.authorize_url {
            endpoints.authorize_url = url.clone();
        }
        if let Some(url) = &self.token_url {
            endpoints.token_url = url.clone();
        }
        if let Some(url) = &self.api_base_url {
            endpoints.api_base_url = url.clone();
        }
        if let Some(url) = &self.submit_base_url {
            endpoints.submit_base_url = url.clone();
        }
        endpoints
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn listen_addr(&self) -> &str {
        self.listen_addr.as_deref().unwrap_or(DEFAULT_LISTEN_ADDR)
    }

    pub fn legacy_mapping(&self) -> Result<FormsMapping> {
        FormsMapping::parse(self.forms_mapping.as_deref().unwrap_or_default())
    }
}

fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RelayError::Configuration(format!("{name} is not set")))
}
