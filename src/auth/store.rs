use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::token::Token;
use crate::util::fs::{atomic_write, default_data_dir, read_optional, remove_if_exists};

const TOKEN_FILE_NAME: &str = "hubspot-token.toml";
const TOKEN_FILE_VERSION: u32 = 1;

/// Storage abstraction for the persisted OAuth token triple.
///
/// Implementations must write the triple as a single record; a reader never
/// observes an access token from one exchange next to the expiry of another.
/// Concurrent writers are not coordinated: the last save wins.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<Token>, AuthError>;
    fn save(&self, token: &Token) -> Result<(), AuthError>;
    fn clear(&self) -> Result<(), AuthError>;
}

/// Configuration for file-backed token storage.
#[derive(Debug, Clone)]
pub struct TokenStoreConfig {
    pub base_dir: PathBuf,
}

impl TokenStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_data_dir()
    }
}

/// File-backed token store using a single TOML document.
///
/// # Example
/// ```no_run
/// use chrono::Utc;
/// use hubspot_relay::auth::{FileTokenStore, Token, TokenStore};
///
/// let store = FileTokenStore::new_default();
/// store.save(&Token::issued("access", "refresh", Utc::now(), 1800)?)?;
/// # Ok::<(), hubspot_relay::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    base_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(config: TokenStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_data_dir(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.base_dir.join(TOKEN_FILE_NAME)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<Token>, AuthError> {
        let Some(raw) = read_optional(&self.path())? else {
            return Ok(None);
        };
        let file: TokenFile = toml::from_str(&raw)?;
        if file.version != TOKEN_FILE_VERSION {
            return Err(AuthError::Serialization(format!(
                "unsupported token file version {}",
                file.version
            )));
        }
        Ok(Some(file.token))
    }

    fn save(&self, token: &Token) -> Result<(), AuthError> {
        let file = TokenFile {
            version: TOKEN_FILE_VERSION,
            token: token.clone(),
            saved_at: Utc::now(),
        };
        let serialized = toml::to_string(&file)?;
        atomic_write(&self.path(), serialized.as_bytes())?;
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        remove_if_exists(&self.path())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    version: u32,
    token: Token,
    saved_at: DateTime<Utc>,
}
