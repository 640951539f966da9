//! HubSpot OAuth session and token storage.

pub mod error;
pub mod session;
pub mod store;
pub mod token;

pub use error::AuthError;
pub use session::{OAuthCredentials, OAuthSession, OAUTH_SCOPES};
pub use store::{FileTokenStore, TokenStore, TokenStoreConfig};
pub use token::Token;
