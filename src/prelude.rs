//! Convenience re-exports for common use.

pub use crate::auth::{OAuthCredentials, OAuthSession, Token, TokenStore};
pub use crate::catalog::FormCatalog;
pub use crate::config::RelayConfig;
pub use crate::error::{RelayError, Result};
pub use crate::form::{FormElement, LocalForm};
pub use crate::mapping::{FieldMappingConfig, MappingEditor, MappingForm, MappingStore};
pub use crate::relay::{RelayOutcome, RelaySettings, SubmissionEvent, SubmissionRelay};
