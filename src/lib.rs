//! hubspot-relay: relay site form submissions to HubSpot
//!
//! Maps local form fields to HubSpot form fields, keeps the HubSpot OAuth
//! token triple fresh, and posts every submission of a connected form to the
//! secure form submission API with consent, subscription and page context.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use hubspot_relay::prelude::*;
//! use hubspot_relay::auth::FileTokenStore;
//! use hubspot_relay::mapping::FileMappingStore;
//! use hubspot_relay::relay::LogMailer;
//!
//! # async fn example() -> hubspot_relay::error::Result<()> {
//! let config = RelayConfig::from_env()?;
//! let session = Arc::new(OAuthSession::new(
//!     Arc::new(FileTokenStore::new_default()),
//!     config.require_credentials()?,
//! ));
//! let relay = SubmissionRelay::new(
//!     session,
//!     Arc::new(FileMappingStore::new(config.data_dir())),
//!     Arc::new(LogMailer),
//!     config.relay_settings()?,
//! );
//! let event = SubmissionEvent::builder()
//!     .form(LocalForm::new("contact_us", "Contact us"))
//!     .build();
//! let outcome = relay.relay(&event).await;
//! println!("{:?}", outcome.state());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod catalog;
pub mod client;
pub mod config;
pub mod consent;
pub mod error;
pub mod form;
pub mod legacy;
pub mod mapping;
pub mod prelude;
pub mod relay;
pub mod util;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{RelayError, Result};
