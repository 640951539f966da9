//! Relays local form submissions to HubSpot.

pub mod notify;
pub mod transform;

pub use notify::{DebugMail, DebugMailer, LogMailer, SmtpMailer, SmtpSettings};
pub use transform::build_submission;

use std::sync::Arc;

use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::OAuthSession;
use crate::error::RelayError;
use crate::form::LocalForm;
use crate::mapping::MappingStore;

/// Request metadata of the submission that triggered the relay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub client_ip: Option<String>,
    #[serde(default)]
    pub referer: Option<String>,
    /// Value of the `hubspotutk` tracking cookie.
    #[serde(default)]
    pub hutk: Option<String>,
}

/// A received local form submission.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct SubmissionEvent {
    #[builder(default = Uuid::new_v4())]
    #[serde(default = "Uuid::new_v4")]
    pub submission_id: Uuid,
    pub form: LocalForm,
    /// Local field path to value.
    #[builder(default)]
    #[serde(default)]
    pub values: Map<String, Value>,
    #[builder(default)]
    #[serde(default)]
    pub request: RequestContext,
    /// Canonical URL of the page hosting the form.
    #[builder(into)]
    #[serde(default)]
    pub page_url: Option<String>,
}

/// Relay progress of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RelayState {
    Received,
    Mapped,
    Posted,
    LoggedSuccess,
    LoggedFailure,
}

/// Final result of relaying one submission.
///
/// Never an error for the caller: the local submission is accepted whatever
/// happens on the HubSpot side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RelayOutcome {
    /// The form has no HubSpot mapping; nothing was sent.
    NotConnected,
    Delivered {
        status: u16,
        body: String,
    },
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        error: String,
    },
}

impl RelayOutcome {
    /// Terminal state reached.
    pub fn state(&self) -> RelayState {
        match self {
            Self::NotConnected => RelayState::Received,
            Self::Delivered { .. } => RelayState::LoggedSuccess,
            Self::Failed { .. } => RelayState::LoggedFailure,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    fn failed(error: &RelayError) -> Self {
        match error {
            RelayError::RemoteSubmitFailed { status, body } => Self::Failed {
                status: *status,
                error: body.clone(),
            },
            other => Self::Failed {
                status: None,
                error: other.to_string(),
            },
        }
    }
}

/// Portal and debug settings of the relay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelaySettings {
    pub portal_id: String,
    pub debug_on: bool,
    pub debug_email: Option<String>,
    /// Sender of debug mails.
    pub site_mail: Option<String>,
}

impl RelaySettings {
    pub fn new(portal_id: impl Into<String>) -> Self {
        Self {
            portal_id: portal_id.into(),
            ..Default::default()
        }
    }

    pub fn with_debug(mut self, to: impl Into<String>, from: Option<String>) -> Self {
        self.debug_on = true;
        self.debug_email = Some(to.into());
        self.site_mail = from;
        self
    }

    fn debug_recipient(&self) -> Option<&str> {
        if !self.debug_on {
            return None;
        }
        self.debug_email.as_deref().filter(|to| !to.trim().is_empty())
    }
}

/// Maps each submission and posts it to HubSpot.
pub struct SubmissionRelay {
    session: Arc<OAuthSession>,
    mappings: Arc<dyn MappingStore>,
    mailer: Arc<dyn DebugMailer>,
    settings: RelaySettings,
}

impl SubmissionRelay {
    pub fn new(
        session: Arc<OAuthSession>,
        mappings: Arc<dyn MappingStore>,
        mailer: Arc<dyn DebugMailer>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            session,
            mappings,
            mailer,
            settings,
        }
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Relay one submission. Every failure ends up in the returned outcome and
    /// the log; a resubmitted event is posted again.
    pub async fn relay(&self, event: &SubmissionEvent) -> RelayOutcome {
        let span = tracing::info_span!(
            "relay",
            submission_id = %event.submission_id,
            form_id = %event.form.id
        );
        self.relay_inner(event).instrument(span).await
    }

    async fn relay_inner(&self, event: &SubmissionEvent) -> RelayOutcome {
        let config = match self.mappings.load(&event.form.id) {
            Ok(Some(config)) => config,
            Ok(None) => {
                tracing::debug!("form is not connected to HubSpot");
                return RelayOutcome::NotConnected;
            }
            Err(err) => {
                tracing::error!(error = %err, "unable to load field mapping");
                return RelayOutcome::failed(&err);
            }
        };
        let Some(remote_form_id) = config.connected_form() else {
            tracing::debug!("form has no HubSpot form selected");
            return RelayOutcome::NotConnected;
        };

        let body = build_submission(event, &config);
        tracing::debug!(
            state = %RelayState::Mapped,
            remote_form_id,
            fields = body.fields.len(),
            consent = body.legal_consent_options.is_some(),
            "submission mapped"
        );

        let result = match self.session.authorized_client().await {
            Ok(client) => {
                tracing::debug!(state = %RelayState::Posted, remote_form_id, "posting submission");
                client
                    .submit_form(&self.settings.portal_id, remote_form_id, &body)
                    .await
            }
            Err(err) => Err(RelayError::from(err)),
        };

        let form_title = event.form.title.as_str();
        let (outcome, raw_body) = match result {
            Ok(response) => {
                tracing::info!(
                    status = response.status,
                    remote_form_id,
                    "Webform \"{form_title}\" results successfully submitted to HubSpot"
                );
                let raw = response.body.clone();
                (
                    RelayOutcome::Delivered {
                        status: response.status,
                        body: response.body,
                    },
                    raw,
                )
            }
            Err(err) => {
                let status = match &err {
                    RelayError::RemoteSubmitFailed { status, .. } => *status,
                    _ => None,
                };
                tracing::warn!(
                    status,
                    remote_form_id,
                    error = %err,
                    "HTTP error when submitting HubSpot data from Webform \"{form_title}\""
                );
                let outcome = RelayOutcome::failed(&err);
                let raw = match &outcome {
                    RelayOutcome::Failed { error, .. } => error.clone(),
                    _ => err.to_string(),
                };
                (outcome, raw)
            }
        };

        self.notify(form_title, &raw_body).await;
        outcome
    }

    async fn notify(&self, form_title: &str, raw_body: &str) {
        let Some(to) = self.settings.debug_recipient() else {
            return;
        };
        let mail =
            DebugMail::for_submission(to, self.settings.site_mail.clone(), form_title, raw_body);
        if let Err(err) = self.mailer.send(&mail).await {
            tracing::warn!(error = %err, "debug mail not sent");
        }
    }
}
