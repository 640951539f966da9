//! Debug notification sent after each relayed submission.

use std::fmt;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::{RelayError, Result};

/// Link included in every debug mail.
pub const HUBSPOT_APP_URL: &str = "https://app.hubspot.com";

/// A rendered debug mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugMail {
    pub to: String,
    pub from: Option<String>,
    pub subject: String,
    pub body: String,
}

impl DebugMail {
    /// Mail carrying the raw HubSpot response (or error) body for a form.
    pub fn for_submission(
        to: impl Into<String>,
        from: Option<String>,
        form_title: &str,
        raw_body: &str,
    ) -> Self {
        Self {
            to: to.into(),
            from,
            subject: format!("HubSpot submission from \"{form_title}\""),
            body: format!(
                "Webform \"{form_title}\" was submitted to HubSpot.\n\n\
                 Response:\n{raw_body}\n\n\
                 Review the submission at {HUBSPOT_APP_URL}\n"
            ),
        }
    }
}

/// Delivers debug mails.
///
/// Delivery is best-effort: the relay logs a failed send and moves on.
#[async_trait]
pub trait DebugMailer: Send + Sync {
    async fn send(&self, mail: &DebugMail) -> Result<()>;
}

/// Mailer that writes the mail to the log instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl DebugMailer for LogMailer {
    async fn send(&self, mail: &DebugMail) -> Result<()> {
        tracing::info!(
            to = %mail.to,
            from = mail.from.as_deref().unwrap_or(""),
            subject = %mail.subject,
            body = %mail.body,
            "debug mail"
        );
        Ok(())
    }
}

/// SMTP relay used for debug mails.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    /// Defaults to the implicit-TLS submission port.
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender used when a mail has no `from` of its own.
    pub from: String,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| ".."))
            .field("from", &self.from)
            .finish()
    }
}

pub type SmtpTransport = AsyncSmtpTransport<Tokio1Executor>;

/// Sends debug mails through an SMTP relay.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let mut builder = SmtpTransport::relay(&settings.host)
            .map_err(|err| RelayError::Configuration(format!("smtp host: {err}")))?;
        if let Some(port) = settings.port {
            builder = builder.port(port);
        }
        if let (Some(user), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }
        let from = settings
            .from
            .parse::<Mailbox>()
            .map_err(|err| RelayError::Configuration(format!("smtp sender: {err}")))?;
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    /// Plain-text message for `mail`.
    pub fn message(&self, mail: &DebugMail) -> Result<Message> {
        let from = match &mail.from {
            Some(from) => mailbox(from)?,
            None => self.from.clone(),
        };
        Message::builder()
            .from(from)
            .to(mailbox(&mail.to)?)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|err| RelayError::Mail(err.to_string()))
    }
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|err| RelayError::Mail(format!("invalid address {address:?}: {err}")))
}

#[async_trait]
impl DebugMailer for SmtpMailer {
    async fn send(&self, mail: &DebugMail) -> Result<()> {
        let message = self.message(mail)?;
        self.transport.send(message).await.map_err(|err| {
            tracing::warn!(%err, to = %mail.to, "failed to send debug mail");
            RelayError::Mail(err.to_string())
        })?;
        tracing::info!(to = %mail.to, subject = %mail.subject, "debug mail sent");
        Ok(())
    }
}
