//! Process-lifetime cache of the portal's forms and subscription types.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::auth::OAuthSession;
use crate::client::{RemoteForm, SubscriptionType};
use crate::error::{RelayError, Result};

/// Lazily fetched HubSpot catalog.
///
/// Each slot is filled on first successful fetch and never invalidated. A
/// failed fetch leaves the slot empty so the next call goes to the network
/// again.
pub struct FormCatalog {
    session: Arc<OAuthSession>,
    forms: OnceCell<Vec<RemoteForm>>,
    subscriptions: OnceCell<Vec<SubscriptionType>>,
}

impl FormCatalog {
    pub fn new(session: Arc<OAuthSession>) -> Self {
        Self {
            session,
            forms: OnceCell::new(),
            subscriptions: OnceCell::new(),
        }
    }

    pub async fn list_remote_forms(&self) -> Result<&[RemoteForm]> {
        let forms = self
            .forms
            .get_or_try_init(|| async {
                self.ensure_authorized()?;
                let client = self.session.authorized_client().await?;
                let forms = client.list_forms().await.inspect_err(|err| {
                    tracing::warn!(error = %err, "unable to load HubSpot forms");
                })?;
                tracing::debug!(count = forms.len(), "HubSpot forms cached");
                Ok::<_, RelayError>(forms)
            })
            .await?;
        Ok(forms.as_slice())
    }

    pub async fn list_subscription_types(&self) -> Result<&[SubscriptionType]> {
        let subscriptions = self
            .subscriptions
            .get_or_try_init(|| async {
                self.ensure_authorized()?;
                let client = self.session.authorized_client().await?;
                let types = client.list_subscription_types().await.inspect_err(|err| {
                    tracing::warn!(error = %err, "unable to load HubSpot subscription types");
                })?;
                tracing::debug!(count = types.len(), "HubSpot subscription types cached");
                Ok::<_, RelayError>(types)
            })
            .await?;
        Ok(subscriptions.as_slice())
    }

    /// `(guid, name)` pairs for a form picker, sorted by name ignoring case.
    pub async fn form_options(&self) -> Result<Vec<(String, String)>> {
        let mut options: Vec<(String, String)> = self
            .list_remote_forms()
            .await?
            .iter()
            .map(|form| (form.guid.clone(), form.name.clone()))
            .collect();
        options.sort_by_key(|(_, name)| name.to_lowercase());
        Ok(options)
    }

    pub async fn find_form(&self, guid: &str) -> Result<Option<&RemoteForm>> {
        Ok(self
            .list_remote_forms()
            .await?
            .iter()
            .find(|form| form.guid == guid))
    }

    fn ensure_authorized(&self) -> Result<()> {
        if self.session.is_authorized() {
            Ok(())
        } else {
            Err(RelayError::NotConfigured)
        }
    }
}
