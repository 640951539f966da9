//! Admin-facing mapping editor: option lists and the guarded save.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{
    escape_key, FieldMappingConfig, Inclusion, LegalConsent, MappingStore, SubscriptionInclusion,
    SubscriptionRule, DO_NOT_MAP, PATH_SEPARATOR,
};
use crate::auth::OAuthSession;
use crate::error::{RelayError, Result};
use crate::form::LocalForm;

/// Values submitted by the mapping editor.
///
/// `fields` goes from remote field name to local field path, or to
/// [`DO_NOT_MAP`]. `remote_form_id` may itself be [`DO_NOT_MAP`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingForm {
    #[serde(default)]
    pub remote_form_id: String,
    #[serde(default)]
    pub fields: IndexMap<String, String>,
    #[serde(default)]
    pub legal_consent: LegalConsent,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionRule>,
}

impl MappingForm {
    /// Build the configuration to persist.
    ///
    /// Unmapped fields are dropped and keys are escaped. With no remote form
    /// selected only the consent and subscription rules are kept. The consent
    /// source is dropped unless the policy is `conditionally`.
    pub fn into_config(self) -> Result<FieldMappingConfig> {
        let remote_form_id = Some(self.remote_form_id.trim().to_string())
            .filter(|id| !id.is_empty() && id != DO_NOT_MAP);

        let field_mapping = if remote_form_id.is_some() {
            self.fields
                .into_iter()
                .filter(|(_, local)| local != DO_NOT_MAP && !local.is_empty())
                .map(|(remote, local)| (escape_key(&remote), local))
                .collect()
        } else {
            IndexMap::new()
        };

        let mut legal_consent = self.legal_consent;
        if legal_consent.include == Inclusion::Conditionally {
            let has_element = legal_consent
                .source
                .as_ref()
                .is_some_and(|source| !source.element.is_empty());
            if !has_element {
                return Err(RelayError::InvalidMapping(
                    "conditional legal consent needs a source element".to_string(),
                ));
            }
        } else {
            legal_consent.source = None;
        }

        let mut subscriptions = Vec::with_capacity(self.subscriptions.len());
        for mut rule in self.subscriptions {
            if rule.subscription_id.trim().is_empty() {
                return Err(RelayError::InvalidMapping(
                    "subscription row without a subscription".to_string(),
                ));
            }
            match rule.include {
                SubscriptionInclusion::Always => {
                    rule.element = None;
                    rule.option = None;
                }
                SubscriptionInclusion::Conditionally => {
                    if rule.element.as_deref().is_none_or(str::is_empty) {
                        return Err(RelayError::InvalidMapping(format!(
                            "conditional subscription {} needs a source element",
                            rule.subscription_id
                        )));
                    }
                }
            }
            subscriptions.push(rule);
        }

        Ok(FieldMappingConfig {
            remote_form_id,
            field_mapping,
            legal_consent,
            subscriptions,
        })
    }
}

/// Loads and saves mappings on behalf of an admin.
pub struct MappingEditor {
    session: Arc<OAuthSession>,
    store: Arc<dyn MappingStore>,
}

impl MappingEditor {
    pub fn new(session: Arc<OAuthSession>, store: Arc<dyn MappingStore>) -> Self {
        Self { session, store }
    }

    pub fn load(&self, form_id: &str) -> Result<Option<FieldMappingConfig>> {
        self.store.load(form_id)
    }

    /// Persist the editor values, replacing the stored configuration.
    ///
    /// Refused with [`RelayError::NotConfigured`] while the HubSpot account is
    /// not connected.
    pub fn save(&self, form_id: &str, form: MappingForm) -> Result<FieldMappingConfig> {
        if !self.session.is_authorized() {
            return Err(RelayError::NotConfigured);
        }
        let config = form.into_config()?;
        self.store.save(form_id, &config)?;
        match config.connected_form() {
            Some(remote_form_id) => tracing::info!(
                form_id,
                remote_form_id,
                fields = config.field_mapping.len(),
                "saved new field mapping"
            ),
            None => tracing::info!(form_id, "saved consent rules without a HubSpot form"),
        }
        Ok(config)
    }
}

/// Local fields offered for each remote field, led by the "Do Not Map"
/// choice. Composite elements contribute one `parent:child` entry per child.
pub fn field_options(form: &LocalForm) -> Vec<(String, String)> {
    let mut options = vec![(DO_NOT_MAP.to_string(), "Do Not Map".to_string())];
    for element in form.elements.iter().filter(|e| e.kind.is_mappable()) {
        if element.is_composite() {
            for child in &element.children {
                let key = format!("{}{PATH_SEPARATOR}{}", element.key, child.key);
                let label = if element.title.is_empty() && child.title.is_empty() {
                    key.clone()
                } else {
                    format!("{}: {}", element.title, child.title)
                };
                options.push((key, format!("{label} ({})", child.kind)));
            }
        } else {
            options.push((
                element.key.clone(),
                format!("{} ({})", element.label(), element.kind),
            ));
        }
    }
    options
}

/// Elements that can drive a conditional consent or subscription rule.
pub fn consent_field_options(form: &LocalForm) -> Vec<(String, String)> {
    form.elements
        .iter()
        .filter(|e| !e.is_composite() && e.kind.accepts_consent())
        .map(|e| (e.key.clone(), format!("{} ({})", e.label(), e.kind)))
        .collect()
}
