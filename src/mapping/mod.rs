//! Per-form field mapping configuration.

pub mod editor;
pub mod store;

pub use editor::{consent_field_options, field_options, MappingEditor, MappingForm};
pub use store::{FileMappingStore, MappingStore, MemoryMappingStore};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Editor value meaning "this field is intentionally not mapped".
///
/// Filtered out before a configuration is built; never persisted.
pub const DO_NOT_MAP: &str = "--donotmap--";

/// Separator of composite local paths (`address:zip`) and the replacement
/// for `.` in mapping keys.
pub const PATH_SEPARATOR: char = ':';

/// Inclusion policy of the legal consent block.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Inclusion {
    #[default]
    Never,
    Always,
    Conditionally,
}

/// Inclusion policy of a subscription row.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubscriptionInclusion {
    #[default]
    Always,
    Conditionally,
}

/// Local element (and, for select-like elements, the option value) that
/// drives a conditional rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentSource {
    pub element: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
}

impl ConsentSource {
    pub fn new(element: impl Into<String>, option: Option<&str>) -> Self {
        Self {
            element: element.into(),
            option: option.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalConsent {
    #[serde(default)]
    pub include: Inclusion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ConsentSource>,
}

impl LegalConsent {
    pub fn always() -> Self {
        Self {
            include: Inclusion::Always,
            source: None,
        }
    }

    pub fn conditionally(source: ConsentSource) -> Self {
        Self {
            include: Inclusion::Conditionally,
            source: Some(source),
        }
    }
}

/// One subscription row: opt the contact into `subscription_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRule {
    pub subscription_id: String,
    #[serde(default)]
    pub include: SubscriptionInclusion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
}

impl SubscriptionRule {
    pub fn always(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            include: SubscriptionInclusion::Always,
            element: None,
            option: None,
        }
    }

    pub fn conditionally(
        subscription_id: impl Into<String>,
        element: impl Into<String>,
        option: Option<&str>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            include: SubscriptionInclusion::Conditionally,
            element: Some(element.into()),
            option: option.map(str::to_string),
        }
    }

    /// Source of a conditional rule, `None` for `always`.
    pub fn source(&self) -> Option<ConsentSource> {
        match self.include {
            SubscriptionInclusion::Always => None,
            SubscriptionInclusion::Conditionally => self.element.as_ref().map(|element| {
                ConsentSource {
                    element: element.clone(),
                    option: self.option.clone(),
                }
            }),
        }
    }
}

/// Stored mapping of one local form to a HubSpot form.
///
/// `field_mapping` goes from remote field name (with `.` escaped to `:`) to
/// local field path, in editor order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMappingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_form_id: Option<String>,
    #[serde(default)]
    pub field_mapping: IndexMap<String, String>,
    #[serde(default)]
    pub legal_consent: LegalConsent,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionRule>,
}

impl FieldMappingConfig {
    /// Remote form the submissions go to; `None` when the local form is not
    /// connected.
    pub fn connected_form(&self) -> Option<&str> {
        self.remote_form_id
            .as_deref()
            .filter(|id| !id.is_empty() && *id != DO_NOT_MAP)
    }
}

/// Escape a remote field name for use as a mapping key.
///
/// ```
/// assert_eq!(hubspot_relay::mapping::escape_key("address.zip"), "address:zip");
/// ```
pub fn escape_key(remote_field: &str) -> String {
    remote_field.replace('.', ":")
}
