//! HubSpot wire types: form catalog, subscription definitions and the
//! secure form submission body.

use serde::{Deserialize, Serialize};

/// A form defined in the HubSpot portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteForm {
    pub guid: String,
    pub name: String,
    #[serde(rename = "formFieldGroups", default)]
    pub field_groups: Vec<FieldGroup>,
}

impl RemoteForm {
    /// All fields of the form, in group order.
    pub fn fields(&self) -> impl Iterator<Item = &RemoteField> {
        self.field_groups.iter().flat_map(|group| group.fields.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldGroup {
    #[serde(default)]
    pub fields: Vec<RemoteField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteField {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "fieldType", default)]
    pub field_type: String,
}

impl RemoteField {
    /// Label shown in the mapping editor, e.g. `Email (text)`.
    pub fn display_label(&self) -> String {
        let label = if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        };
        format!("{label} ({})", self.field_type)
    }
}

/// An email subscription type the portal offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionType {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionDefinitions {
    #[serde(rename = "subscriptionDefinitions", default)]
    pub definitions: Vec<SubscriptionType>,
}

/// One `{name, value}` pair of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub name: String,
    pub value: serde_json::Value,
}

/// Request context HubSpot attaches to the created contact activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hutk: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalConsentOptions {
    pub consent: ConsentBlock,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent_to_process: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub communications: Vec<Communication>,
}

impl ConsentBlock {
    pub fn is_empty(&self) -> bool {
        self.consent_to_process.is_none() && self.communications.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub value: bool,
    pub subscription_type_id: serde_json::Value,
    pub text: String,
}

/// Body of the secure form submission endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionBody {
    pub fields: Vec<FieldValue>,
    pub context: SubmissionContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_consent_options: Option<LegalConsentOptions>,
}

/// Successful (2xx) submission response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub status: u16,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remote_form_parses_catalog_entry() {
        let form: RemoteForm = serde_json::from_value(json!({
            "guid": "f-1",
            "name": "Newsletter",
            "portalId": 42,
            "formFieldGroups": [
                {"fields": [{"name": "email", "label": "Email", "fieldType": "text"}]},
                {"fields": [{"name": "firstname", "label": "First name", "fieldType": "text"}]}
            ]
        }))
        .unwrap();
        let names: Vec<_> = form.fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["email", "firstname"]);
        assert_eq!(form.field_groups[0].fields[0].display_label(), "Email (text)");
    }

    #[test]
    fn submission_body_omits_absent_parts() {
        let body = SubmissionBody {
            fields: vec![FieldValue {
                name: "email".into(),
                value: json!("a@b.com"),
            }],
            context: SubmissionContext {
                ip_address: Some("10.0.0.1".into()),
                ..Default::default()
            },
            legal_consent_options: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "fields": [{"name": "email", "value": "a@b.com"}],
                "context": {"ipAddress": "10.0.0.1"}
            })
        );
    }
}
