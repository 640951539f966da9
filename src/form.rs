//! Local form model: the site form whose submissions are relayed.

use serde::{Deserialize, Serialize};

/// Element kinds that never carry a submittable value.
const LAYOUT_KINDS: &[&str] = &[
    "actions",
    "flexbox",
    "markup",
    "more",
    "section",
    "wizard_page",
    "message",
    "horizontal_rule",
    "terms_of_service",
    "element",
    "processed_text",
    "captcha",
    "computed_token",
    "computed_twig",
    "container",
    "details",
    "fieldset",
    "item",
    "label",
];

/// Kinds whose value can drive a conditional consent or subscription rule.
const CONSENT_KINDS: &[&str] = &["checkbox", "checkboxes", "terms_of_service", "radios", "select"];

/// Kinds evaluated by truthiness rather than by option value.
const CHECKBOX_LIKE_KINDS: &[&str] = &["checkbox", "terms_of_service"];

/// A site form with its flattened element list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalForm {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub elements: Vec<FormElement>,
}

impl LocalForm {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            elements: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: FormElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn element(&self, key: &str) -> Option<&FormElement> {
        self.elements.iter().find(|element| element.key == key)
    }
}

/// One element of a [`LocalForm`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormElement {
    pub key: String,
    #[serde(default)]
    pub title: String,
    pub kind: ElementKind,
    /// Sub-fields of a composite element (e.g. an address block).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FormElement>,
    /// `(value, label)` pairs of select-like elements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<(String, String)>,
}

impl FormElement {
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        kind: impl Into<ElementKind>,
    ) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            kind: kind.into(),
            children: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: FormElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_option(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.push((value.into(), label.into()));
        self
    }

    pub fn is_composite(&self) -> bool {
        !self.children.is_empty()
    }

    /// Title, or the key when the element has none.
    pub fn label(&self) -> &str {
        if self.title.is_empty() {
            &self.key
        } else {
            &self.title
        }
    }
}

/// Element type name as reported by the form builder (`textfield`,
/// `checkbox`, `webform_terms_of_service`, ...).
///
/// Comparisons ignore the builder's `webform_` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementKind(String);

impl ElementKind {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn normalized(&self) -> &str {
        self.0.strip_prefix("webform_").unwrap_or(&self.0)
    }

    pub fn is_checkbox(&self) -> bool {
        self.normalized() == "checkbox"
    }

    pub fn is_checkbox_like(&self) -> bool {
        CHECKBOX_LIKE_KINDS.contains(&self.normalized())
    }

    pub fn accepts_consent(&self) -> bool {
        CONSENT_KINDS.contains(&self.normalized())
    }

    /// Whether values of this kind can be mapped to a remote field.
    pub fn is_mappable(&self) -> bool {
        !LAYOUT_KINDS.contains(&self.normalized())
    }
}

impl From<&str> for ElementKind {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ElementKind {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
