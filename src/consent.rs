//! Legal consent and subscription rule evaluation.

use serde_json::{Map, Value};

use crate::client::{Communication, ConsentBlock, LegalConsentOptions};
use crate::form::LocalForm;
use crate::mapping::{ConsentSource, FieldMappingConfig, Inclusion};

/// Text sent with rules included unconditionally.
pub const AFFIRMATIVE_TEXT: &str = "I agree";

/// Build `legalConsentOptions` for one submission.
///
/// Returns `None` when neither the consent rule nor any subscription rule
/// applies, so the block is omitted from the request.
pub fn legal_consent_options(
    config: &FieldMappingConfig,
    form: &LocalForm,
    values: &Map<String, Value>,
) -> Option<LegalConsentOptions> {
    let mut consent = ConsentBlock::default();

    match (config.legal_consent.include, &config.legal_consent.source) {
        (Inclusion::Never, _) => {}
        (Inclusion::Always, _) => {
            consent.consent_to_process = Some(true);
            consent.text = Some(AFFIRMATIVE_TEXT.to_string());
        }
        (Inclusion::Conditionally, Some(source)) => {
            if source_matches(source, form, values) {
                consent.consent_to_process = Some(true);
                consent.text = Some(source_text(source, form));
            }
        }
        (Inclusion::Conditionally, None) => {
            tracing::warn!(form_id = %form.id, "conditional consent without source element");
        }
    }

    for rule in &config.subscriptions {
        let text = match rule.source() {
            None => AFFIRMATIVE_TEXT.to_string(),
            Some(source) if source_matches(&source, form, values) => source_text(&source, form),
            Some(_) => continue,
        };
        consent.communications.push(Communication {
            value: true,
            subscription_type_id: subscription_type_id(&rule.subscription_id),
            text,
        });
    }

    if consent.is_empty() {
        None
    } else {
        Some(LegalConsentOptions { consent })
    }
}

/// Whether the submitted value of the source element satisfies the rule.
///
/// Checkbox-like elements match on a truthy value; every element also
/// matches when its value equals the configured option.
pub fn source_matches(
    source: &ConsentSource,
    form: &LocalForm,
    values: &Map<String, Value>,
) -> bool {
    let Some(value) = values.get(&source.element) else {
        return false;
    };
    let checkbox_like = form
        .element(&source.element)
        .is_some_and(|element| element.kind.is_checkbox_like());
    if checkbox_like && is_truthy(value) {
        return true;
    }
    source
        .option
        .as_deref()
        .is_some_and(|option| value_equals(value, option))
}

/// Truthiness of a submitted value: `true`, a non-zero number, or one of
/// `1`, `true`, `on`, `yes`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "on" | "yes"
        ),
        _ => false,
    }
}

fn value_equals(value: &Value, option: &str) -> bool {
    match value {
        Value::String(text) => text == option,
        Value::Number(number) => number.to_string() == option,
        Value::Bool(flag) => (if *flag { "1" } else { "0" }) == option,
        // multi-value elements (checkboxes) match when the option is selected
        Value::Array(items) => items.iter().any(|item| value_equals(item, option)),
        _ => false,
    }
}

fn source_text(source: &ConsentSource, form: &LocalForm) -> String {
    form.element(&source.element)
        .map(|element| element.label().to_string())
        .unwrap_or_else(|| source.element.clone())
}

fn subscription_type_id(id: &str) -> Value {
    id.trim()
        .parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(id.to_string()))
}
