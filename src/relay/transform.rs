//! Submission values to HubSpot fields.

use serde_json::{Map, Value};

use crate::client::{FieldValue, SubmissionBody, SubmissionContext};
use crate::consent::legal_consent_options;
use crate::form::LocalForm;
use crate::mapping::{FieldMappingConfig, DO_NOT_MAP, PATH_SEPARATOR};

use super::SubmissionEvent;

const LIST_SEPARATOR: &str = ";";

/// Build the complete submission request for a connected form.
pub fn build_submission(event: &SubmissionEvent, config: &FieldMappingConfig) -> SubmissionBody {
    let mut values = event.values.clone();
    normalize_checkboxes(&event.form, &mut values);

    SubmissionBody {
        fields: map_fields(config, &values),
        context: submission_context(event),
        legal_consent_options: legal_consent_options(config, &event.form, &values),
    }
}

/// Rewrite checkbox values to `"true"` / `"false"`; a missing checkbox is
/// unchecked.
pub fn normalize_checkboxes(form: &LocalForm, values: &mut Map<String, Value>) {
    for element in form.elements.iter().filter(|e| e.kind.is_checkbox()) {
        let checked = values
            .get(&element.key)
            .is_some_and(crate::consent::is_truthy);
        values.insert(
            element.key.clone(),
            Value::String(if checked { "true" } else { "false" }.to_string()),
        );
    }
}

/// Resolve each mapping entry against the submission, in mapping order.
///
/// Entries whose local value is missing or empty are dropped.
pub fn map_fields(config: &FieldMappingConfig, values: &Map<String, Value>) -> Vec<FieldValue> {
    config
        .field_mapping
        .iter()
        .filter(|(_, local_path)| local_path.as_str() != DO_NOT_MAP)
        .filter_map(|(remote, local_path)| {
            let value = resolve_path(values, local_path)?;
            let value = normalize_value(value)?;
            Some(FieldValue {
                name: remote.clone(),
                value,
            })
        })
        .collect()
}

/// Look up `path`, descending into nested objects at each `:`.
pub fn resolve_path<'a>(values: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split(PATH_SEPARATOR);
    let mut current = values.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Empty values become `None`; lists (and composite objects) are joined
/// with `;`.
pub fn normalize_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::Array(items) => join_list(items.iter()),
        Value::Object(map) => join_list(map.values()),
        other => Some(other.clone()),
    }
}

fn join_list<'a>(items: impl Iterator<Item = &'a Value>) -> Option<Value> {
    let parts: Vec<String> = items
        .filter_map(|item| match item {
            Value::String(text) if !text.is_empty() => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(Value::String(parts.join(LIST_SEPARATOR)))
    }
}

/// The event's canonical page URL wins over the `Referer` header.
fn submission_context(event: &SubmissionEvent) -> SubmissionContext {
    let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());
    SubmissionContext {
        ip_address: non_empty(&event.request.client_ip),
        page_uri: non_empty(&event.page_url).or_else(|| non_empty(&event.request.referer)),
        page_name: Some(event.form.title.clone()).filter(|title| !title.is_empty()),
        hutk: non_empty(&event.request.hutk),
    }
}
