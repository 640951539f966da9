use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use super::FieldMappingConfig;
use crate::error::{RelayError, Result};
use crate::util::fs::{atomic_write, read_optional, remove_if_exists};

const MAPPINGS_DIR: &str = "mappings";

/// Storage of one [`FieldMappingConfig`] per local form.
///
/// `save` replaces the stored document wholesale.
pub trait MappingStore: Send + Sync {
    fn load(&self, form_id: &str) -> Result<Option<FieldMappingConfig>>;
    fn save(&self, form_id: &str, config: &FieldMappingConfig) -> Result<()>;
    fn delete(&self, form_id: &str) -> Result<()>;
}

/// One JSON document per local form under `<base_dir>/mappings/`.
#[derive(Debug, Clone)]
pub struct FileMappingStore {
    base_dir: PathBuf,
}

impl FileMappingStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn path_for(&self, form_id: &str) -> Result<PathBuf> {
        validate_form_id(form_id)?;
        Ok(self
            .base_dir
            .join(MAPPINGS_DIR)
            .join(format!("{form_id}.json")))
    }
}

impl MappingStore for FileMappingStore {
    fn load(&self, form_id: &str) -> Result<Option<FieldMappingConfig>> {
        let Some(raw) = read_optional(&self.path_for(form_id)?)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, form_id: &str, config: &FieldMappingConfig) -> Result<()> {
        let path = self.path_for(form_id)?;
        let serialized = serde_json::to_vec_pretty(config)?;
        atomic_write(&path, &serialized)?;
        tracing::debug!(form_id, path = %path.display(), "field mapping saved");
        Ok(())
    }

    fn delete(&self, form_id: &str) -> Result<()> {
        remove_if_exists(&self.path_for(form_id)?)?;
        Ok(())
    }
}

/// Process-local store, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryMappingStore {
    configs: Mutex<HashMap<String, FieldMappingConfig>>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MappingStore for MemoryMappingStore {
    fn load(&self, form_id: &str) -> Result<Option<FieldMappingConfig>> {
        let guard = self
            .configs
            .lock()
            .map_err(|_| RelayError::Storage("mapping store lock poisoned".to_string()))?;
        Ok(guard.get(form_id).cloned())
    }

    fn save(&self, form_id: &str, config: &FieldMappingConfig) -> Result<()> {
        let mut guard = self
            .configs
            .lock()
            .map_err(|_| RelayError::Storage("mapping store lock poisoned".to_string()))?;
        guard.insert(form_id.to_string(), config.clone());
        Ok(())
    }

    fn delete(&self, form_id: &str) -> Result<()> {
        let mut guard = self
            .configs
            .lock()
            .map_err(|_| RelayError::Storage("mapping store lock poisoned".to_string()))?;
        guard.remove(form_id);
        Ok(())
    }
}

/// Local form ids are machine names; anything that could escape the
/// mappings directory is rejected.
fn validate_form_id(form_id: &str) -> Result<()> {
    let valid = !form_id.is_empty()
        && form_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(RelayError::InvalidMapping(format!(
            "invalid local form id {form_id:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{LegalConsent, SubscriptionRule};
    use indexmap::IndexMap;
    use tempfile::TempDir;

    fn sample() -> FieldMappingConfig {
        let mut field_mapping = IndexMap::new();
        field_mapping.insert("email".to_string(), "contact_email".to_string());
        field_mapping.insert("address:zip".to_string(), "address:postal_code".to_string());
        FieldMappingConfig {
            remote_form_id: Some("f-1".to_string()),
            field_mapping,
            legal_consent: LegalConsent::always(),
            subscriptions: vec![SubscriptionRule::always("77")],
        }
    }

    #[test]
    fn file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileMappingStore::new(dir.path());
        store.save("contact_us", &sample()).unwrap();
        assert_eq!(store.load("contact_us").unwrap(), Some(sample()));
        assert!(store.load("other").unwrap().is_none());
    }

    #[test]
    fn save_replaces_previous_document() {
        let dir = TempDir::new().unwrap();
        let store = FileMappingStore::new(dir.path());
        store.save("contact_us", &sample()).unwrap();
        let replacement = FieldMappingConfig {
            remote_form_id: Some("f-2".to_string()),
            ..Default::default()
        };
        store.save("contact_us", &replacement).unwrap();
        let loaded = store.load("contact_us").unwrap().unwrap();
        assert!(loaded.field_mapping.is_empty());
        assert!(loaded.subscriptions.is_empty());
    }

    #[test]
    fn delete_forgets_mapping() {
        let store = MemoryMappingStore::new();
        store.save("contact_us", &sample()).unwrap();
        store.delete("contact_us").unwrap();
        assert!(store.load("contact_us").unwrap().is_none());
    }

    #[test]
    fn path_like_form_ids_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileMappingStore::new(dir.path());
        assert!(matches!(
            store.load("../secrets"),
            Err(RelayError::InvalidMapping(_))
        ));
        assert!(matches!(store.load(""), Err(RelayError::InvalidMapping(_))));
    }
}
