//! Free-text `remoteGuid|localFormId` forms mapping used by the legacy
//! lookup path.

use indexmap::IndexMap;

use crate::error::{RelayError, Result};

/// Parsed forms mapping, in line order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormsMapping {
    entries: IndexMap<String, String>,
}

impl FormsMapping {
    /// Parse one `remoteGuid|localFormId` pair per line.
    ///
    /// Blank lines are skipped. A malformed line is a
    /// [`RelayError::Configuration`] naming the line.
    ///
    /// ```
    /// use hubspot_relay::legacy::FormsMapping;
    ///
    /// let mapping = FormsMapping::parse("abc-123|contact_us\n\ndef-456|newsletter\n")?;
    /// assert_eq!(mapping.local_for_remote("abc-123"), Some("contact_us"));
    /// assert_eq!(mapping.remote_for_local("newsletter"), Some("def-456"));
    /// # Ok::<(), hubspot_relay::RelayError>(())
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = IndexMap::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (remote, local) = line
                .split_once('|')
                .map(|(remote, local)| (remote.trim(), local.trim()))
                .filter(|(remote, local)| !remote.is_empty() && !local.is_empty())
                .ok_or_else(|| {
                    RelayError::Configuration(format!(
                        "forms mapping line {}: expected remoteGuid|localFormId, got {line:?}",
                        index + 1
                    ))
                })?;
            if entries.insert(remote.to_string(), local.to_string()).is_some() {
                tracing::warn!(
                    remote,
                    line = index + 1,
                    "duplicate forms mapping entry, last one wins"
                );
            }
        }
        Ok(Self { entries })
    }

    pub fn local_for_remote(&self, remote_guid: &str) -> Option<&str> {
        self.entries.get(remote_guid).map(String::as_str)
    }

    /// First remote form mapped to `local_form_id`.
    pub fn remote_for_local(&self, local_form_id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, local)| local.as_str() == local_form_id)
            .map(|(remote, _)| remote.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(remote, local)| (remote.as_str(), local.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
