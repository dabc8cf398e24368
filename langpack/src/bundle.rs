//! Resource bundle types shared by the fetch and resolve layers.

use std::collections::BTreeMap;

use serde::Serialize;

/// A flat key → message template mapping for one language.
pub type ResourceMap = BTreeMap<String, String>;

/// The final output of language resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedResourceBundle {
    /// The language whose shipped bundle supplied the defaults.
    pub language: String,

    /// Defaults with every available override applied on top.
    pub resources: ResourceMap,
}

impl ResolvedResourceBundle {
    /// Look up a message template by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.resources.get(key).map(String::as_str)
    }
}

/// Parse a JSON object of string values into a resource map.
///
/// Both shipped bundles and override bundles use this format.
pub fn parse_resource_map(bytes: &[u8]) -> Result<ResourceMap, serde_json::Error> {
    serde_json::from_slice(bytes)
}
