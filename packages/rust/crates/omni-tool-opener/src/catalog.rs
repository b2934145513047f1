//! Static tool name → location table.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CatalogError;

/// Built-in workspace tools.
pub const BUILTIN_TOOLS: &[(&str, &str)] = &[
    ("gmail", "https://mail.google.com/"),
    ("calendar", "https://calendar.google.com/"),
    ("notion", "https://www.notion.so/"),
    ("tasks", "https://tasks.google.com/tasks/"),
];

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub location: String,
}

/// Immutable mapping from tool name to location. Built once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCatalog {
    entries: BTreeMap<String, String>,
}

impl ResourceCatalog {
    /// Catalog with only the built-in tools.
    #[must_use]
    pub fn builtin() -> Self {
        let entries = BUILTIN_TOOLS
            .iter()
            .map(|(name, location)| ((*name).to_string(), (*location).to_string()))
            .collect();
        Self { entries }
    }

    /// Built-ins plus configured rows; a configured row replaces a built-in of the same name.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Self {
        for (name, location) in overrides {
            let name = name.trim();
            let location = location.trim();
            if name.is_empty() || location.is_empty() {
                tracing::warn!(
                    name = %name,
                    location = %location,
                    "ignoring catalog override with empty name or location"
                );
                continue;
            }
            self.entries.insert(name.to_string(), location.to_string());
        }
        self
    }

    /// Resolve a tool name.
    pub fn lookup(&self, name: &str) -> Result<&str, CatalogError> {
        self.entries
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| CatalogError::NotFound {
                name: name.to_string(),
            })
    }

    /// All rows in name order.
    #[must_use]
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.entries
            .iter()
            .map(|(name, location)| CatalogEntry {
                name: name.clone(),
                location: location.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResourceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
