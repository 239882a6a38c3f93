use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Raw spreadsheet column key -> human readable label.
///
/// Loaded once at startup and only read afterwards. Lookups never fail:
/// a column without an entry is labelled with its own key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    labels: HashMap<String, String>,
}

impl ColumnMapping {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read column mapping {}", path.display()))?;
        let mapping: ColumnMapping = serde_json::from_str(&raw)
            .with_context(|| format!("column mapping {} is not a flat JSON object of strings", path.display()))?;

        log::info!("Loaded {} column labels from {}", mapping.labels.len(), path.display());
        Ok(mapping)
    }

    pub fn label<'a>(&'a self, column: &'a str) -> &'a str {
        self.labels.get(column).map(String::as_str).unwrap_or(column)
    }
}

impl<K, V> FromIterator<(K, V)> for ColumnMapping
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
