use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Inputs this short never produce suggestions.
const MIN_QUERY_CHARS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct Suggestion {
    pub id: i64,
    pub todo: String,
}

/// Catalog of canned task titles offered while the user types.
#[derive(Debug, Clone, Default)]
pub struct SuggestionCatalog {
    entries: Vec<Suggestion>,
}

impl SuggestionCatalog {
    pub fn from_json(raw: &[u8]) -> Result<Self> {
        let entries: Vec<Suggestion> =
            serde_json::from_slice(raw).context("failed to decode suggestion catalog")?;
        Ok(Self { entries })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .with_context(|| format!("failed to read suggestions {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive substring matches in catalog order.
    pub fn matching(&self, input: &str) -> Vec<&str> {
        if input.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }
        let needle = input.to_lowercase();
        self.entries
            .iter()
            .filter(|s| s.todo.to_lowercase().contains(&needle))
            .map(|s| s.todo.as_str())
            .collect()
    }
}
