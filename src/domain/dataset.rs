//! Tabular training input as loaded from disk.

use serde::{Deserialize, Serialize};

/// Header row plus string cells, exactly as read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawDataset {
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Index of the first header matching any alias (trimmed, case-insensitive).
    #[must_use]
    pub fn column_index(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| {
            self.headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(alias))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
