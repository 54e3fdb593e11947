//! Recipient list ingestion.
//!
//! Identifiers are kept as raw strings in input order, duplicates included.
//! They are only coerced to numeric user ids when a message is sent.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// One message destination as typed or loaded by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(String);

impl RecipientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric user id the messaging API expects.
    pub fn user_id(&self) -> Option<i64> {
        self.0.trim().parse().ok()
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecipientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecipientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Comma separated ids, as entered in a single text field.
pub fn parse_inline(text: &str) -> Vec<RecipientId> {
    text.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(RecipientId::from)
        .collect()
}

/// One id per line.
pub fn parse_text(content: &str) -> Vec<RecipientId> {
    content
        .lines()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(RecipientId::from)
        .collect()
}

/// First column of every row. There is no header row.
pub fn parse_csv(content: &str) -> AppResult<Vec<RecipientId>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(first) = record.get(0).map(str::trim) {
            if !first.is_empty() {
                ids.push(RecipientId::from(first));
            }
        }
    }

    Ok(ids)
}

pub fn load_from_file(path: &Path) -> AppResult<Vec<RecipientId>> {
    let display = path.to_string_lossy();
    if !path.exists() {
        return Err(AppError::file_not_found(&display));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let ids = match extension.as_deref() {
        Some("txt") => parse_text(&std::fs::read_to_string(path)?),
        Some("csv") => parse_csv(&std::fs::read_to_string(path)?)?,
        _ => return Err(AppError::unsupported_list_format(&display)),
    };

    log::info!("Loaded {} recipient ids from {}", ids.len(), display);
    Ok(ids)
}

/// Renders ids back into the inline form.
pub fn join_inline(ids: &[RecipientId]) -> String {
    ids.iter()
        .map(RecipientId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<RecipientId> {
        values.iter().copied().map(RecipientId::from).collect()
    }

    #[test]
    fn inline_list_is_trimmed_and_keeps_order() {
        assert_eq!(parse_inline(" 3, 1 ,,2, 1 "), ids(&["3", "1", "2", "1"]));
        assert!(parse_inline(" , ,").is_empty());
    }

    #[test]
    fn text_file_skips_blank_lines() {
        let content = "100\n\n  200  \r\n300\n";
        assert_eq!(parse_text(content), ids(&["100", "200", "300"]));
    }

    #[test]
    fn csv_takes_first_column() {
        let content = "100,Alice\n200,Bob,extra\n,missing\n300\n";
        assert_eq!(parse_csv(content).unwrap(), ids(&["100", "200", "300"]));
    }

    #[test]
    fn csv_header_is_treated_as_data() {
        let content = "user_id,name\n42,Zed\n";
        assert_eq!(parse_csv(content).unwrap(), ids(&["user_id", "42"]));
    }

    #[test]
    fn user_id_coercion() {
        assert_eq!(RecipientId::from("12345").user_id(), Some(12345));
        assert_eq!(RecipientId::from(" 7 ").user_id(), Some(7));
        assert_eq!(RecipientId::from("@someone").user_id(), None);
    }

    #[test]
    fn load_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let txt = dir.path().join("ids.TXT");
        std::fs::write(&txt, "1\n2\n").unwrap();
        assert_eq!(load_from_file(&txt).unwrap(), ids(&["1", "2"]));

        let csv_path = dir.path().join("ids.csv");
        std::fs::write(&csv_path, "5,a\n6,b\n").unwrap();
        assert_eq!(load_from_file(&csv_path).unwrap(), ids(&["5", "6"]));

        let other = dir.path().join("ids.json");
        std::fs::write(&other, "[1]").unwrap();
        assert!(matches!(
            load_from_file(&other),
            Err(AppError::UnsupportedListFormat { .. })
        ));

        assert!(matches!(
            load_from_file(&dir.path().join("nope.txt")),
            Err(AppError::FileNotFound { .. })
        ));
    }

    #[test]
    fn join_inline_matches_parse_inline() {
        let list = ids(&["1", "2", "3"]);
        assert_eq!(join_inline(&list), "1, 2, 3");
        assert_eq!(parse_inline(&join_inline(&list)), list);
    }
}
