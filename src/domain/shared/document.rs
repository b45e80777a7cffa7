use serde::{Deserialize, Serialize};
use std::path::Path;

const MAX_DOCUMENT_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentIdError {
    #[error("document id cannot be empty")]
    Empty,
    #[error("document id is longer than {MAX_DOCUMENT_ID_LEN} characters")]
    TooLong,
    #[error("document id '{0}' may only contain lowercase letters, digits, '-' and '_'")]
    InvalidCharacters(String),
}

/// Stable identity of a source document.
///
/// Every output path (checkpoint, plan, batch artifacts) is derived from it, so it is
/// restricted to a filesystem-safe alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Accept an id exactly as given, rejecting anything outside `[a-z0-9_-]`.
    pub fn parse(raw: &str) -> Result<Self, DocumentIdError> {
        if raw.is_empty() {
            return Err(DocumentIdError::Empty);
        }
        if raw.chars().count() > MAX_DOCUMENT_ID_LEN {
            return Err(DocumentIdError::TooLong);
        }
        let valid = raw
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !valid {
            return Err(DocumentIdError::InvalidCharacters(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Derive an id from free-form text: lowercase ASCII alphanumerics are kept, every other
    /// run of characters collapses into a single underscore.
    pub fn slugify(raw: &str) -> Result<Self, DocumentIdError> {
        let mut slug = String::with_capacity(raw.len());
        let mut pending_separator = false;

        for c in raw.chars() {
            if c.is_ascii_alphanumeric() || c == '-' {
                if pending_separator && !slug.is_empty() {
                    slug.push('_');
                }
                pending_separator = false;
                slug.push(c.to_ascii_lowercase());
            } else {
                pending_separator = true;
            }
        }

        let slug: String = slug.chars().take(MAX_DOCUMENT_ID_LEN).collect();
        Self::parse(slug.trim_end_matches('_'))
    }

    /// Derive an id from a source file's stem (`My Book.txt` -> `my_book`).
    pub fn from_path(path: &Path) -> Result<Self, DocumentIdError> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::slugify(&stem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentId {
    type Error = DocumentIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
