use std::fmt;

use serde::{Deserialize, Serialize};

/// Text in the compact grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompressedDocument(String);

impl CompressedDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CompressedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CompressedDocument {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for CompressedDocument {
    fn from(text: String) -> Self {
        Self(text)
    }
}
