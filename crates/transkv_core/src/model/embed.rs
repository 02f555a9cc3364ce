//! Nested rich-content attachments hanging off a rich-text record.

use serde::{Deserialize, Serialize};

/// Stored binary metadata referenced by an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    /// `None` until the blob row is inserted.
    pub id: Option<i64>,
    /// Storage-service key; unique across blobs.
    pub key: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub byte_size: i64,
}

impl Blob {
    pub fn new(key: impl Into<String>, filename: impl Into<String>, byte_size: i64) -> Self {
        Self {
            id: None,
            key: key.into(),
            filename: filename.into(),
            content_type: None,
            byte_size,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// One attachment of a rich-text record, ordered by `position`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub position: i64,
    pub blob: Blob,
}
