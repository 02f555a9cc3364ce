//! Storage record: one attribute value of one host for one locale.
//!
//! # Invariants
//! - `key` and `locale` are non-empty.
//! - `host` is a complete back-reference.
//! - `(host.host_id, host.host_type, key, locale)` is unique; enforced by the
//!   repository, compared case-sensitively.

use crate::model::embed::Embed;
use crate::model::host::HostRef;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Persisted row for `(host, key, locale)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageRecord {
    /// Row id; `None` while the record is only built in memory.
    pub id: Option<i64>,
    /// Attribute name this record stores.
    pub key: String,
    /// Contents of the configured value column. `None` is SQL NULL.
    pub value: Option<String>,
    pub locale: String,
    pub host: HostRef,
    /// Embedded attachments; `None` when they were not loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Embed>>,
}

impl StorageRecord {
    /// Builds an unsaved record with no value.
    pub fn new(host: HostRef, key: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            id: None,
            key: key.into(),
            value: None,
            locale: locale.into(),
            host,
            embeds: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Rich-text rendering of the stored body.
    ///
    /// Returns an empty string when there is no body.
    pub fn to_html(&self) -> String {
        match self.value.as_deref() {
            Some(body) => format!("<div class=\"trix-content\">\n  {body}\n</div>\n"),
            None => String::new(),
        }
    }

    /// Eagerly loaded embeds, or an empty slice when none were loaded.
    pub fn embeds(&self) -> &[Embed] {
        self.embeds.as_deref().unwrap_or(&[])
    }

    pub fn embeds_loaded(&self) -> bool {
        self.embeds.is_some()
    }

    /// Checks record-local invariants. Uniqueness needs storage and is
    /// checked by the repository.
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.key.trim().is_empty() {
            return Err(RecordValidationError::MissingKey);
        }
        if !self.host.is_complete() {
            return Err(RecordValidationError::MissingBackReference);
        }
        if self.locale.trim().is_empty() {
            return Err(RecordValidationError::MissingLocale);
        }
        Ok(())
    }
}

/// Persistence-layer validation failure of a storage record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    MissingKey,
    MissingLocale,
    MissingBackReference,
    /// Another record already holds `(host, key, locale)`.
    Taken {
        host: HostRef,
        key: String,
        locale: String,
    },
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKey => write!(f, "key can't be blank"),
            Self::MissingLocale => write!(f, "locale can't be blank"),
            Self::MissingBackReference => write!(f, "back-reference to host must exist"),
            Self::Taken { host, key, locale } => write!(
                f,
                "key `{key}` has already been taken for {host} in locale `{locale}`"
            ),
        }
    }
}

impl Error for RecordValidationError {}

#[cfg(test)]
mod tests {
    use super::{RecordValidationError, StorageRecord};
    use crate::model::host::{HostId, HostRef};
    use uuid::Uuid;

    fn post() -> HostRef {
        HostRef::new("Post", HostId::new_v4())
    }

    #[test]
    fn validate_accepts_complete_record() {
        let mut record = StorageRecord::new(post(), "content", "en");
        record.value = Some(String::new());
        assert_eq!(record.validate(), Ok(()));
    }

    #[test]
    fn validate_reports_missing_parts() {
        let blank_key = StorageRecord::new(post(), " ", "en");
        assert_eq!(blank_key.validate(), Err(RecordValidationError::MissingKey));

        let blank_locale = StorageRecord::new(post(), "content", "");
        assert_eq!(
            blank_locale.validate(),
            Err(RecordValidationError::MissingLocale)
        );

        let orphan = StorageRecord::new(HostRef::new("Post", HostId(Uuid::nil())), "content", "en");
        assert_eq!(
            orphan.validate(),
            Err(RecordValidationError::MissingBackReference)
        );
    }

    #[test]
    fn to_html_wraps_body_in_trix_container() {
        let mut record = StorageRecord::new(post(), "content", "en");
        assert_eq!(record.to_html(), "");

        record.value = Some("<h1>My text is rich</h1>".to_string());
        assert_eq!(
            record.to_html(),
            "<div class=\"trix-content\">\n  <h1>My text is rich</h1>\n</div>\n"
        );
    }

    #[test]
    fn embeds_default_to_empty_until_loaded() {
        let record = StorageRecord::new(post(), "content", "en");
        assert!(record.embeds().is_empty());
        assert!(!record.embeds_loaded());
    }
}
