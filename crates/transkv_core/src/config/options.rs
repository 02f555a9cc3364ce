//! Caller-facing backend options.

use serde::{Deserialize, Serialize};

/// Name of one configurable option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionName {
    AssociationName,
    ClassName,
    KeyColumn,
    ValueColumn,
    BelongsTo,
    /// Scalar value kind of the storage record.
    ValueType,
}

impl OptionName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AssociationName => "association_name",
            Self::ClassName => "class_name",
            Self::KeyColumn => "key_column",
            Self::ValueColumn => "value_column",
            Self::BelongsTo => "belongs_to",
            Self::ValueType => "type",
        }
    }
}

/// Scalar value kinds supported by the plain key-value backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Text,
    String,
}

impl ValueType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "text" => Some(Self::Text),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::String => "string",
        }
    }
}

/// Option map for one attribute-set declaration.
///
/// Unset fields are filled from the backend's defaults; set fields always win.
/// Set values are used verbatim, so surrounding whitespace is rejected.
/// `class_name` names the storage table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendOptions {
    #[serde(default)]
    pub association_name: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub key_column: Option<String>,
    #[serde(default)]
    pub value_column: Option<String>,
    #[serde(default)]
    pub belongs_to: Option<String>,
    /// Kept as raw text so unsupported kinds reach the backend's own checks.
    #[serde(default, rename = "type", alias = "value_type")]
    pub value_type: Option<String>,
}

impl BackendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self, option: OptionName) -> bool {
        match option {
            OptionName::AssociationName => self.association_name.is_some(),
            OptionName::ClassName => self.class_name.is_some(),
            OptionName::KeyColumn => self.key_column.is_some(),
            OptionName::ValueColumn => self.value_column.is_some(),
            OptionName::BelongsTo => self.belongs_to.is_some(),
            OptionName::ValueType => self.value_type.is_some(),
        }
    }

    pub fn association_name(mut self, value: impl Into<String>) -> Self {
        self.association_name = Some(value.into());
        self
    }

    pub fn class_name(mut self, value: impl Into<String>) -> Self {
        self.class_name = Some(value.into());
        self
    }

    pub fn key_column(mut self, value: impl Into<String>) -> Self {
        self.key_column = Some(value.into());
        self
    }

    pub fn value_column(mut self, value: impl Into<String>) -> Self {
        self.value_column = Some(value.into());
        self
    }

    pub fn belongs_to(mut self, value: impl Into<String>) -> Self {
        self.belongs_to = Some(value.into());
        self
    }

    pub fn value_type(mut self, value: impl Into<String>) -> Self {
        self.value_type = Some(value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{BackendOptions, OptionName, ValueType};

    #[test]
    fn is_set_tracks_each_option() {
        let options = BackendOptions::new().key_column("k").value_type("text");
        assert!(options.is_set(OptionName::KeyColumn));
        assert!(options.is_set(OptionName::ValueType));
        assert!(!options.is_set(OptionName::ValueColumn));
        assert!(!options.is_set(OptionName::BelongsTo));
    }

    #[test]
    fn value_type_parses_known_kinds_only() {
        assert_eq!(ValueType::parse("text"), Some(ValueType::Text));
        assert_eq!(ValueType::parse(" string "), Some(ValueType::String));
        assert_eq!(ValueType::parse("json"), None);
    }
}
