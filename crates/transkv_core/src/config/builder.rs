//! Option resolution against specialization-supplied defaults.

use crate::config::options::{BackendOptions, OptionName, ValueType};
use crate::config::{ConfigResult, ConfigurationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("valid identifier regex"));

/// Default storage shape supplied by a backend specialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDefaults {
    pub association_name: String,
    pub class_name: String,
    pub key_column: String,
    pub value_column: String,
    pub belongs_to: String,
    pub value_type: Option<ValueType>,
}

/// Computes defaults; may inspect caller options (e.g. the value kind).
pub type DefaultsFn = fn(&BackendOptions) -> ConfigResult<BackendDefaults>;

/// Resolved storage shape shared by every host of one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendConfig {
    pub association_name: String,
    /// Storage table holding the records.
    pub class_name: String,
    pub key_column: String,
    pub value_column: String,
    /// Back-reference name; the composite key lives in
    /// `{belongs_to}_type` and `{belongs_to}_id`.
    pub belongs_to: String,
    pub value_type: Option<ValueType>,
}

impl BackendConfig {
    pub fn table(&self) -> &str {
        &self.class_name
    }

    pub fn host_type_column(&self) -> String {
        format!("{}_type", self.belongs_to)
    }

    pub fn host_id_column(&self) -> String {
        format!("{}_id", self.belongs_to)
    }
}

/// Base configuration builder.
///
/// A specialization provides data (reserved options and a defaults table);
/// the resolution flow is shared.
#[derive(Debug, Clone, Copy)]
pub struct ConfigBuilder<'a> {
    backend: &'a str,
    reserved: &'a [OptionName],
    defaults: DefaultsFn,
}

impl<'a> ConfigBuilder<'a> {
    pub fn new(backend: &'a str, reserved: &'a [OptionName], defaults: DefaultsFn) -> Self {
        Self {
            backend,
            reserved,
            defaults,
        }
    }

    /// Resolves `options` into a complete configuration.
    ///
    /// # Errors
    /// - `UnsupportedOption` when any reserved option is set; checked first.
    /// - `InvalidIdentifier` / `ConflictingColumns` for unusable names.
    /// - Whatever the defaults table rejects (e.g. an unknown value kind).
    pub fn configure(&self, options: &BackendOptions) -> ConfigResult<BackendConfig> {
        if let Some(option) = self
            .reserved
            .iter()
            .copied()
            .find(|option| options.is_set(*option))
        {
            return Err(ConfigurationError::UnsupportedOption {
                backend: self.backend.to_string(),
                option,
            });
        }

        let defaults = (self.defaults)(options)?;
        let config = BackendConfig {
            association_name: pick(&options.association_name, defaults.association_name),
            class_name: pick(&options.class_name, defaults.class_name),
            key_column: pick(&options.key_column, defaults.key_column),
            value_column: pick(&options.value_column, defaults.value_column),
            belongs_to: pick(&options.belongs_to, defaults.belongs_to),
            value_type: defaults.value_type,
        };
        validate_shape(&config)?;
        Ok(config)
    }
}

/// Explicit values are taken verbatim; surrounding whitespace fails validation.
fn pick(explicit: &Option<String>, default: String) -> String {
    explicit.clone().unwrap_or(default)
}

fn validate_shape(config: &BackendConfig) -> ConfigResult<()> {
    for (option, value) in [
        (OptionName::AssociationName, &config.association_name),
        (OptionName::ClassName, &config.class_name),
        (OptionName::KeyColumn, &config.key_column),
        (OptionName::ValueColumn, &config.value_column),
        (OptionName::BelongsTo, &config.belongs_to),
    ] {
        if !is_identifier(value) {
            return Err(ConfigurationError::InvalidIdentifier {
                option,
                value: value.clone(),
            });
        }
    }

    let mut columns = vec![
        "id".to_string(),
        config.key_column.clone(),
        config.value_column.clone(),
        "locale".to_string(),
        config.host_type_column(),
        config.host_id_column(),
    ];
    columns.sort();
    if let Some(pair) = columns.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(ConfigurationError::ConflictingColumns(pair[0].clone()));
    }
    Ok(())
}

/// Returns whether `value` is a lowercase SQL identifier.
pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(value)
}
