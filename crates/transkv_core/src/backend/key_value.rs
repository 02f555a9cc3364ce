//! Plain key-value backend: one scalar per `(host, attribute, locale)`.
//!
//! The `type` option picks the storage table: `text` (default) or `string`.

use crate::backend::spec::{AttributeDescriptor, BackendSpec, ReadMode};
use crate::config::{
    BackendDefaults, BackendOptions, ConfigResult, ConfigurationError, OptionName, ValueType,
};

pub const KEY_VALUE_BACKEND: &str = "key_value";

pub const KEY_VALUE: BackendSpec = BackendSpec {
    name: KEY_VALUE_BACKEND,
    reserved: &[],
    defaults: key_value_defaults,
    read_mode: ReadMode::Value,
    describe: describe_key_value,
};

fn key_value_defaults(options: &BackendOptions) -> ConfigResult<BackendDefaults> {
    let value_type = match options.value_type.as_deref() {
        None => ValueType::Text,
        Some(raw) => ValueType::parse(raw).ok_or_else(|| ConfigurationError::InvalidValue {
            option: OptionName::ValueType,
            value: raw.to_string(),
        })?,
    };

    Ok(BackendDefaults {
        association_name: format!("{}_translations", value_type.as_str()),
        class_name: format!("mobility_{}_translations", value_type.as_str()),
        key_column: "key".to_string(),
        value_column: "value".to_string(),
        belongs_to: "translatable".to_string(),
        value_type: Some(value_type),
    })
}

fn describe_key_value(attribute: &str) -> AttributeDescriptor {
    AttributeDescriptor {
        attribute: attribute.to_string(),
        association: format!("{attribute}_translation"),
        eager_load_scope: format!("with_{attribute}_translation"),
        eager_load_with_embeds_scope: None,
    }
}

#[cfg(test)]
mod tests {
    use super::KEY_VALUE;
    use crate::config::{BackendOptions, ConfigurationError, OptionName, ValueType};

    #[test]
    fn defaults_to_text_translations() {
        let config = KEY_VALUE
            .configure(&BackendOptions::new())
            .expect("defaults resolve");
        assert_eq!(config.association_name, "text_translations");
        assert_eq!(config.class_name, "mobility_text_translations");
        assert_eq!(config.key_column, "key");
        assert_eq!(config.value_column, "value");
        assert_eq!(config.belongs_to, "translatable");
        assert_eq!(config.value_type, Some(ValueType::Text));
    }

    #[test]
    fn string_type_switches_table_and_association() {
        let config = KEY_VALUE
            .configure(&BackendOptions::new().value_type("string"))
            .expect("string type resolves");
        assert_eq!(config.association_name, "string_translations");
        assert_eq!(config.class_name, "mobility_string_translations");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = KEY_VALUE
            .configure(&BackendOptions::new().value_type("json"))
            .expect_err("json is not a value type");
        assert_eq!(
            err,
            ConfigurationError::InvalidValue {
                option: OptionName::ValueType,
                value: "json".to_string(),
            }
        );
    }

    #[test]
    fn descriptor_has_no_embeds_scope() {
        let descriptor = KEY_VALUE.describe("title");
        assert_eq!(descriptor.association, "title_translation");
        assert_eq!(descriptor.eager_load_scope, "with_title_translation");
        assert_eq!(descriptor.eager_load_with_embeds_scope, None);
    }
}
