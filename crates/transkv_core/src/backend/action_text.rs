//! Rich-text backend.
//!
//! Records live in `action_text_rich_texts` and `read` returns the record
//! itself, so callers can render it and reach its embeds:
//!
//! ```
//! use transkv_core::{translates, BackendOptions};
//!
//! let model = translates("Post", &["content"], "action_text", &BackendOptions::new())?;
//! let content = model.attribute("content").expect("declared");
//! assert_eq!(content.association, "rich_text_content");
//! assert_eq!(content.eager_load_scope, "with_rich_text_content");
//! # Ok::<(), transkv_core::ConfigurationError>(())
//! ```

use crate::backend::spec::{AttributeDescriptor, BackendSpec, ReadMode};
use crate::config::{BackendDefaults, BackendOptions, ConfigResult, OptionName};

pub const ACTION_TEXT_BACKEND: &str = "action_text";

/// The record type is fixed, so a scalar value kind cannot be requested.
const RESERVED: &[OptionName] = &[OptionName::ValueType];

pub const ACTION_TEXT: BackendSpec = BackendSpec {
    name: ACTION_TEXT_BACKEND,
    reserved: RESERVED,
    defaults: action_text_defaults,
    read_mode: ReadMode::Record,
    describe: describe_rich_text,
};

fn action_text_defaults(_options: &BackendOptions) -> ConfigResult<BackendDefaults> {
    Ok(BackendDefaults {
        association_name: "rich_text_translations".to_string(),
        class_name: "action_text_rich_texts".to_string(),
        key_column: "name".to_string(),
        value_column: "body".to_string(),
        belongs_to: "record".to_string(),
        value_type: None,
    })
}

fn describe_rich_text(attribute: &str) -> AttributeDescriptor {
    AttributeDescriptor {
        attribute: attribute.to_string(),
        association: format!("rich_text_{attribute}"),
        eager_load_scope: format!("with_rich_text_{attribute}"),
        eager_load_with_embeds_scope: Some(format!("with_rich_text_{attribute}_and_embeds")),
    }
}
