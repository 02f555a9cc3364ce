//! Backend specializations expressed as data.

use crate::config::builder::DefaultsFn;
use crate::config::{BackendConfig, BackendOptions, ConfigBuilder, ConfigResult, OptionName};
use serde::Serialize;

/// What `read` surfaces for a resolved record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadMode {
    /// The scalar contents of the value column.
    Value,
    /// The storage record itself, for values with behavior of their own.
    Record,
}

/// Per-attribute names established at declaration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeDescriptor {
    pub attribute: String,
    /// Singular association accessor scoped to `key = attribute` and the
    /// current locale.
    pub association: String,
    /// Scope eager-loading the association over a collection of hosts.
    pub eager_load_scope: String,
    /// Scope that also eager-loads embeds and their blobs.
    pub eager_load_with_embeds_scope: Option<String>,
}

/// Builds the descriptor for one declared attribute name.
pub type DescribeFn = fn(&str) -> AttributeDescriptor;

/// One registered backend: defaults, reserved options, read behavior and
/// descriptor naming.
#[derive(Debug, Clone, Copy)]
pub struct BackendSpec {
    pub name: &'static str,
    pub reserved: &'static [OptionName],
    pub defaults: DefaultsFn,
    pub read_mode: ReadMode,
    pub describe: DescribeFn,
}

impl BackendSpec {
    /// Resolves caller options against this backend's defaults.
    pub fn configure(&self, options: &BackendOptions) -> ConfigResult<BackendConfig> {
        ConfigBuilder::new(self.name, self.reserved, self.defaults).configure(options)
    }

    pub fn describe(&self, attribute: &str) -> AttributeDescriptor {
        (self.describe)(attribute)
    }
}
