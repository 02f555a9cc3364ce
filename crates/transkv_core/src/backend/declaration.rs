//! Attribute-set declaration on a host type.
//!
//! # Responsibility
//! - Resolve a backend by name and configure it once per declaration.
//! - Keep an explicit descriptor per attribute: association accessor and
//!   eager-loading scopes, looked up by name instead of synthesized at call
//!   time.
//!
//! # Invariants
//! - A `TranslatedModel` is read-only after `declare`.
//! - Attribute, accessor and scope names are unique within one model.

use crate::backend::registry::{self, BackendRegistry};
use crate::backend::spec::{AttributeDescriptor, BackendSpec, ReadMode};
use crate::backend::Backend;
use crate::config::builder::is_identifier;
use crate::config::{BackendConfig, BackendOptions, ConfigResult, ConfigurationError};
use log::debug;
use std::collections::BTreeMap;

/// Eager-loading scope resolved by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope<'m> {
    pub attribute: &'m AttributeDescriptor,
    pub include_embeds: bool,
}

/// Translated attributes declared on one host type.
#[derive(Debug, Clone)]
pub struct TranslatedModel {
    host_type: String,
    backend: BackendSpec,
    config: BackendConfig,
    attributes: BTreeMap<String, AttributeDescriptor>,
}

impl TranslatedModel {
    /// Declares `attributes` on `host_type` using backend `backend_name`.
    ///
    /// # Errors
    /// - `UnknownBackend` when the registry has no such name.
    /// - Any configuration error of the backend; nothing is partially built.
    /// - `EmptyAttributeSet`, `InvalidAttributeName`, `DuplicateAttribute`,
    ///   `InvalidHostType` for malformed declarations.
    pub fn declare(
        registry: &BackendRegistry,
        host_type: &str,
        attributes: &[&str],
        backend_name: &str,
        options: &BackendOptions,
    ) -> ConfigResult<Self> {
        let backend = *registry
            .get(backend_name)
            .ok_or_else(|| ConfigurationError::UnknownBackend(backend_name.trim().to_string()))?;
        let config = backend.configure(options)?;

        let host_type = host_type.trim();
        if !is_valid_host_type(host_type) {
            return Err(ConfigurationError::InvalidHostType(host_type.to_string()));
        }
        if attributes.is_empty() {
            return Err(ConfigurationError::EmptyAttributeSet);
        }

        let mut descriptors = BTreeMap::new();
        for raw in attributes {
            let name = raw.trim();
            if !is_identifier(name) {
                return Err(ConfigurationError::InvalidAttributeName(name.to_string()));
            }
            if descriptors.contains_key(name) {
                return Err(ConfigurationError::DuplicateAttribute(name.to_string()));
            }
            descriptors.insert(name.to_string(), backend.describe(name));
        }

        debug!(
            "event=attributes_declare module=backend status=ok host_type={} backend={} table={} count={}",
            host_type,
            backend.name,
            config.table(),
            descriptors.len()
        );

        Ok(Self {
            host_type: host_type.to_string(),
            backend,
            config,
            attributes: descriptors,
        })
    }

    pub fn host_type(&self) -> &str {
        &self.host_type
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name
    }

    pub fn read_mode(&self) -> ReadMode {
        self.backend.read_mode
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.get(name)
    }

    /// Declared attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.values()
    }

    /// Finds the attribute whose singular association accessor is `accessor`.
    pub fn by_association(&self, accessor: &str) -> Option<&AttributeDescriptor> {
        self.attributes
            .values()
            .find(|descriptor| descriptor.association == accessor)
    }

    /// Resolves an eager-loading scope name.
    pub fn scope(&self, name: &str) -> Option<Scope<'_>> {
        self.attributes.values().find_map(|descriptor| {
            if descriptor.eager_load_scope == name {
                Some(Scope {
                    attribute: descriptor,
                    include_embeds: false,
                })
            } else if descriptor.eager_load_with_embeds_scope.as_deref() == Some(name) {
                Some(Scope {
                    attribute: descriptor,
                    include_embeds: true,
                })
            } else {
                None
            }
        })
    }

    /// Returns the backend bound to one declared attribute.
    pub fn backend(&self, attribute: &str) -> Option<Backend<'_>> {
        self.attributes
            .get(attribute)
            .map(|descriptor| Backend::new(self, descriptor))
    }
}

/// Declares translated attributes using the process-wide backend registry.
pub fn translates(
    host_type: &str,
    attributes: &[&str],
    backend_name: &str,
    options: &BackendOptions,
) -> ConfigResult<TranslatedModel> {
    TranslatedModel::declare(
        registry::builtin(),
        host_type,
        attributes,
        backend_name,
        options,
    )
}

fn is_valid_host_type(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
