//! Name-to-backend registry used when declaring translated attributes.

use crate::backend::action_text::ACTION_TEXT;
use crate::backend::key_value::KEY_VALUE;
use crate::backend::spec::BackendSpec;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static BUILTIN: Lazy<BackendRegistry> = Lazy::new(BackendRegistry::with_builtins);

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRegistryError {
    InvalidBackendName(String),
    DuplicateBackendName(String),
}

impl Display for BackendRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBackendName(value) => write!(f, "backend name is invalid: {value}"),
            Self::DuplicateBackendName(value) => {
                write!(f, "backend name already registered: {value}")
            }
        }
    }
}

impl Error for BackendRegistryError {}

/// Symbolic backend names mapped to their specializations.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: BTreeMap<String, BackendSpec>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding `key_value` and `action_text`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for spec in [KEY_VALUE, ACTION_TEXT] {
            registry
                .backends
                .insert(spec.name.to_string(), spec);
        }
        registry
    }

    /// Registers one backend under `spec.name`.
    pub fn register(&mut self, spec: BackendSpec) -> Result<(), BackendRegistryError> {
        let name = spec.name.trim();
        if !is_valid_backend_name(name) {
            return Err(BackendRegistryError::InvalidBackendName(name.to_string()));
        }
        if self.backends.contains_key(name) {
            return Err(BackendRegistryError::DuplicateBackendName(name.to_string()));
        }
        self.backends.insert(name.to_string(), spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&BackendSpec> {
        self.backends.get(name.trim())
    }

    /// Returns sorted backend names.
    pub fn names(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// Process-wide registry with the built-in backends.
pub fn builtin() -> &'static BackendRegistry {
    &BUILTIN
}

fn is_valid_backend_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
