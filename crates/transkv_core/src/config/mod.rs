//! Configuration layer: resolves caller options into a storage shape.
//!
//! # Responsibility
//! - Hold the caller-facing option map (`BackendOptions`).
//! - Apply specialization defaults to unset options only.
//! - Reject reserved options before any defaulting happens.
//!
//! # Invariants
//! - A `BackendConfig` is immutable once built and performs no I/O.
//! - Every identifier in a `BackendConfig` is safe to splice into SQL.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod builder;
pub mod options;

pub use builder::{BackendConfig, BackendDefaults, ConfigBuilder};
pub use options::{BackendOptions, OptionName, ValueType};

pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Setup-time failure; no partial configuration is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The option is reserved by this backend's storage shape.
    UnsupportedOption {
        backend: String,
        option: OptionName,
    },
    InvalidIdentifier {
        option: OptionName,
        value: String,
    },
    InvalidValue {
        option: OptionName,
        value: String,
    },
    /// Two shape columns resolved to the same name.
    ConflictingColumns(String),
    UnknownBackend(String),
    InvalidHostType(String),
    EmptyAttributeSet,
    InvalidAttributeName(String),
    DuplicateAttribute(String),
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedOption { backend, option } => write!(
                f,
                "the `{}` option is unsupported with the `{backend}` backend",
                option.as_str()
            ),
            Self::InvalidIdentifier { option, value } => write!(
                f,
                "option `{}` is not a valid identifier: `{value}`",
                option.as_str()
            ),
            Self::InvalidValue { option, value } => {
                write!(f, "option `{}` has invalid value `{value}`", option.as_str())
            }
            Self::ConflictingColumns(column) => {
                write!(f, "storage column `{column}` is configured more than once")
            }
            Self::UnknownBackend(name) => write!(f, "backend not registered: {name}"),
            Self::InvalidHostType(value) => write!(f, "host type is invalid: `{value}`"),
            Self::EmptyAttributeSet => write!(f, "at least one attribute must be declared"),
            Self::InvalidAttributeName(value) => {
                write!(f, "attribute name is invalid: `{value}`")
            }
            Self::DuplicateAttribute(value) => {
                write!(f, "attribute declared more than once: {value}")
            }
        }
    }
}

impl Error for ConfigurationError {}
