//! Core of transkv: per-locale key-value translations for host entities.
//! Configuration, backend caching and persistence live here; binaries stay thin.

pub mod backend;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use backend::declaration::{translates, Scope, TranslatedModel};
pub use backend::registry::{BackendRegistry, BackendRegistryError};
pub use backend::spec::{AttributeDescriptor, BackendSpec, ReadMode};
pub use backend::{
    save_host, AccessOptions, Backend, BackendError, BackendResult, SaveSummary, Translated,
};
pub use config::{
    BackendConfig, BackendOptions, ConfigResult, ConfigurationError, OptionName, ValueType,
};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::embed::{Blob, Embed};
pub use model::host::{Host, HostId, HostRef};
pub use model::locale::{Locale, LocaleError};
pub use model::record::{RecordValidationError, StorageRecord};
pub use repo::host_repo::{HostRepository, SqliteHostRepository};
pub use repo::translation_repo::{
    SqliteTranslationRepository, TranslationChange, TranslationRepository,
};
pub use repo::{RepoError, RepoResult};
pub use service::translation_service::TranslationService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Names of the backends registered at startup.
pub fn builtin_backends() -> Vec<&'static str> {
    backend::registry::builtin().names()
}
