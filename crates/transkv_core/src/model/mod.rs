//! Domain model for per-locale attribute storage.
//!
//! # Responsibility
//! - Identify hosts polymorphically by `(host_type, host_id)`.
//! - Define the storage record holding one attribute value for one locale.
//! - Keep the per-host-instance translation cache.
//!
//! # Invariants
//! - A storage record is unique per `(host_id, host_type, key, locale)`.
//! - Caches are owned by one `Host` value and never shared.

pub mod embed;
pub mod host;
pub mod locale;
pub mod record;
