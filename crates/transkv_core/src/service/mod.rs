//! Use-case services over declared translated attributes.
//!
//! # Responsibility
//! - Bind one `TranslatedModel` to its repositories.
//! - Offer host lifecycle (create, find, save, destroy) next to attribute
//!   reads and writes so callers never touch SQL or cache internals.

pub mod translation_service;
