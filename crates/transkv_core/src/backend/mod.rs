//! Key-value translation backend.
//!
//! # Responsibility
//! - Resolve the one storage record per `(host, attribute, locale)`,
//!   loading it at most once per host instance.
//! - Create-or-update that record on write and persist pending writes when
//!   the host is saved.
//!
//! # Invariants
//! - `read` never creates a record; absence is `Ok(None)`.
//! - A cache miss costs exactly one lookup; hits cost none.
//! - Validation failures on save are returned unchanged and never retried.

use crate::model::host::{Host, SlotState};
use crate::model::locale::{Locale, LocaleError};
use crate::model::record::{RecordValidationError, StorageRecord};
use crate::repo::translation_repo::{TranslationChange, TranslationRepository};
use crate::repo::RepoError;
use log::{debug, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod action_text;
pub mod declaration;
pub mod key_value;
pub mod registry;
pub mod spec;

use declaration::TranslatedModel;
use spec::{AttributeDescriptor, ReadMode};

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug)]
pub enum BackendError {
    UnknownAttribute(String),
    UnknownAssociation(String),
    UnknownScope(String),
    HostTypeMismatch {
        expected: String,
        actual: String,
    },
    /// The record must be saved before embeds can be attached.
    RecordNotSaved {
        attribute: String,
        locale: Locale,
    },
    Locale(LocaleError),
    Repo(RepoError),
}

impl BackendError {
    /// Returns the record validation failure carried by this error, if any.
    pub fn validation(&self) -> Option<&RecordValidationError> {
        match self {
            Self::Repo(RepoError::Validation(err)) => Some(err),
            _ => None,
        }
    }
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAttribute(name) => write!(f, "attribute is not translated: {name}"),
            Self::UnknownAssociation(name) => write!(f, "association is not declared: {name}"),
            Self::UnknownScope(name) => write!(f, "scope is not declared: {name}"),
            Self::HostTypeMismatch { expected, actual } => {
                write!(f, "expected host of type `{expected}`, got `{actual}`")
            }
            Self::RecordNotSaved { attribute, locale } => write!(
                f,
                "record for `{attribute}` in locale `{locale}` has not been saved"
            ),
            Self::Locale(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Locale(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BackendError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<LocaleError> for BackendError {
    fn from(value: LocaleError) -> Self {
        Self::Locale(value)
    }
}

/// Lookup options for `read` and `write`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessOptions {
    /// Drop a clean cached lookup first. Unsaved writes are kept.
    pub fresh: bool,
}

impl AccessOptions {
    pub fn fresh() -> Self {
        Self { fresh: true }
    }
}

/// Result of a successful read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Translated {
    /// Scalar value column contents.
    Value(String),
    /// The storage record itself.
    Record(StorageRecord),
}

impl Translated {
    /// Scalar view: the value, or the record's value column.
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Self::Value(value) => Some(value),
            Self::Record(record) => record.value(),
        }
    }

    pub fn as_record(&self) -> Option<&StorageRecord> {
        match self {
            Self::Value(_) => None,
            Self::Record(record) => Some(record),
        }
    }

    pub fn into_record(self) -> Option<StorageRecord> {
        match self {
            Self::Value(_) => None,
            Self::Record(record) => Some(record),
        }
    }
}

/// Counters of one host save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Backend bound to one declared attribute.
#[derive(Debug, Clone, Copy)]
pub struct Backend<'m> {
    model: &'m TranslatedModel,
    attribute: &'m AttributeDescriptor,
}

impl<'m> Backend<'m> {
    pub(crate) fn new(model: &'m TranslatedModel, attribute: &'m AttributeDescriptor) -> Self {
        Self { model, attribute }
    }

    pub fn attribute_name(&self) -> &'m str {
        &self.attribute.attribute
    }

    pub fn descriptor(&self) -> &'m AttributeDescriptor {
        self.attribute
    }

    /// Reads the attribute for `locale`.
    ///
    /// Returns the value or the record depending on the backend's read mode;
    /// `None` when the locale has no record (or, in value mode, no value).
    pub fn read<R>(
        &self,
        repo: &R,
        host: &mut Host,
        locale: &Locale,
        options: &AccessOptions,
    ) -> BackendResult<Option<Translated>>
    where
        R: TranslationRepository + ?Sized,
    {
        let record = self.translation_for(repo, host, locale, options)?;
        Ok(match self.model.read_mode() {
            ReadMode::Value => record
                .and_then(|record| record.value.clone())
                .map(Translated::Value),
            ReadMode::Record => record.cloned().map(Translated::Record),
        })
    }

    /// Resolves the cached or freshly loaded record for `locale`.
    ///
    /// A record cleared by a pending write resolves to `None`.
    pub fn translation_for<'h, R>(
        &self,
        repo: &R,
        host: &'h mut Host,
        locale: &Locale,
        options: &AccessOptions,
    ) -> BackendResult<Option<&'h StorageRecord>>
    where
        R: TranslationRepository + ?Sized,
    {
        self.ensure_host_type(host)?;
        if options.fresh {
            host.invalidate_translation(self.attribute_name(), locale);
        }

        let config = self.model.config();
        let reference = host.reference().clone();
        let attribute = self.attribute_name();
        let slot = host
            .cache_mut()
            .slot_or_load(attribute, locale, || -> BackendResult<_> {
                let record = repo.find_translation(config, &reference, attribute, locale)?;
                debug!(
                    "event=translation_load module=backend status=ok table={} attribute={} locale={} found={}",
                    config.table(),
                    attribute,
                    locale,
                    record.is_some()
                );
                Ok(record)
            })?;

        if slot.state == SlotState::PendingDelete {
            return Ok(None);
        }
        Ok(slot.record.as_ref())
    }

    /// Writes `value` for `locale` into the cached record, building it if needed.
    ///
    /// `Some("")` stores an empty value; `None` clears the locale, deleting an
    /// existing record on save. Nothing is persisted until the host is saved.
    pub fn write<R>(
        &self,
        repo: &R,
        host: &mut Host,
        locale: &Locale,
        value: Option<&str>,
        options: &AccessOptions,
    ) -> BackendResult<()>
    where
        R: TranslationRepository + ?Sized,
    {
        self.translation_for(repo, host, locale, options)?;

        let reference = host.reference().clone();
        let attribute = self.attribute_name();
        let Some(slot) = host.cache_mut().get_mut(attribute, locale) else {
            return Err(BackendError::UnknownAttribute(attribute.to_string()));
        };

        match value {
            Some(value) => {
                let record = slot.record.get_or_insert_with(|| {
                    StorageRecord::new(reference, attribute, locale.as_str())
                });
                let unchanged = record.value.as_deref() == Some(value);
                if !(unchanged && slot.state == SlotState::Clean) {
                    record.value = Some(value.to_string());
                    slot.state = SlotState::Dirty;
                }
            }
            None => {
                let persisted = slot
                    .record
                    .as_ref()
                    .is_some_and(StorageRecord::is_persisted);
                if persisted {
                    if let Some(record) = slot.record.as_mut() {
                        record.value = None;
                    }
                    slot.state = SlotState::PendingDelete;
                } else {
                    slot.record = None;
                    slot.state = SlotState::Clean;
                }
            }
        }
        Ok(())
    }

    fn ensure_host_type(&self, host: &Host) -> BackendResult<()> {
        if host.host_type() != self.model.host_type() {
            return Err(BackendError::HostTypeMismatch {
                expected: self.model.host_type().to_string(),
                actual: host.host_type().to_string(),
            });
        }
        Ok(())
    }
}

/// Persists every pending write of `host` for the attributes of `model`.
///
/// All changes go through one repository transaction. On failure nothing
/// is written and the pending writes stay in the cache.
pub fn save_host<R>(model: &TranslatedModel, repo: &R, host: &mut Host) -> BackendResult<SaveSummary>
where
    R: TranslationRepository + ?Sized,
{
    if host.host_type() != model.host_type() {
        return Err(BackendError::HostTypeMismatch {
            expected: model.host_type().to_string(),
            actual: host.host_type().to_string(),
        });
    }

    let mut summary = SaveSummary::default();
    let mut changes = Vec::new();
    for ((attribute, _), slot) in host.cache().pending() {
        if model.attribute(attribute).is_none() {
            continue;
        }
        let change = match (&slot.record, slot.state) {
            (Some(record), SlotState::PendingDelete) => {
                summary.deleted += 1;
                TranslationChange::Delete(record)
            }
            (Some(record), _) if record.is_persisted() => {
                summary.updated += 1;
                TranslationChange::Update(record)
            }
            (Some(record), _) => {
                summary.inserted += 1;
                TranslationChange::Insert(record)
            }
            (None, _) => continue,
        };
        changes.push(change);
    }
    if changes.is_empty() {
        return Ok(summary);
    }

    let ids = match repo.save_changes(model.config(), &changes) {
        Ok(ids) => ids,
        Err(err) => {
            warn!(
                "event=translation_save module=backend status=error host_type={} table={} changes={} error={}",
                model.host_type(),
                model.config().table(),
                changes.len(),
                err
            );
            return Err(err.into());
        }
    };
    drop(changes);

    let mut ids = ids.into_iter();
    for ((attribute, _), slot) in host.cache_mut().pending_mut() {
        if model.attribute(attribute).is_none() || slot.record.is_none() {
            continue;
        }
        let id = ids.next().flatten();
        if slot.state == SlotState::PendingDelete {
            slot.record = None;
        } else if let Some(record) = slot.record.as_mut() {
            record.id = id.or(record.id);
        }
        slot.state = SlotState::Clean;
    }

    Ok(summary)
}
