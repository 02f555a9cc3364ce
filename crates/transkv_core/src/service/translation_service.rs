//! Translation use-case service.
//!
//! # Invariants
//! - The bound model's storage shape is verified once at construction.
//! - Service APIs never bypass backend caching or repository validation.
//! - Errors are logged as metadata and returned unchanged.

use crate::backend::declaration::TranslatedModel;
use crate::backend::{
    save_host, AccessOptions, Backend, BackendError, BackendResult, SaveSummary, Translated,
};
use crate::config::BackendConfig;
use crate::model::embed::{Blob, Embed};
use crate::model::host::{Host, HostId, HostRef};
use crate::model::locale::{self, Locale};
use crate::model::record::StorageRecord;
use crate::repo::host_repo::HostRepository;
use crate::repo::translation_repo::TranslationRepository;
use log::{error, info};
use std::collections::BTreeMap;
use std::time::Instant;

/// Service wrapper binding a translated model to its repositories.
pub struct TranslationService<R: TranslationRepository, H: HostRepository> {
    model: TranslatedModel,
    /// Storage shapes of other declarations on the same host type; `destroy`
    /// cascades into them as well.
    dependents: Vec<BackendConfig>,
    translations: R,
    hosts: H,
}

impl<R: TranslationRepository, H: HostRepository> TranslationService<R, H> {
    /// Creates a service after checking the model's storage table and columns.
    pub fn try_new(model: TranslatedModel, translations: R, hosts: H) -> BackendResult<Self> {
        translations.ensure_storage_shape(model.config())?;
        Ok(Self {
            model,
            dependents: Vec::new(),
            translations,
            hosts,
        })
    }

    /// Registers other declarations of the same host type so that `destroy`
    /// removes their records too.
    ///
    /// # Errors
    /// - `HostTypeMismatch` when a model belongs to another host type.
    /// - Repository errors when a model's storage table or columns are missing.
    pub fn with_dependents(mut self, models: &[&TranslatedModel]) -> BackendResult<Self> {
        for model in models {
            if model.host_type() != self.model.host_type() {
                return Err(BackendError::HostTypeMismatch {
                    expected: self.model.host_type().to_string(),
                    actual: model.host_type().to_string(),
                });
            }
            self.translations.ensure_storage_shape(model.config())?;
            let config = model.config();
            let known = std::iter::once(self.model.config())
                .chain(self.dependents.iter())
                .any(|existing| same_storage(existing, config));
            if !known {
                self.dependents.push(config.clone());
            }
        }
        Ok(self)
    }

    pub fn model(&self) -> &TranslatedModel {
        &self.model
    }

    /// Inserts a new host of the model's type.
    pub fn create_host(&self) -> BackendResult<Host> {
        Ok(self.hosts.create_host(self.model.host_type())?)
    }

    /// Loads a host as a new instance with an empty translation cache.
    pub fn find_host(&self, id: HostId) -> BackendResult<Option<Host>> {
        Ok(self.hosts.find_host(self.model.host_type(), id)?)
    }

    pub fn list_hosts(&self) -> BackendResult<Vec<Host>> {
        Ok(self.hosts.list_hosts(self.model.host_type())?)
    }

    /// Reads `attribute` of `host` in `locale`.
    pub fn read(
        &self,
        host: &mut Host,
        attribute: &str,
        locale: &Locale,
        options: &AccessOptions,
    ) -> BackendResult<Option<Translated>> {
        self.backend(attribute)?
            .read(&self.translations, host, locale, options)
    }

    /// Writes `attribute` of `host` in `locale`; persisted by `save`.
    pub fn write(
        &self,
        host: &mut Host,
        attribute: &str,
        locale: &Locale,
        value: Option<&str>,
        options: &AccessOptions,
    ) -> BackendResult<()> {
        self.backend(attribute)?
            .write(&self.translations, host, locale, value, options)
    }

    /// Reads in the calling thread's current locale.
    pub fn read_current(
        &self,
        host: &mut Host,
        attribute: &str,
    ) -> BackendResult<Option<Translated>> {
        let locale = locale::require_current()?;
        self.read(host, attribute, &locale, &AccessOptions::default())
    }

    /// Writes in the calling thread's current locale.
    pub fn write_current(
        &self,
        host: &mut Host,
        attribute: &str,
        value: Option<&str>,
    ) -> BackendResult<()> {
        let locale = locale::require_current()?;
        self.write(host, attribute, &locale, value, &AccessOptions::default())
    }

    /// Resolves a singular association accessor (e.g. `rich_text_content`)
    /// in the current locale, returning the record itself.
    pub fn association(
        &self,
        host: &mut Host,
        accessor: &str,
    ) -> BackendResult<Option<StorageRecord>> {
        let descriptor = self
            .model
            .by_association(accessor)
            .ok_or_else(|| BackendError::UnknownAssociation(accessor.to_string()))?;
        let locale = locale::require_current()?;
        let record = Backend::new(&self.model, descriptor).translation_for(
            &self.translations,
            host,
            &locale,
            &AccessOptions::default(),
        )?;
        Ok(record.cloned())
    }

    /// Persists pending writes of `host` in one transaction.
    pub fn save(&self, host: &mut Host) -> BackendResult<SaveSummary> {
        let started_at = Instant::now();
        let summary = save_host(&self.model, &self.translations, host)?;
        info!(
            "event=host_save module=service status=ok host_type={} inserted={} updated={} deleted={} duration_ms={}",
            self.model.host_type(),
            summary.inserted,
            summary.updated,
            summary.deleted,
            started_at.elapsed().as_millis()
        );
        Ok(summary)
    }

    /// Deletes the host and, in the same transaction, every storage record
    /// referencing it in any locale, including the tables of registered
    /// dependents. Returns the number of records removed.
    pub fn destroy(&self, host: Host) -> BackendResult<usize> {
        self.ensure_host_type(host.reference())?;
        let configs: Vec<&BackendConfig> = std::iter::once(self.model.config())
            .chain(self.dependents.iter())
            .collect();
        match self.hosts.delete_host(host.reference(), &configs) {
            Ok(removed) => {
                info!(
                    "event=host_destroy module=service status=ok host_type={} removed={}",
                    self.model.host_type(),
                    removed
                );
                Ok(removed)
            }
            Err(err) => {
                error!(
                    "event=host_destroy module=service status=error host_type={} error={}",
                    self.model.host_type(),
                    err
                );
                Err(err.into())
            }
        }
    }

    /// Applies an eager-loading scope to `hosts` for `locale`.
    ///
    /// Loads the scoped association of every host in one query (plus one for
    /// embeds when the scope includes them). Pending writes are kept.
    pub fn preload(
        &self,
        hosts: &mut [Host],
        scope_name: &str,
        locale: &Locale,
    ) -> BackendResult<()> {
        let scope = self
            .model
            .scope(scope_name)
            .ok_or_else(|| BackendError::UnknownScope(scope_name.to_string()))?;
        for host in hosts.iter() {
            self.ensure_host_type(host.reference())?;
        }
        let config = self.model.config();
        let attribute = scope.attribute.attribute.as_str();

        let references: Vec<HostRef> = hosts
            .iter()
            .map(|host| host.reference().clone())
            .collect();
        let records = self
            .translations
            .find_translations_for_hosts(config, &references, attribute, locale)?;

        let mut embeds = if scope.include_embeds {
            let ids: Vec<i64> = records.iter().filter_map(|record| record.id).collect();
            Some(self.translations.load_embeds(config, &ids)?)
        } else {
            None
        };

        let mut by_host: BTreeMap<HostRef, StorageRecord> = BTreeMap::new();
        for mut record in records {
            if let (Some(embeds), Some(id)) = (embeds.as_mut(), record.id) {
                record.embeds = Some(embeds.remove(&id).unwrap_or_default());
            }
            by_host.insert(record.host.clone(), record);
        }

        for host in hosts.iter_mut() {
            let record = by_host.get(host.reference()).cloned();
            host.cache_mut().store_loaded(attribute, locale, record);
        }
        Ok(())
    }

    /// Attaches `blob` to the saved record of `attribute` in `locale`.
    pub fn attach_embed(
        &self,
        host: &mut Host,
        attribute: &str,
        locale: &Locale,
        blob: &Blob,
    ) -> BackendResult<Embed> {
        let backend = self.backend(attribute)?;
        let record_id = backend
            .translation_for(&self.translations, host, locale, &AccessOptions::default())?
            .and_then(|record| record.id)
            .ok_or_else(|| BackendError::RecordNotSaved {
                attribute: attribute.to_string(),
                locale: locale.clone(),
            })?;

        let embed = self
            .translations
            .attach_embed(self.model.config(), record_id, blob)?;

        if let Some(record) = host
            .cache_mut()
            .get_mut(attribute, locale)
            .and_then(|slot| slot.record.as_mut())
        {
            if let Some(embeds) = record.embeds.as_mut() {
                embeds.push(embed.clone());
            }
        }
        Ok(embed)
    }

    /// Number of persisted records for `(host, attribute, locale)`.
    pub fn count_records(
        &self,
        host: &HostRef,
        attribute: &str,
        locale: &Locale,
    ) -> BackendResult<usize> {
        self.backend(attribute)?;
        Ok(self
            .translations
            .count_translations(self.model.config(), host, attribute, locale)?)
    }

    fn backend(&self, attribute: &str) -> BackendResult<Backend<'_>> {
        self.model
            .backend(attribute)
            .ok_or_else(|| BackendError::UnknownAttribute(attribute.to_string()))
    }

    fn ensure_host_type(&self, host: &HostRef) -> BackendResult<()> {
        if host.host_type != self.model.host_type() {
            return Err(BackendError::HostTypeMismatch {
                expected: self.model.host_type().to_string(),
                actual: host.host_type.clone(),
            });
        }
        Ok(())
    }
}

/// Two declarations share storage when they hit the same table through the
/// same back-reference columns.
fn same_storage(left: &BackendConfig, right: &BackendConfig) -> bool {
    left.table() == right.table() && left.belongs_to == right.belongs_to
}
