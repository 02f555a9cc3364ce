//! Host identity and the per-instance translation cache.
//!
//! # Responsibility
//! - Identify a host polymorphically by `(host_type, host_id)`.
//! - Cache loaded storage records per `(attribute, locale)` for the lifetime
//!   of one `Host` value, including cached absence.
//! - Track unsaved writes until the host is saved.
//!
//! # Invariants
//! - Two `Host` values for the same row keep independent caches.
//! - Invalidation only drops clean slots; pending writes survive until save.

use crate::model::locale::Locale;
use crate::model::record::StorageRecord;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a host row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(pub Uuid);

impl HostId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Display for HostId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Polymorphic back-reference target: host type tag plus id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HostRef {
    pub host_type: String,
    pub host_id: HostId,
}

impl HostRef {
    pub fn new(host_type: impl Into<String>, host_id: HostId) -> Self {
        Self {
            host_type: host_type.into(),
            host_id,
        }
    }

    /// Both parts of the composite key are present.
    pub fn is_complete(&self) -> bool {
        !self.host_type.trim().is_empty() && !self.host_id.is_nil()
    }
}

impl Display for HostRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.host_type, self.host_id)
    }
}

/// Cache key: one slot per translated attribute and locale.
pub(crate) type CacheKey = (String, Locale);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotState {
    Clean,
    Dirty,
    /// Existing record is cleared and will be deleted on save.
    PendingDelete,
}

#[derive(Debug, Clone)]
pub(crate) struct CacheSlot {
    pub(crate) record: Option<StorageRecord>,
    pub(crate) state: SlotState,
}

/// Loaded storage records of one host instance.
#[derive(Debug, Clone, Default)]
pub struct TranslationCache {
    slots: BTreeMap<CacheKey, CacheSlot>,
}

impl TranslationCache {
    pub(crate) fn get(&self, attribute: &str, locale: &Locale) -> Option<&CacheSlot> {
        self.slots.get(&(attribute.to_string(), locale.clone()))
    }

    pub(crate) fn get_mut(&mut self, attribute: &str, locale: &Locale) -> Option<&mut CacheSlot> {
        self.slots.get_mut(&(attribute.to_string(), locale.clone()))
    }

    /// Returns the cached slot, running `load` once on a miss.
    pub(crate) fn slot_or_load<E>(
        &mut self,
        attribute: &str,
        locale: &Locale,
        load: impl FnOnce() -> Result<Option<StorageRecord>, E>,
    ) -> Result<&mut CacheSlot, E> {
        match self.slots.entry((attribute.to_string(), locale.clone())) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let record = load()?;
                Ok(entry.insert(CacheSlot {
                    record,
                    state: SlotState::Clean,
                }))
            }
        }
    }

    /// Stores an eagerly loaded result, replacing clean slots only.
    ///
    /// Returns `false` when a pending write kept the existing slot.
    pub(crate) fn store_loaded(
        &mut self,
        attribute: &str,
        locale: &Locale,
        record: Option<StorageRecord>,
    ) -> bool {
        let key = (attribute.to_string(), locale.clone());
        if self
            .slots
            .get(&key)
            .is_some_and(|slot| slot.state != SlotState::Clean)
        {
            return false;
        }
        self.slots.insert(
            key,
            CacheSlot {
                record,
                state: SlotState::Clean,
            },
        );
        true
    }

    pub(crate) fn remove_clean(&mut self, attribute: &str, locale: &Locale) -> bool {
        let key = (attribute.to_string(), locale.clone());
        match self.slots.get(&key) {
            Some(slot) if slot.state == SlotState::Clean => {
                self.slots.remove(&key);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn pending(&self) -> impl Iterator<Item = (&CacheKey, &CacheSlot)> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.state != SlotState::Clean)
    }

    pub(crate) fn pending_mut(&mut self) -> impl Iterator<Item = (&CacheKey, &mut CacheSlot)> {
        self.slots
            .iter_mut()
            .filter(|(_, slot)| slot.state != SlotState::Clean)
    }

    fn retain_pending(&mut self) {
        self.slots.retain(|_, slot| slot.state != SlotState::Clean);
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

/// One loaded host instance with its own translation cache.
#[derive(Debug, Clone)]
pub struct Host {
    reference: HostRef,
    translations: TranslationCache,
}

impl Host {
    /// Creates a host instance with an empty cache.
    pub fn new(reference: HostRef) -> Self {
        Self {
            reference,
            translations: TranslationCache::default(),
        }
    }

    pub fn reference(&self) -> &HostRef {
        &self.reference
    }

    pub fn id(&self) -> HostId {
        self.reference.host_id
    }

    pub fn host_type(&self) -> &str {
        &self.reference.host_type
    }

    /// Returns whether the `(attribute, locale)` lookup is already cached.
    pub fn is_translation_loaded(&self, attribute: &str, locale: &Locale) -> bool {
        self.translations.get(attribute, locale).is_some()
    }

    /// Drops one clean cached lookup so the next access loads again.
    ///
    /// Returns `false` when nothing was cached or the slot holds an unsaved write.
    pub fn invalidate_translation(&mut self, attribute: &str, locale: &Locale) -> bool {
        self.translations.remove_clean(attribute, locale)
    }

    /// Drops every clean cached lookup, keeping unsaved writes.
    pub fn reload_translations(&mut self) {
        self.translations.retain_pending();
    }

    pub fn has_pending_changes(&self) -> bool {
        self.translations.pending().next().is_some()
    }

    pub fn cached_translation_count(&self) -> usize {
        self.translations.len()
    }

    pub(crate) fn cache(&self) -> &TranslationCache {
        &self.translations
    }

    pub(crate) fn cache_mut(&mut self) -> &mut TranslationCache {
        &mut self.translations
    }
}

#[cfg(test)]
mod tests {
    use super::{Host, HostId, HostRef, SlotState};
    use crate::model::locale::Locale;
    use crate::model::record::StorageRecord;
    use uuid::Uuid;

    fn host() -> Host {
        Host::new(HostRef::new("Post", HostId::new_v4()))
    }

    fn en() -> Locale {
        Locale::parse("en").expect("en parses")
    }

    #[test]
    fn host_ref_requires_type_and_non_nil_id() {
        assert!(HostRef::new("Post", HostId::new_v4()).is_complete());
        assert!(!HostRef::new("  ", HostId::new_v4()).is_complete());
        assert!(!HostRef::new("Post", HostId(Uuid::nil())).is_complete());
    }

    #[test]
    fn cached_absence_counts_as_loaded() {
        let mut host = host();
        assert!(!host.is_translation_loaded("content", &en()));

        host.cache_mut().store_loaded("content", &en(), None);
        assert!(host.is_translation_loaded("content", &en()));
        assert!(!host.has_pending_changes());
    }

    #[test]
    fn invalidate_keeps_pending_writes() {
        let mut host = host();
        let record = StorageRecord::new(host.reference().clone(), "content", "en");
        host.cache_mut().store_loaded("content", &en(), Some(record));
        host.cache_mut()
            .get_mut("content", &en())
            .expect("slot cached")
            .state = SlotState::Dirty;

        assert!(!host.invalidate_translation("content", &en()));
        host.reload_translations();
        assert!(host.is_translation_loaded("content", &en()));
        assert!(host.has_pending_changes());
    }

    #[test]
    fn slot_or_load_runs_loader_once() {
        let mut host = host();
        let mut calls = 0;
        for _ in 0..3 {
            host.cache_mut()
                .slot_or_load("content", &en(), || {
                    calls += 1;
                    Ok::<_, ()>(None)
                })
                .expect("loader succeeds");
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn store_loaded_does_not_replace_pending_write() {
        let mut host = host();
        let mut record = StorageRecord::new(host.reference().clone(), "content", "en");
        record.value = Some("draft".to_string());
        host.cache_mut().store_loaded("content", &en(), Some(record));
        host.cache_mut()
            .get_mut("content", &en())
            .expect("slot cached")
            .state = SlotState::Dirty;

        assert!(!host.cache_mut().store_loaded("content", &en(), None));
        let slot = host.cache().get("content", &en()).expect("slot cached");
        assert_eq!(
            slot.record.as_ref().and_then(StorageRecord::value),
            Some("draft")
        );
    }

    #[test]
    fn invalidate_drops_clean_slot() {
        let mut host = host();
        host.cache_mut().store_loaded("content", &en(), None);

        assert!(host.invalidate_translation("content", &en()));
        assert!(!host.is_translation_loaded("content", &en()));
    }
}
