//! Storage-record repository over configurable tables.
//!
//! # Responsibility
//! - Look up, create, update and delete storage records for any configured
//!   storage shape (table, key/value columns, polymorphic back-reference).
//! - Eager-load records for many hosts and their embeds in bulk.
//!
//! # Invariants
//! - Identifiers spliced into SQL come from a validated `BackendConfig`.
//! - Inserts check `(host, key, locale)` uniqueness; a unique-index
//!   violation is reported as the same validation error.
//! - A batch of changes is applied in one transaction or not at all.

use crate::config::BackendConfig;
use crate::db::DbError;
use crate::model::embed::{Blob, Embed};
use crate::model::host::{HostId, HostRef};
use crate::model::locale::Locale;
use crate::model::record::{RecordValidationError, StorageRecord};
use crate::repo::{ensure_schema_version, ensure_table_columns, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use uuid::Uuid;

const EMBEDS_TABLE: &str = "action_text_embeds";
const BLOBS_TABLE: &str = "storage_blobs";
/// Bound parameters per `IN (...)` chunk.
const IN_CHUNK: usize = 400;

/// One pending mutation produced by a host save.
#[derive(Debug, Clone, Copy)]
pub enum TranslationChange<'a> {
    Insert(&'a StorageRecord),
    Update(&'a StorageRecord),
    Delete(&'a StorageRecord),
}

/// Persistence operations consumed by the backend.
pub trait TranslationRepository {
    /// Verifies the configured table and columns exist.
    fn ensure_storage_shape(&self, config: &BackendConfig) -> RepoResult<()>;
    fn find_translation(
        &self,
        config: &BackendConfig,
        host: &HostRef,
        key: &str,
        locale: &Locale,
    ) -> RepoResult<Option<StorageRecord>>;
    /// Loads the `(key, locale)` record of every host in one query per chunk.
    fn find_translations_for_hosts(
        &self,
        config: &BackendConfig,
        hosts: &[HostRef],
        key: &str,
        locale: &Locale,
    ) -> RepoResult<Vec<StorageRecord>>;
    /// Loads embeds with their blobs, grouped by record id.
    fn load_embeds(
        &self,
        config: &BackendConfig,
        record_ids: &[i64],
    ) -> RepoResult<BTreeMap<i64, Vec<Embed>>>;
    /// Applies `changes` atomically; returns the row id per change (`None` for deletes).
    fn save_changes(
        &self,
        config: &BackendConfig,
        changes: &[TranslationChange<'_>],
    ) -> RepoResult<Vec<Option<i64>>>;
    /// Attaches `blob` to record `record_id` after its existing embeds.
    fn attach_embed(&self, config: &BackendConfig, record_id: i64, blob: &Blob)
        -> RepoResult<Embed>;
    /// Deletes every record (and embed) of `host` in this storage table.
    fn delete_translations_for_host(
        &self,
        config: &BackendConfig,
        host: &HostRef,
    ) -> RepoResult<usize>;
    fn count_translations(
        &self,
        config: &BackendConfig,
        host: &HostRef,
        key: &str,
        locale: &Locale,
    ) -> RepoResult<usize>;
}

/// SQLite-backed storage-record repository.
pub struct SqliteTranslationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTranslationRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_version(conn)?;
        ensure_table_columns(
            conn,
            EMBEDS_TABLE,
            &["record_table", "record_row_id", "blob_id", "position"],
        )?;
        ensure_table_columns(
            conn,
            BLOBS_TABLE,
            &["id", "key", "filename", "content_type", "byte_size"],
        )?;
        Ok(Self { conn })
    }
}

impl TranslationRepository for SqliteTranslationRepository<'_> {
    fn ensure_storage_shape(&self, config: &BackendConfig) -> RepoResult<()> {
        let host_type = config.host_type_column();
        let host_id = config.host_id_column();
        ensure_table_columns(
            self.conn,
            config.table(),
            &[
                "id",
                config.key_column.as_str(),
                config.value_column.as_str(),
                "locale",
                host_type.as_str(),
                host_id.as_str(),
                "updated_at",
            ],
        )
    }

    fn find_translation(
        &self,
        config: &BackendConfig,
        host: &HostRef,
        key: &str,
        locale: &Locale,
    ) -> RepoResult<Option<StorageRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{}
             WHERE {} = ?1
               AND locale = ?2
               AND {} = ?3
               AND {} = ?4
             LIMIT 1;",
            select_sql(config),
            config.key_column,
            config.host_type_column(),
            config.host_id_column()
        ))?;

        let mut rows = stmt.query(params![
            key,
            locale.as_str(),
            host.host_type.as_str(),
            host.host_id.to_string(),
        ])?;
        let record = match rows.next()? {
            Some(row) => Some(parse_record_row(row)?),
            None => None,
        };
        Ok(record)
    }

    fn find_translations_for_hosts(
        &self,
        config: &BackendConfig,
        hosts: &[HostRef],
        key: &str,
        locale: &Locale,
    ) -> RepoResult<Vec<StorageRecord>> {
        let mut ids_by_type: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for host in hosts {
            ids_by_type
                .entry(host.host_type.as_str())
                .or_default()
                .push(host.host_id.to_string());
        }

        let mut records = Vec::new();
        for (host_type, ids) in ids_by_type {
            for chunk in ids.chunks(IN_CHUNK) {
                let sql = format!(
                    "{}
                     WHERE {} = ?
                       AND locale = ?
                       AND {} = ?
                       AND {} IN ({})
                     ORDER BY id ASC;",
                    select_sql(config),
                    config.key_column,
                    config.host_type_column(),
                    config.host_id_column(),
                    placeholders(chunk.len())
                );
                let mut bind_values = vec![
                    Value::Text(key.to_string()),
                    Value::Text(locale.as_str().to_string()),
                    Value::Text(host_type.to_string()),
                ];
                bind_values.extend(chunk.iter().cloned().map(Value::Text));

                let mut stmt = self.conn.prepare(&sql)?;
                let mut rows = stmt.query(params_from_iter(bind_values))?;
                while let Some(row) = rows.next()? {
                    records.push(parse_record_row(row)?);
                }
            }
        }
        Ok(records)
    }

    fn load_embeds(
        &self,
        config: &BackendConfig,
        record_ids: &[i64],
    ) -> RepoResult<BTreeMap<i64, Vec<Embed>>> {
        let mut grouped: BTreeMap<i64, Vec<Embed>> = BTreeMap::new();
        for chunk in record_ids.chunks(IN_CHUNK) {
            let sql = format!(
                "SELECT
                    e.record_row_id,
                    e.position,
                    b.id,
                    b.key,
                    b.filename,
                    b.content_type,
                    b.byte_size
                 FROM {EMBEDS_TABLE} e
                 JOIN {BLOBS_TABLE} b ON b.id = e.blob_id
                 WHERE e.record_table = ?
                   AND e.record_row_id IN ({})
                 ORDER BY e.record_row_id ASC, e.position ASC;",
                placeholders(chunk.len())
            );
            let mut bind_values = vec![Value::Text(config.table().to_string())];
            bind_values.extend(chunk.iter().copied().map(Value::Integer));

            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values))?;
            while let Some(row) = rows.next()? {
                let record_id: i64 = row.get(0)?;
                grouped.entry(record_id).or_default().push(Embed {
                    position: row.get(1)?,
                    blob: Blob {
                        id: Some(row.get(2)?),
                        key: row.get(3)?,
                        filename: row.get(4)?,
                        content_type: row.get(5)?,
                        byte_size: row.get(6)?,
                    },
                });
            }
        }
        Ok(grouped)
    }

    fn save_changes(
        &self,
        config: &BackendConfig,
        changes: &[TranslationChange<'_>],
    ) -> RepoResult<Vec<Option<i64>>> {
        let tx = self.conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(changes.len());

        for change in changes {
            let id = match *change {
                TranslationChange::Insert(record) => {
                    record.validate()?;
                    ensure_unique(&tx, config, record)?;
                    Some(insert_record(&tx, config, record)?)
                }
                TranslationChange::Update(record) => {
                    record.validate()?;
                    let id = record.id.ok_or_else(|| {
                        RepoError::InvalidData(format!(
                            "cannot update unsaved record for key `{}`",
                            record.key
                        ))
                    })?;
                    update_record(&tx, config, id, record.value())?;
                    Some(id)
                }
                TranslationChange::Delete(record) => {
                    if let Some(id) = record.id {
                        delete_embeds(&tx, config, &[id])?;
                        tx.execute(
                            &format!("DELETE FROM {} WHERE id = ?1;", config.table()),
                            [id],
                        )?;
                    }
                    None
                }
            };
            ids.push(id);
        }

        tx.commit()?;
        Ok(ids)
    }

    fn attach_embed(
        &self,
        config: &BackendConfig,
        record_id: i64,
        blob: &Blob,
    ) -> RepoResult<Embed> {
        validate_blob(blob)?;
        let tx = self.conn.unchecked_transaction()?;

        let exists: i64 = tx.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);",
                config.table()
            ),
            [record_id],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::RecordNotFound {
                table: config.table().to_string(),
                id: record_id,
            });
        }

        tx.execute(
            &format!(
                "INSERT INTO {BLOBS_TABLE} (key, filename, content_type, byte_size)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO NOTHING;"
            ),
            params![
                blob.key.as_str(),
                blob.filename.as_str(),
                blob.content_type.as_deref(),
                blob.byte_size
            ],
        )?;
        let stored = tx.query_row(
            &format!(
                "SELECT id, key, filename, content_type, byte_size
                 FROM {BLOBS_TABLE}
                 WHERE key = ?1;"
            ),
            [blob.key.as_str()],
            |row| {
                Ok(Blob {
                    id: Some(row.get(0)?),
                    key: row.get(1)?,
                    filename: row.get(2)?,
                    content_type: row.get(3)?,
                    byte_size: row.get(4)?,
                })
            },
        )?;

        let position: i64 = tx.query_row(
            &format!(
                "SELECT COALESCE(MAX(position) + 1, 0)
                 FROM {EMBEDS_TABLE}
                 WHERE record_table = ?1 AND record_row_id = ?2;"
            ),
            params![config.table(), record_id],
            |row| row.get(0),
        )?;
        tx.execute(
            &format!(
                "INSERT INTO {EMBEDS_TABLE} (record_table, record_row_id, blob_id, position)
                 VALUES (?1, ?2, ?3, ?4);"
            ),
            params![config.table(), record_id, stored.id, position],
        )?;
        tx.commit()?;

        Ok(Embed {
            position,
            blob: stored,
        })
    }

    fn delete_translations_for_host(
        &self,
        config: &BackendConfig,
        host: &HostRef,
    ) -> RepoResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = delete_for_host(&tx, config, host)?;
        tx.commit()?;
        Ok(removed)
    }

    fn count_translations(
        &self,
        config: &BackendConfig,
        host: &HostRef,
        key: &str,
        locale: &Locale,
    ) -> RepoResult<usize> {
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*)
                 FROM {}
                 WHERE {} = ?1 AND locale = ?2 AND {} = ?3 AND {} = ?4;",
                config.table(),
                config.key_column,
                config.host_type_column(),
                config.host_id_column()
            ),
            params![
                key,
                locale.as_str(),
                host.host_type.as_str(),
                host.host_id.to_string()
            ],
            |row| row.get(0),
        )?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }
}

/// Deletes all records of `host` in the configured table, embeds first.
///
/// Runs on the caller's connection or transaction.
pub(crate) fn delete_for_host(
    conn: &Connection,
    config: &BackendConfig,
    host: &HostRef,
) -> RepoResult<usize> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id FROM {} WHERE {} = ?1 AND {} = ?2;",
        config.table(),
        config.host_type_column(),
        config.host_id_column()
    ))?;
    let ids = stmt
        .query_map(
            params![host.host_type.as_str(), host.host_id.to_string()],
            |row| row.get::<_, i64>(0),
        )?
        .collect::<Result<Vec<_>, _>>()?;
    delete_embeds(conn, config, &ids)?;

    let removed = conn.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ?1 AND {} = ?2;",
            config.table(),
            config.host_type_column(),
            config.host_id_column()
        ),
        params![host.host_type.as_str(), host.host_id.to_string()],
    )?;
    Ok(removed)
}

fn delete_embeds(conn: &Connection, config: &BackendConfig, record_ids: &[i64]) -> RepoResult<()> {
    for chunk in record_ids.chunks(IN_CHUNK) {
        let mut bind_values = vec![Value::Text(config.table().to_string())];
        bind_values.extend(chunk.iter().copied().map(Value::Integer));
        conn.execute(
            &format!(
                "DELETE FROM {EMBEDS_TABLE}
                 WHERE record_table = ?
                   AND record_row_id IN ({});",
                placeholders(chunk.len())
            ),
            params_from_iter(bind_values),
        )?;
    }
    Ok(())
}

fn ensure_unique(
    conn: &Connection,
    config: &BackendConfig,
    record: &StorageRecord,
) -> RepoResult<()> {
    let existing: Option<i64> = conn
        .query_row(
            &format!(
                "SELECT id
                 FROM {}
                 WHERE {} = ?1 AND {} = ?2 AND {} = ?3 AND locale = ?4
                 LIMIT 1;",
                config.table(),
                config.key_column,
                config.host_type_column(),
                config.host_id_column()
            ),
            params![
                record.key.as_str(),
                record.host.host_type.as_str(),
                record.host.host_id.to_string(),
                record.locale.as_str()
            ],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(_) => Err(taken(record).into()),
        None => Ok(()),
    }
}

fn insert_record(
    conn: &Connection,
    config: &BackendConfig,
    record: &StorageRecord,
) -> RepoResult<i64> {
    let result = conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}, locale, {}, {})
             VALUES (?1, ?2, ?3, ?4, ?5);",
            config.table(),
            config.key_column,
            config.value_column,
            config.host_type_column(),
            config.host_id_column()
        ),
        params![
            record.key.as_str(),
            record.value(),
            record.locale.as_str(),
            record.host.host_type.as_str(),
            record.host.host_id.to_string()
        ],
    );

    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(err) => {
            let err = DbError::from(err);
            if err.is_unique_violation() {
                Err(taken(record).into())
            } else {
                Err(err.into())
            }
        }
    }
}

fn update_record(
    conn: &Connection,
    config: &BackendConfig,
    id: i64,
    value: Option<&str>,
) -> RepoResult<()> {
    let changed = conn.execute(
        &format!(
            "UPDATE {}
             SET
                {} = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2;",
            config.table(),
            config.value_column
        ),
        params![value, id],
    )?;
    if changed == 0 {
        return Err(RepoError::RecordNotFound {
            table: config.table().to_string(),
            id,
        });
    }
    Ok(())
}

fn validate_blob(blob: &Blob) -> RepoResult<()> {
    if blob.key.trim().is_empty() {
        return Err(RepoError::InvalidBlob("key must not be empty".to_string()));
    }
    if blob.filename.trim().is_empty() {
        return Err(RepoError::InvalidBlob(
            "filename must not be empty".to_string(),
        ));
    }
    if blob.byte_size < 0 {
        return Err(RepoError::InvalidBlob(format!(
            "byte size must not be negative, got {}",
            blob.byte_size
        )));
    }
    Ok(())
}

fn taken(record: &StorageRecord) -> RecordValidationError {
    RecordValidationError::Taken {
        host: record.host.clone(),
        key: record.key.clone(),
        locale: record.locale.clone(),
    }
}

fn select_sql(config: &BackendConfig) -> String {
    format!(
        "SELECT id, {}, {}, locale, {}, {} FROM {}",
        config.key_column,
        config.value_column,
        config.host_type_column(),
        config.host_id_column(),
        config.table()
    )
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<StorageRecord> {
    let host_id_text: String = row.get(5)?;
    let host_id = Uuid::parse_str(&host_id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid host id `{host_id_text}` in storage record"))
    })?;

    Ok(StorageRecord {
        id: Some(row.get(0)?),
        key: row.get(1)?,
        value: row.get(2)?,
        locale: row.get(3)?,
        host: HostRef::new(row.get::<_, String>(4)?, HostId(host_id)),
        embeds: None,
    })
}
