//! Host rows and cascading destroy.
//!
//! # Invariants
//! - Every call to `find_host` returns a new `Host` with an empty cache.
//! - Destroying a host removes its storage records in every dependent
//!   storage table within the same transaction as the host row.

use crate::config::BackendConfig;
use crate::model::host::{Host, HostId, HostRef};
use crate::repo::translation_repo::delete_for_host;
use crate::repo::{ensure_schema_version, ensure_table_columns, RepoError, RepoResult};
use crate::db::DbError;
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Repository interface for host rows.
pub trait HostRepository {
    /// Inserts a host with a generated id.
    fn create_host(&self, host_type: &str) -> RepoResult<Host>;
    /// Inserts a host with a caller-provided id.
    fn insert_host(&self, reference: &HostRef) -> RepoResult<Host>;
    fn find_host(&self, host_type: &str, id: HostId) -> RepoResult<Option<Host>>;
    /// Lists hosts of one type ordered by creation, then id.
    fn list_hosts(&self, host_type: &str) -> RepoResult<Vec<Host>>;
    /// Deletes the host row and its records in every `dependents` table.
    ///
    /// Returns the number of storage records removed.
    fn delete_host(&self, host: &HostRef, dependents: &[&BackendConfig]) -> RepoResult<usize>;
}

/// SQLite-backed host repository.
pub struct SqliteHostRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHostRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_version(conn)?;
        ensure_table_columns(conn, "hosts", &["host_type", "host_id", "created_at"])?;
        Ok(Self { conn })
    }
}

impl HostRepository for SqliteHostRepository<'_> {
    fn create_host(&self, host_type: &str) -> RepoResult<Host> {
        self.insert_host(&HostRef::new(host_type, HostId::new_v4()))
    }

    fn insert_host(&self, reference: &HostRef) -> RepoResult<Host> {
        if !reference.is_complete() {
            return Err(RepoError::InvalidData(format!(
                "host reference is incomplete: `{reference}`"
            )));
        }

        let result = self.conn.execute(
            "INSERT INTO hosts (host_type, host_id) VALUES (?1, ?2);",
            params![reference.host_type.as_str(), reference.host_id.to_string()],
        );
        match result {
            Ok(_) => Ok(Host::new(reference.clone())),
            Err(err) => {
                let err = DbError::from(err);
                if err.is_unique_violation() {
                    Err(RepoError::DuplicateHost(reference.clone()))
                } else {
                    Err(err.into())
                }
            }
        }
    }

    fn find_host(&self, host_type: &str, id: HostId) -> RepoResult<Option<Host>> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM hosts WHERE host_type = ?1 AND host_id = ?2
            );",
            params![host_type, id.to_string()],
            |row| row.get(0),
        )?;
        Ok((exists == 1).then(|| Host::new(HostRef::new(host_type, id))))
    }

    fn list_hosts(&self, host_type: &str) -> RepoResult<Vec<Host>> {
        let mut stmt = self.conn.prepare(
            "SELECT host_id
             FROM hosts
             WHERE host_type = ?1
             ORDER BY created_at ASC, host_id ASC;",
        )?;
        let mut rows = stmt.query([host_type])?;
        let mut hosts = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            let id = Uuid::parse_str(&id_text).map_err(|_| {
                RepoError::InvalidData(format!("invalid uuid value `{id_text}` in hosts.host_id"))
            })?;
            hosts.push(Host::new(HostRef::new(host_type, HostId(id))));
        }
        Ok(hosts)
    }

    fn delete_host(&self, host: &HostRef, dependents: &[&BackendConfig]) -> RepoResult<usize> {
        let tx = self.conn.unchecked_transaction()?;

        let mut removed = 0;
        for config in dependents {
            removed += delete_for_host(&tx, config, host)?;
        }

        let changed = tx.execute(
            "DELETE FROM hosts WHERE host_type = ?1 AND host_id = ?2;",
            params![host.host_type.as_str(), host.host_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::HostNotFound(host.clone()));
        }

        tx.commit()?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::{HostRepository, SqliteHostRepository};
    use crate::db::open_db_in_memory;
    use crate::model::host::{HostId, HostRef};
    use crate::repo::RepoError;

    #[test]
    fn create_find_and_list_hosts() {
        let conn = open_db_in_memory().expect("store opens");
        let repo = SqliteHostRepository::try_new(&conn).expect("repo builds");

        let post = repo.create_host("Post").expect("host created");
        repo.create_host("Comment").expect("other type created");

        let found = repo
            .find_host("Post", post.id())
            .expect("lookup succeeds")
            .expect("host exists");
        assert_eq!(found.reference(), post.reference());
        assert_eq!(found.cached_translation_count(), 0);
        assert_eq!(repo.list_hosts("Post").expect("list succeeds").len(), 1);
        assert!(repo
            .find_host("Comment", post.id())
            .expect("lookup succeeds")
            .is_none());
    }

    #[test]
    fn insert_host_rejects_duplicates_and_incomplete_refs() {
        let conn = open_db_in_memory().expect("store opens");
        let repo = SqliteHostRepository::try_new(&conn).expect("repo builds");
        let reference = HostRef::new("Post", HostId::new_v4());

        repo.insert_host(&reference).expect("first insert");
        assert!(matches!(
            repo.insert_host(&reference),
            Err(RepoError::DuplicateHost(_))
        ));
        assert!(matches!(
            repo.insert_host(&HostRef::new("", HostId::new_v4())),
            Err(RepoError::InvalidData(_))
        ));
    }

    #[test]
    fn delete_missing_host_is_not_found() {
        let conn = open_db_in_memory().expect("store opens");
        let repo = SqliteHostRepository::try_new(&conn).expect("repo builds");

        let err = repo
            .delete_host(&HostRef::new("Post", HostId::new_v4()), &[])
            .expect_err("missing host");
        assert!(matches!(err, RepoError::HostNotFound(_)));
    }
}
