//! Archive of raw registry responses
//!
//! An archive is a SQLite file that records every HTTP response the
//! transport receives during a fetch, keyed by a hash of the request. A later
//! fetch can replay the archive instead of touching the network, producing
//! the same items in the same order.

mod schema;

use crate::{ArchiveError, ArchiveResult};
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;

pub use schema::initialize_schema;

/// Describes the fetch an archive was recorded from
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveMetadata {
    pub origin: String,
    pub backend_name: String,
    pub backend_version: String,
    pub category: String,
    pub backend_params: Value,
    pub config_hash: Option<String>,
    pub created_on: String,
}

/// A recorded HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedResponse {
    pub uri: String,
    pub status: u16,
    pub body: String,
}

/// SQLite-backed response archive
pub struct Archive {
    conn: Connection,
}

impl Archive {
    /// Creates an archive file for recording
    ///
    /// An existing file at `path` is emptied, so every recorded fetch
    /// starts from a fresh archive.
    pub fn create(path: &Path) -> ArchiveResult<Self> {
        let archive = Self::with_connection(Connection::open(path)?)?;
        archive
            .conn
            .execute_batch("DELETE FROM archive; DELETE FROM metadata;")?;
        Ok(archive)
    }

    /// Opens an existing archive file for replay
    ///
    /// Fails if the file does not exist or carries no metadata.
    pub fn open(path: &Path) -> ArchiveResult<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        let archive = Self::with_connection(conn)?;
        archive.metadata()?;
        Ok(archive)
    }

    /// Creates an archive that lives only in memory
    pub fn in_memory() -> ArchiveResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> ArchiveResult<Self> {
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Writes the metadata row, replacing any previous one
    pub fn init_metadata(&self, metadata: &ArchiveMetadata) -> ArchiveResult<()> {
        self.conn.execute("DELETE FROM metadata", [])?;
        self.conn.execute(
            "INSERT INTO metadata (origin, backend_name, backend_version, category,
             backend_params, config_hash, created_on)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                metadata.origin,
                metadata.backend_name,
                metadata.backend_version,
                metadata.category,
                serde_json::to_string(&metadata.backend_params)?,
                metadata.config_hash,
                metadata.created_on,
            ],
        )?;

        tracing::debug!(
            "Archive metadata initialized for {} ({})",
            metadata.origin,
            metadata.category
        );
        Ok(())
    }

    /// Reads the metadata row
    pub fn metadata(&self) -> ArchiveResult<ArchiveMetadata> {
        let row = self
            .conn
            .query_row(
                "SELECT origin, backend_name, backend_version, category, backend_params,
                 config_hash, created_on FROM metadata LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?
            .ok_or(ArchiveError::MissingMetadata)?;

        let (origin, backend_name, backend_version, category, params, config_hash, created_on) =
            row;

        Ok(ArchiveMetadata {
            origin,
            backend_name,
            backend_version,
            category,
            backend_params: serde_json::from_str(&params)?,
            config_hash,
            created_on,
        })
    }

    /// Records a response for the given request
    ///
    /// # Errors
    ///
    /// Returns `ArchiveError::DuplicateEntry` if the same request was
    /// already recorded in this archive.
    pub fn store(
        &self,
        uri: &str,
        query: &[(&str, String)],
        status: u16,
        body: &str,
    ) -> ArchiveResult<()> {
        let hashcode = make_hashcode(uri, query);
        let payload = serde_json::to_string(&sorted_query(query))?;

        let result = self.conn.execute(
            "INSERT INTO archive (hashcode, uri, payload, status, body) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![hashcode, uri, payload, status, body],
        );

        match result {
            Ok(_) => {
                tracing::trace!("Archived {} ({})", uri, hashcode);
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(ArchiveError::DuplicateEntry {
                    uri: uri.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Looks up the recorded response for the given request
    pub fn retrieve(&self, uri: &str, query: &[(&str, String)]) -> ArchiveResult<ArchivedResponse> {
        let hashcode = make_hashcode(uri, query);

        let found = self
            .conn
            .query_row(
                "SELECT uri, status, body FROM archive WHERE hashcode = ?1",
                params![hashcode],
                |row| {
                    Ok(ArchivedResponse {
                        uri: row.get(0)?,
                        status: row.get(1)?,
                        body: row.get(2)?,
                    })
                },
            )
            .optional()?;

        found.ok_or_else(|| ArchiveError::ResponseNotFound {
            uri: uri.to_string(),
            hashcode,
        })
    }

    /// Number of recorded responses
    pub fn len(&self) -> ArchiveResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM archive", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Returns true if no response has been recorded yet
    pub fn is_empty(&self) -> ArchiveResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl ArchiveMetadata {
    /// Builds metadata stamped with the current time
    pub fn new(
        origin: &str,
        backend_name: &str,
        backend_version: &str,
        category: &str,
        backend_params: Value,
    ) -> Self {
        Self {
            origin: origin.to_string(),
            backend_name: backend_name.to_string(),
            backend_version: backend_version.to_string(),
            category: category.to_string(),
            backend_params,
            config_hash: None,
            created_on: Utc::now().to_rfc3339(),
        }
    }
}

/// Computes the archive key for a request
///
/// Query parameters are sorted first, so their order does not matter.
pub fn make_hashcode(uri: &str, query: &[(&str, String)]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(uri.as_bytes());
    for (key, value) in sorted_query(query) {
        hasher.update(b"\0");
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn sorted_query<'a>(query: &'a [(&'a str, String)]) -> Vec<(&'a str, &'a str)> {
    let mut pairs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_str())).collect();
    pairs.sort();
    pairs
}
