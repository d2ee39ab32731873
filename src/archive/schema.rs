//! Archive schema definitions

/// SQL schema for an archive database
pub const SCHEMA_SQL: &str = r#"
-- One row describing the fetch that produced this archive
CREATE TABLE IF NOT EXISTS metadata (
    origin TEXT NOT NULL,
    backend_name TEXT NOT NULL,
    backend_version TEXT NOT NULL,
    category TEXT NOT NULL,
    backend_params TEXT NOT NULL,
    config_hash TEXT,
    created_on TEXT NOT NULL
);

-- Recorded HTTP responses, keyed by request hashcode
CREATE TABLE IF NOT EXISTS archive (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hashcode TEXT NOT NULL UNIQUE,
    uri TEXT NOT NULL,
    payload TEXT NOT NULL,
    status INTEGER NOT NULL,
    body TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_archive_hashcode ON archive(hashcode);
"#;

/// Initializes the archive schema
///
/// Safe to call on an existing archive.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["metadata", "archive"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
