use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -32000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, unixepoch())",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

/// Drop every table created by `init_schema`, dependents first.
pub fn drop_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS featurerequest;
        DROP TABLE IF EXISTS productarea;
        DROP TABLE IF EXISTS client;
        DROP TABLE IF EXISTS schema_version;
    ",
    )?;
    Ok(())
}

// Priority only excludes zero: the shift writes negative priorities while it
// runs, and SQLite checks CHECK constraints on every row write.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS client (
    client_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(name) > 0),
    CONSTRAINT client_name_key UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS productarea (
    productarea_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(name) > 0),
    CONSTRAINT productarea_name_key UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS featurerequest (
    featurerequest_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    priority INTEGER NOT NULL,
    target_date TEXT,
    client_id INTEGER NOT NULL REFERENCES client (client_id),
    productarea_id INTEGER NOT NULL REFERENCES productarea (productarea_id),
    CONSTRAINT featurerequest_title_key UNIQUE (title),
    CONSTRAINT featurerequest_client_id_priority_key UNIQUE (client_id, priority),
    CONSTRAINT featurerequest_priority_nonzero CHECK (priority <> 0)
);
CREATE INDEX IF NOT EXISTS idx_featurerequest_productarea ON featurerequest (productarea_id);
";

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded_versions(conn: &Connection) -> Vec<i32> {
        let mut stmt = conn
            .prepare("SELECT version FROM schema_version ORDER BY version")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn init_records_current_version_once() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(recorded_versions(&conn), vec![SCHEMA_VERSION]);
    }

    #[test]
    fn drop_then_init_starts_over() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        drop_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(recorded_versions(&conn), vec![SCHEMA_VERSION]);
    }
}
