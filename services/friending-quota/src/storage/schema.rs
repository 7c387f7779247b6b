use rusqlite::Connection;

use super::error::StorageError;

/// `email` is both the primary key and the partition key shared with the
/// user's friend-edge records.
pub const FRIENDING_QUOTAS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS friending_quotas (
    email TEXT PRIMARY KEY,
    max_allowed INTEGER NOT NULL CHECK (max_allowed >= 0),
    total_friended INTEGER NOT NULL DEFAULT 0 CHECK (total_friended >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

pub fn init_database(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(FRIENDING_QUOTAS_TABLE_SCHEMA)?;
    Ok(())
}
