use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};

use crate::quota::FriendingQuota;

use super::error::StorageError;
use super::schema::init_database;
use super::QUOTA_DB_FILENAME;

const SELECT_QUOTA: &str = r#"
    SELECT email, max_allowed, total_friended
    FROM friending_quotas
    WHERE email = ?1
"#;

pub struct QuotaDatabase {
    conn: Mutex<Connection>,
}

impl QuotaDatabase {
    pub fn new(data_dir: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&data_dir)?;
        let db_path = data_dir.join(QUOTA_DB_FILENAME);
        let conn = Connection::open(&db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        init_database(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn create_quota(&self, quota: &FriendingQuota) -> Result<FriendingQuota, StorageError> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        let inserted = conn.execute(
            r#"
            INSERT INTO friending_quotas (email, max_allowed, total_friended, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                quota.email(),
                quota.max_allowed(),
                quota.total_friended(),
                now,
                now
            ],
        );

        match inserted {
            Ok(_) => Ok(quota.clone()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::QuotaExists(quota.email().to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the stored record, inserting `quota` first if the email has
    /// none. An existing record keeps its values.
    pub fn get_or_create_quota(
        &self,
        quota: &FriendingQuota,
    ) -> Result<FriendingQuota, StorageError> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO friending_quotas (email, max_allowed, total_friended, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(email) DO NOTHING
            "#,
            params![
                quota.email(),
                quota.max_allowed(),
                quota.total_friended(),
                now,
                now
            ],
        )?;

        query_quota(&conn, quota.email())?
            .ok_or_else(|| StorageError::QuotaNotFound(quota.email().to_string()))
    }

    pub fn get_quota(&self, email: &str) -> Result<Option<FriendingQuota>, StorageError> {
        let conn = self.lock()?;
        query_quota(&conn, email)
    }

    pub fn list_quotas(&self) -> Result<Vec<FriendingQuota>, StorageError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT email, max_allowed, total_friended
            FROM friending_quotas
            ORDER BY email ASC
            "#,
        )?;

        let rows = stmt.query_map([], map_quota_row)?;

        let mut quotas = Vec::new();
        for row in rows {
            quotas.push(check_row(row?)?);
        }
        Ok(quotas)
    }

    /// Loads the record for `email`, applies `update` and writes the result
    /// back, all inside one immediate transaction. Nothing is written when
    /// `update` leaves the record unchanged.
    pub fn update_quota<F, T>(
        &self,
        email: &str,
        update: F,
    ) -> Result<(FriendingQuota, T), StorageError>
    where
        F: FnOnce(&mut FriendingQuota) -> T,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let before = query_quota(&tx, email)?
            .ok_or_else(|| StorageError::QuotaNotFound(email.to_string()))?;
        let mut after = before.clone();
        let output = update(&mut after);

        if after != before {
            tx.execute(
                r#"
                UPDATE friending_quotas
                SET max_allowed = ?2, total_friended = ?3, updated_at = ?4
                WHERE email = ?1
                "#,
                params![
                    email,
                    after.max_allowed(),
                    after.total_friended(),
                    Utc::now().to_rfc3339()
                ],
            )?;
        }

        tx.commit()?;
        Ok((after, output))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::ConnectionPoisoned)
    }
}

fn query_quota(conn: &Connection, email: &str) -> Result<Option<FriendingQuota>, StorageError> {
    let row = conn
        .query_row(SELECT_QUOTA, params![email], map_quota_row)
        .optional()?;

    row.map(check_row).transpose()
}

fn map_quota_row(row: &Row<'_>) -> rusqlite::Result<(String, i64, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn check_row(
    (email, max_allowed, total_friended): (String, i64, i64),
) -> Result<FriendingQuota, StorageError> {
    if max_allowed < 0 || total_friended < 0 {
        return Err(StorageError::InvalidRecord(format!(
            "{email}: max_allowed={max_allowed}, total_friended={total_friended}"
        )));
    }
    Ok(FriendingQuota::from_parts(email, max_allowed, total_friended))
}
