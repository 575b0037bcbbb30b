use async_trait::async_trait;
use burrow_core::store::{RecordStore, Result};
use burrow_core::{
    NewShortUrlRecord, Owner, Page, RecordId, ShortKey, ShortUrlRecord, StorageError,
};
use futures::stream::{BoxStream, StreamExt};
use jiff::Timestamp;
use sqlx::mysql::{MySqlDatabaseError, MySqlRow};
use sqlx::{MySqlPool, Row};

/// DDL for the `short_urls` table.
pub const SCHEMA: &str = include_str!("../ddl/mysql/short_urls.sql");

const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;
const ER_LOCK_DEADLOCK: u16 = 1213;

/// MySQL implementation of the record store contract.
///
/// The unique index on `url_key` is the authority for key uniqueness. Reads
/// only return live records (`expires_at > now`). Timestamps are stored as
/// epoch milliseconds and ids are the table's auto-increment value.
#[derive(Debug, Clone)]
pub struct MySqlRecordStore {
    pool: MySqlPool,
}

impl MySqlRecordStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `short_urls` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn parse_millis(column: &str, value: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(value).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{value}': {e}"))
    })
}

/// Ids are decimal auto-increment values; anything else cannot match a row.
fn parse_row_id(id: &RecordId) -> Option<u64> {
    id.as_str().parse().ok()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        sqlx::Error::Database(ref db) => map_database_error(
            db.try_downcast_ref::<MySqlDatabaseError>()
                .map(MySqlDatabaseError::number),
            message,
        ),
        _ => StorageError::Query(message),
    }
}

/// Lock contention aborts only the losing statement or transaction, so the
/// caller may retry it.
fn map_database_error(number: Option<u16>, message: String) -> StorageError {
    match number {
        Some(ER_LOCK_DEADLOCK) => StorageError::Unavailable(message),
        Some(ER_LOCK_WAIT_TIMEOUT) => StorageError::Timeout(message),
        _ => StorageError::Query(message),
    }
}

fn record_from_row(row: &MySqlRow) -> Result<ShortUrlRecord> {
    let id: u64 = row.try_get("id").map_err(map_sqlx_error)?;
    let key: String = row.try_get("url_key").map_err(map_sqlx_error)?;
    let url: String = row.try_get("url").map_err(map_sqlx_error)?;
    let description: Option<String> = row.try_get("description").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let created_by: String = row.try_get("created_by").map_err(map_sqlx_error)?;
    let last_updated_at: i64 = row.try_get("last_updated_at").map_err(map_sqlx_error)?;
    let last_updated_by: String = row.try_get("last_updated_by").map_err(map_sqlx_error)?;
    let expires_at: i64 = row.try_get("expires_at").map_err(map_sqlx_error)?;

    let owner = Owner::new(created_by)
        .map_err(|e| StorageError::InvalidData(format!("record {id}: {e}")))?;

    Ok(ShortUrlRecord {
        id: RecordId::new_unchecked(id.to_string()),
        key: ShortKey::new_unchecked(key),
        url,
        description,
        created_at: parse_millis("created_at", created_at)?,
        owner,
        last_updated_at: parse_millis("last_updated_at", last_updated_at)?,
        last_updated_by,
        expires_at: parse_millis("expires_at", expires_at)?,
    })
}

#[async_trait]
impl RecordStore for MySqlRecordStore {
    async fn save(&self, record: NewShortUrlRecord) -> Result<ShortUrlRecord> {
        let now_ms = Timestamp::now().as_millisecond();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Expired holders are freed by primary key; a fresh key must not take
        // a gap lock on the `url_key` index.
        let expired_holder: Option<u64> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM short_urls
            WHERE url_key = ?
              AND expires_at <= ?
            LIMIT 1
            "#,
        )
        .bind(record.key.as_str())
        .bind(now_ms)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if let Some(holder_id) = expired_holder {
            sqlx::query(
                r#"
                DELETE FROM short_urls
                WHERE id = ?
                  AND expires_at <= ?
                "#,
            )
            .bind(holder_id)
            .bind(now_ms)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO short_urls
                (url_key, url, description, created_at, created_by,
                 last_updated_at, last_updated_by, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.key.as_str())
        .bind(record.url.as_str())
        .bind(record.description.as_deref())
        .bind(now_ms)
        .bind(record.owner.as_str())
        .bind(now_ms)
        .bind(record.owner.as_str())
        .bind(record.expires_at.as_millisecond())
        .execute(&mut *tx)
        .await;

        let id = match inserted {
            Ok(result) => result.last_insert_id(),
            Err(err) if is_unique_violation(&err) => {
                return Err(StorageError::Conflict(record.key.to_string()))
            }
            Err(err) => return Err(map_sqlx_error(err)),
        };

        tx.commit().await.map_err(map_sqlx_error)?;

        let stored_at = parse_millis("created_at", now_ms)?;
        Ok(ShortUrlRecord {
            id: RecordId::new_unchecked(id.to_string()),
            key: record.key,
            url: record.url,
            description: record.description,
            created_at: stored_at,
            last_updated_by: record.owner.as_str().to_owned(),
            owner: record.owner,
            last_updated_at: stored_at,
            expires_at: parse_millis("expires_at", record.expires_at.as_millisecond())?,
        })
    }

    async fn find_by_id_for_owner(
        &self,
        id: &RecordId,
        owner: &Owner,
    ) -> Result<Option<ShortUrlRecord>> {
        let Some(row_id) = parse_row_id(id) else {
            return Ok(None);
        };

        let row = sqlx::query(
            r#"
            SELECT id, url_key, url, description, created_at, created_by,
                   last_updated_at, last_updated_by, expires_at
            FROM short_urls
            WHERE id = ?
              AND created_by = ?
              AND expires_at > ?
            LIMIT 1
            "#,
        )
        .bind(row_id)
        .bind(owner.as_str())
        .bind(Timestamp::now().as_millisecond())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn find_by_key(&self, key: &ShortKey) -> Result<Option<ShortUrlRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, url_key, url, description, created_at, created_by,
                   last_updated_at, last_updated_by, expires_at
            FROM short_urls
            WHERE url_key = ?
              AND expires_at > ?
            LIMIT 1
            "#,
        )
        .bind(key.as_str())
        .bind(Timestamp::now().as_millisecond())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn list_by_owner(
        &self,
        owner: &Owner,
        page: u32,
        size: u32,
    ) -> Result<Page<ShortUrlRecord>> {
        let now_ms = Timestamp::now().as_millisecond();
        let offset = u64::from(page) * u64::from(size);

        let rows = sqlx::query(
            r#"
            SELECT id, url_key, url, description, created_at, created_by,
                   last_updated_at, last_updated_by, expires_at
            FROM short_urls
            WHERE created_by = ?
              AND expires_at > ?
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(owner.as_str())
        .bind(now_ms)
        .bind(u64::from(size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM short_urls
            WHERE created_by = ?
              AND expires_at > ?
            "#,
        )
        .bind(owner.as_str())
        .bind(now_ms)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let items = rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            page,
            size,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    fn find_expired(&self, now: Timestamp) -> BoxStream<'_, Result<ShortUrlRecord>> {
        sqlx::query(
            r#"
            SELECT id, url_key, url, description, created_at, created_by,
                   last_updated_at, last_updated_by, expires_at
            FROM short_urls
            WHERE expires_at <= ?
            ORDER BY expires_at
            "#,
        )
        .bind(now.as_millisecond())
        .fetch(&self.pool)
        .map(|row| {
            row.map_err(map_sqlx_error)
                .and_then(|row| record_from_row(&row))
        })
        .boxed()
    }

    async fn delete_by_id(&self, id: &RecordId) -> Result<bool> {
        let Some(row_id) = parse_row_id(id) else {
            return Ok(false);
        };

        let result = sqlx::query(
            r#"
            DELETE FROM short_urls
            WHERE id = ?
            "#,
        )
        .bind(row_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_ids_must_be_decimal() {
        assert_eq!(parse_row_id(&RecordId::new_unchecked("42")), Some(42));
        assert_eq!(parse_row_id(&RecordId::new_unchecked("64f0c2a9e1b2")), None);
    }

    #[test]
    fn pool_failures_map_to_transient_errors() {
        assert!(map_sqlx_error(sqlx::Error::PoolTimedOut).is_transient());
        assert!(map_sqlx_error(sqlx::Error::PoolClosed).is_transient());
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StorageError::InvalidData(_)
        ));
    }

    #[test]
    fn lock_contention_is_transient() {
        let deadlock = map_database_error(Some(ER_LOCK_DEADLOCK), "deadlock".into());
        assert!(matches!(deadlock, StorageError::Unavailable(_)));
        assert!(deadlock.is_transient());

        let lock_wait = map_database_error(Some(ER_LOCK_WAIT_TIMEOUT), "lock wait".into());
        assert!(matches!(lock_wait, StorageError::Timeout(_)));
        assert!(lock_wait.is_transient());

        // 1064 is a syntax error
        assert!(matches!(
            map_database_error(Some(1064), "syntax".into()),
            StorageError::Query(_)
        ));
        assert!(matches!(
            map_database_error(None, "unknown".into()),
            StorageError::Query(_)
        ));
    }
}
