//! SQLite metadata backend.

use super::MetadataStore;
use crate::error::StoreError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use stash_types::{AssetRecord, LocalId, SyncStatus};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Schema version written to `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

const SELECT_ASSETS: &str = r#"
    SELECT local_id, remote_id, owner_id, blob_handle, remote_locator,
           thumbnail_handle, thumbnail_mime_type, thumbnail_byte_size,
           display_name, kind, mime_type, byte_size, width, height,
           created_at, updated_at, synced_at, remote_created_at,
           sync_status, sync_error
    FROM assets
"#;

/// SQLite-based asset metadata storage.
///
/// The connection pool is opened lazily on first use and shared by every
/// clone of the store. It is never closed explicitly.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    inner: Arc<Inner>,
}

struct Inner {
    options: SqliteConnectOptions,
    in_memory: bool,
    pool: OnceCell<SqlitePool>,
}

impl SqliteMetadataStore {
    /// Create a store backed by a database file.
    ///
    /// Nothing is opened until first use; the file is created if missing.
    pub fn new(path: &Path) -> Self {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));
        Self::from_options(options, false)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(":memory:").map_err(StoreError::Database)?;
        Ok(Self::from_options(options, true))
    }

    fn from_options(options: SqliteConnectOptions, in_memory: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                options,
                in_memory,
                pool: OnceCell::new(),
            }),
        }
    }

    /// Whether the pool has been opened yet.
    pub fn is_open(&self) -> bool {
        self.inner.pool.initialized()
    }

    async fn pool(&self) -> Result<&SqlitePool, StoreError> {
        self.inner
            .pool
            .get_or_try_init(|| async {
                // An in-memory database lives exactly as long as its single
                // connection, so that connection must never be recycled.
                let pool_options = if self.inner.in_memory {
                    SqlitePoolOptions::new()
                        .max_connections(1)
                        .min_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None)
                } else {
                    SqlitePoolOptions::new().max_connections(4)
                };

                let pool = pool_options
                    .connect_with(self.inner.options.clone())
                    .await
                    .map_err(StoreError::Database)?;

                run_migrations(&pool).await?;
                tracing::debug!("Metadata store opened");
                Ok::<_, StoreError>(pool)
            })
            .await
    }
}

/// Bring the schema up to [`SCHEMA_VERSION`].
///
/// A database already at a later version is left untouched.
async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(StoreError::Database)?;

    if version > SCHEMA_VERSION {
        tracing::warn!(
            "Metadata schema version {} is newer than {}, skipping migrations",
            version,
            SCHEMA_VERSION
        );
        return Ok(());
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assets (
            local_id INTEGER PRIMARY KEY AUTOINCREMENT,
            remote_id TEXT UNIQUE,
            owner_id TEXT,
            blob_handle TEXT NOT NULL,
            remote_locator TEXT,
            thumbnail_handle TEXT,
            thumbnail_mime_type TEXT,
            thumbnail_byte_size INTEGER,
            display_name TEXT NOT NULL,
            kind TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            byte_size INTEGER NOT NULL,
            width INTEGER,
            height INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            synced_at INTEGER,
            remote_created_at TEXT,
            sync_status TEXT,
            sync_error TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(StoreError::Database)?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_assets_created_at ON assets(created_at)")
        .execute(pool)
        .await
        .map_err(StoreError::Database)?;

    // Empty handles mark not-yet-downloaded records and may repeat.
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_assets_blob_handle ON assets(blob_handle) WHERE blob_handle <> ''",
    )
    .execute(pool)
    .await
    .map_err(StoreError::Database)?;

    if version < SCHEMA_VERSION {
        sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
            .execute(pool)
            .await
            .map_err(StoreError::Database)?;
        tracing::info!(
            "Metadata schema upgraded from version {} to {}",
            version,
            SCHEMA_VERSION
        );
    }

    Ok(())
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn open(&self) -> Result<(), StoreError> {
        self.pool().await.map(|_| ())
    }

    async fn insert(&self, record: &AssetRecord) -> Result<LocalId, StoreError> {
        let pool = self.pool().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO assets (
                remote_id, owner_id, blob_handle, remote_locator,
                thumbnail_handle, thumbnail_mime_type, thumbnail_byte_size,
                display_name, kind, mime_type, byte_size, width, height,
                created_at, updated_at, synced_at, remote_created_at,
                sync_status, sync_error
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
        )
        .bind(record.remote_id.as_deref())
        .bind(record.owner_id.as_deref())
        .bind(&record.blob_handle)
        .bind(record.remote_locator.as_deref())
        .bind(record.thumbnail_handle.as_deref())
        .bind(record.thumbnail_mime_type.as_deref())
        .bind(record.thumbnail_byte_size.map(|n| n as i64))
        .bind(&record.display_name)
        .bind(record.kind.as_str())
        .bind(&record.mime_type)
        .bind(record.byte_size as i64)
        .bind(record.width.map(i64::from))
        .bind(record.height.map(i64::from))
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.synced_at)
        .bind(record.remote_created_at.as_deref())
        .bind(record.sync_status.map(|s| s.as_str()))
        .bind(record.sync_error.as_deref())
        .execute(pool)
        .await
        .map_err(StoreError::Database)?;

        Ok(LocalId::new(result.last_insert_rowid()))
    }

    async fn get(&self, local_id: LocalId) -> Result<Option<AssetRecord>, StoreError> {
        let pool = self.pool().await?;

        let row = sqlx::query_as::<_, AssetRow>(&format!("{} WHERE local_id = ?1", SELECT_ASSETS))
            .bind(local_id.value())
            .fetch_optional(pool)
            .await
            .map_err(StoreError::Database)?;

        match row {
            Some(r) => Ok(Some(r.try_into()?)),
            None => Ok(None),
        }
    }

    async fn update(&self, record: &AssetRecord) -> Result<(), StoreError> {
        let local_id = record.local_id.ok_or(StoreError::Unpersisted)?;
        let pool = self.pool().await?;

        let result = sqlx::query(
            r#"
            UPDATE assets SET
                remote_id = ?2, owner_id = ?3, blob_handle = ?4, remote_locator = ?5,
                thumbnail_handle = ?6, thumbnail_mime_type = ?7, thumbnail_byte_size = ?8,
                display_name = ?9, kind = ?10, mime_type = ?11, byte_size = ?12,
                width = ?13, height = ?14, updated_at = ?15, synced_at = ?16,
                remote_created_at = ?17, sync_status = ?18, sync_error = ?19
            WHERE local_id = ?1
            "#,
        )
        .bind(local_id.value())
        .bind(record.remote_id.as_deref())
        .bind(record.owner_id.as_deref())
        .bind(&record.blob_handle)
        .bind(record.remote_locator.as_deref())
        .bind(record.thumbnail_handle.as_deref())
        .bind(record.thumbnail_mime_type.as_deref())
        .bind(record.thumbnail_byte_size.map(|n| n as i64))
        .bind(&record.display_name)
        .bind(record.kind.as_str())
        .bind(&record.mime_type)
        .bind(record.byte_size as i64)
        .bind(record.width.map(i64::from))
        .bind(record.height.map(i64::from))
        .bind(record.updated_at)
        .bind(record.synced_at)
        .bind(record.remote_created_at.as_deref())
        .bind(record.sync_status.map(|s| s.as_str()))
        .bind(record.sync_error.as_deref())
        .execute(pool)
        .await
        .map_err(StoreError::Database)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                local_id: local_id.value(),
            });
        }
        Ok(())
    }

    async fn delete(&self, local_id: LocalId) -> Result<(), StoreError> {
        let pool = self.pool().await?;

        sqlx::query("DELETE FROM assets WHERE local_id = ?1")
            .bind(local_id.value())
            .execute(pool)
            .await
            .map_err(StoreError::Database)?;

        Ok(())
    }

    async fn list_all_ordered_by_creation(&self) -> Result<Vec<AssetRecord>, StoreError> {
        let pool = self.pool().await?;

        let rows = sqlx::query_as::<_, AssetRow>(&format!(
            "{} ORDER BY created_at ASC, local_id ASC",
            SELECT_ASSETS
        ))
        .fetch_all(pool)
        .await
        .map_err(StoreError::Database)?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }

    async fn list_by_status(
        &self,
        statuses: &[SyncStatus],
    ) -> Result<Vec<AssetRecord>, StoreError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let pool = self.pool().await?;

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "{} WHERE sync_status IN ({}) ORDER BY created_at ASC, local_id ASC",
            SELECT_ASSETS, placeholders
        );

        let mut query = sqlx::query_as::<_, AssetRow>(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }

        let rows = query.fetch_all(pool).await.map_err(StoreError::Database)?;
        rows.into_iter().map(|row| row.try_into()).collect()
    }
}

/// Internal row type for SQLite queries.
#[derive(sqlx::FromRow)]
struct AssetRow {
    local_id: i64,
    remote_id: Option<String>,
    owner_id: Option<String>,
    blob_handle: String,
    remote_locator: Option<String>,
    thumbnail_handle: Option<String>,
    thumbnail_mime_type: Option<String>,
    thumbnail_byte_size: Option<i64>,
    display_name: String,
    kind: String,
    mime_type: String,
    byte_size: i64,
    width: Option<i64>,
    height: Option<i64>,
    created_at: i64,
    updated_at: i64,
    synced_at: Option<i64>,
    remote_created_at: Option<String>,
    sync_status: Option<String>,
    sync_error: Option<String>,
}

impl TryFrom<AssetRow> for AssetRecord {
    type Error = StoreError;

    fn try_from(row: AssetRow) -> Result<Self, Self::Error> {
        let local_id = row.local_id;
        let invalid = |reason: String| StoreError::InvalidRecord { local_id, reason };
        let dimension = |value: Option<i64>| -> Result<Option<u32>, StoreError> {
            value
                .map(|v| u32::try_from(v).map_err(|_| invalid(format!("bad dimension {}", v))))
                .transpose()
        };

        Ok(AssetRecord {
            local_id: Some(LocalId::new(row.local_id)),
            remote_id: row.remote_id,
            owner_id: row.owner_id,
            blob_handle: row.blob_handle,
            remote_locator: row.remote_locator,
            thumbnail_handle: row.thumbnail_handle,
            thumbnail_mime_type: row.thumbnail_mime_type,
            thumbnail_byte_size: row.thumbnail_byte_size.map(|n| n.max(0) as u64),
            display_name: row.display_name,
            kind: row.kind.parse().map_err(|e| invalid(format!("{}", e)))?,
            mime_type: row.mime_type,
            byte_size: row.byte_size.max(0) as u64,
            width: dimension(row.width)?,
            height: dimension(row.height)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            synced_at: row.synced_at,
            remote_created_at: row.remote_created_at,
            sync_status: row
                .sync_status
                .map(|s| s.parse::<SyncStatus>())
                .transpose()
                .map_err(|e| invalid(format!("{}", e)))?,
            sync_error: row.sync_error,
        })
    }
}
