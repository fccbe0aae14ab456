//! Durable order store (PostgreSQL via sqlx), an in-process store, and a caller-owned TTL cache.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use ckd_core::{
    CanonicalTimestamp, ColumnKind, OrderColumn, OrderParams, OrderRecord, ParamValue,
    ORDERS_TABLE,
};
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Connection, Postgres, QueryBuilder, Row};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const CRATE_NAME: &str = "ckd-store";

/// Rows per INSERT statement. 29 binds per row keeps this under the 65535 bind limit.
pub const INSERT_CHUNK_ROWS: usize = 1000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("schema migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Destination of synchronization. Every call acquires and releases its own connection.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Batched insert that silently skips rows colliding on `Order ID`. Returns rows written.
    async fn insert_ignoring_duplicates(&self, rows: &[OrderParams]) -> Result<u64, StoreError>;

    async fn fetch_all(&self) -> Result<Vec<OrderRecord>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Unconditional delete of every row. Returns rows deleted.
    async fn delete_all(&self) -> Result<u64, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgOrderStore {
    database_url: String,
}

impl PgOrderStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    async fn connect(&self) -> Result<PgConnection, StoreError> {
        PgConnection::connect(&self.database_url)
            .await
            .map_err(StoreError::Connect)
    }

    /// Apply `migrations/` to the target database.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let mut conn = self.connect().await?;
        let result = sqlx::migrate!("../../migrations")
            .run(&mut conn)
            .await
            .map_err(StoreError::from);
        release(conn).await;
        result
    }

    async fn insert_batch(conn: &mut PgConnection, rows: &[OrderParams]) -> Result<u64, StoreError> {
        let mut tx = conn.begin().await?;
        let mut inserted = 0u64;
        for mut builder in insert_statements(rows) {
            let result = builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn select_all(conn: &mut PgConnection) -> Result<Vec<OrderRecord>, StoreError> {
        let select_list = OrderColumn::ALL
            .iter()
            .map(|c| {
                let cast = match c.kind() {
                    ColumnKind::Text => "text",
                    ColumnKind::Number => "float8",
                    ColumnKind::Timestamp => "timestamp",
                };
                format!("{}::{cast}", quote_ident(c.header()))
            })
            .collect::<Vec<_>>()
            .join(", ");
        let rows = sqlx::query(&format!("SELECT {select_list} FROM {ORDERS_TABLE} ORDER BY id"))
            .fetch_all(&mut *conn)
            .await?;
        rows.iter().map(record_from_row).collect()
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert_ignoring_duplicates(&self, rows: &[OrderParams]) -> Result<u64, StoreError> {
        let mut conn = self.connect().await?;
        let result = Self::insert_batch(&mut conn, rows).await;
        release(conn).await;
        result
    }

    async fn fetch_all(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let mut conn = self.connect().await?;
        let result = Self::select_all(&mut conn).await;
        release(conn).await;
        result
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let mut conn = self.connect().await?;
        let result = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {ORDERS_TABLE}"))
            .fetch_one(&mut conn)
            .await
            .map(|n| n.max(0) as u64)
            .map_err(StoreError::from);
        release(conn).await;
        result
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut conn = self.connect().await?;
        let result = sqlx::query(&format!("DELETE FROM {ORDERS_TABLE}"))
            .execute(&mut conn)
            .await
            .map(|r| r.rows_affected())
            .map_err(StoreError::from);
        release(conn).await;
        result
    }
}

async fn release(conn: PgConnection) {
    if let Err(err) = conn.close().await {
        debug!(error = %err, "closing database connection");
    }
}

/// One statement per chunk of [`INSERT_CHUNK_ROWS`] rows.
fn insert_statements(rows: &[OrderParams]) -> impl Iterator<Item = QueryBuilder<'static, Postgres>> + '_ {
    rows.chunks(INSERT_CHUNK_ROWS).map(insert_statement)
}

/// Multi-row insert over the full column list. The placed-at bind is cast from canonical text.
fn insert_statement(chunk: &[OrderParams]) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<'static, Postgres> =
        QueryBuilder::new(format!("INSERT INTO {ORDERS_TABLE} ({}) ", column_list()));
    builder.push_values(chunk, |mut b, params| {
        for value in params.iter() {
            match value {
                ParamValue::Text(v) => {
                    b.push_bind(v.clone());
                }
                ParamValue::Number(v) => {
                    b.push_bind(*v);
                }
                ParamValue::Timestamp(v) => {
                    b.push_bind(v.map(|ts| ts.to_string()))
                        .push_unseparated("::timestamp");
                }
            }
        }
    });
    builder.push(format!(
        " ON CONFLICT ({}) DO NOTHING",
        quote_ident(OrderColumn::OrderId.header())
    ));
    builder
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_list() -> String {
    OrderColumn::ALL
        .iter()
        .map(|c| quote_ident(c.header()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn record_from_row(row: &PgRow) -> Result<OrderRecord, StoreError> {
    let mut record = OrderRecord::default();
    for column in OrderColumn::ALL {
        let idx = column.index();
        let value = match column.kind() {
            ColumnKind::Text => ParamValue::Text(row.try_get::<Option<String>, _>(idx)?),
            ColumnKind::Number => ParamValue::number(row.try_get::<Option<f64>, _>(idx)?),
            ColumnKind::Timestamp => ParamValue::Timestamp(
                row.try_get::<Option<NaiveDateTime>, _>(idx)?
                    .map(CanonicalTimestamp::new),
            ),
        };
        record.set_param(column, value);
    }
    Ok(record)
}

/// In-process store with the same unique `Order ID` rule as the SQL table.
/// Null order ids never collide, matching SQL unique-constraint semantics.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    rows: Mutex<Vec<OrderRecord>>,
    connections: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<OrderRecord>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    /// Make every following call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of connection attempts made so far.
    pub fn connection_attempts(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    fn connect(&self) -> Result<(), StoreError> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            warn!("memory order store is marked unavailable");
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert_ignoring_duplicates(&self, rows: &[OrderParams]) -> Result<u64, StoreError> {
        self.connect()?;
        let mut stored = self.rows.lock().await;
        let mut staged: Vec<OrderRecord> = Vec::new();
        for params in rows {
            let record = OrderRecord::from_params(params);
            let collides = record.order_id.as_ref().is_some_and(|id| {
                stored
                    .iter()
                    .chain(staged.iter())
                    .any(|existing| existing.order_id.as_ref() == Some(id))
            });
            if !collides {
                staged.push(record);
            }
        }
        let inserted = staged.len() as u64;
        stored.extend(staged);
        Ok(inserted)
    }

    async fn fetch_all(&self) -> Result<Vec<OrderRecord>, StoreError> {
        self.connect()?;
        Ok(self.rows.lock().await.clone())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.connect()?;
        Ok(self.rows.lock().await.len() as u64)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        self.connect()?;
        let mut stored = self.rows.lock().await;
        let deleted = stored.len() as u64;
        stored.clear();
        Ok(deleted)
    }
}

/// Single-slot cache owned by its caller. An entry is served while younger than `ttl`
/// and its key matches; anything else reloads.
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    state: Mutex<Option<CacheEntry<T>>>,
}

#[derive(Debug)]
struct CacheEntry<T> {
    key: String,
    value: T,
    stored_at: Instant,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get_or_load<F, Fut>(&self, key: &str, load: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.as_ref() {
            if entry.key == key && entry.stored_at.elapsed() < self.ttl {
                return entry.value.clone();
            }
        }
        let value = load().await;
        *state = Some(CacheEntry {
            key: key.to_string(),
            value: value.clone(),
            stored_at: Instant::now(),
        });
        value
    }

    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }
}
