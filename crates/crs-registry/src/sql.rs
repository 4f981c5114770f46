//! Minimal synchronous SQL access used by the store-backed factories.
//!
//! Factories talk to a `SqlStore` trait object, never to a concrete
//! driver, so tests can swap in failing or canned stores. The shipped
//! implementation is a small rusqlite connection pool with a bounded
//! wait: a caller that cannot get a connection within the configured
//! window receives `FactoryError::Timeout` instead of blocking forever.

use std::path::Path;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rusqlite::Connection;
use tracing::warn;

use crs_common::FactoryError;

/// A single column value from a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

/// One result row, columns in select order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub columns: Vec<SqlValue>,
}

impl Row {
    pub fn text(&self, index: usize) -> Option<&str> {
        self.columns.get(index).and_then(SqlValue::as_text)
    }
}

/// Synchronous query interface over a relational store.
pub trait SqlStore: Send + Sync {
    /// Run a parameterized query. Parameters bind positionally to `?`
    /// placeholders. Returns all matching rows.
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, FactoryError>;
}

struct PoolState {
    idle: Vec<Connection>,
    /// Connections currently handed out. `idle.len() + outstanding`
    /// never exceeds the pool size.
    outstanding: usize,
}

/// Fixed-size rusqlite connection pool with a bounded acquire wait.
pub struct SqlitePool {
    state: Mutex<PoolState>,
    available: Condvar,
    acquire_timeout: Duration,
    name: String,
}

impl SqlitePool {
    pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Open `size` connections against the database at `path`.
    pub fn open(path: impl AsRef<Path>, size: usize) -> Result<Self, FactoryError> {
        let path = path.as_ref();
        let mut idle = Vec::with_capacity(size);
        for _ in 0..size.max(1) {
            let conn = Connection::open(path)
                .map_err(|e| FactoryError::Store(format!("open {}: {e}", path.display())))?;
            idle.push(conn);
        }
        Ok(Self {
            state: Mutex::new(PoolState {
                idle,
                outstanding: 0,
            }),
            available: Condvar::new(),
            acquire_timeout: Self::DEFAULT_ACQUIRE_TIMEOUT,
            name: path.display().to_string(),
        })
    }

    /// In-memory database with a single shared connection, for tests and
    /// ephemeral stores.
    pub fn open_in_memory() -> Result<Self, FactoryError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| FactoryError::Store(format!("open in-memory: {e}")))?;
        Ok(Self {
            state: Mutex::new(PoolState {
                idle: vec![conn],
                outstanding: 0,
            }),
            available: Condvar::new(),
            acquire_timeout: Self::DEFAULT_ACQUIRE_TIMEOUT,
            name: ":memory:".to_string(),
        })
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Run `f` with a pooled connection, returning it afterwards even on
    /// error.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, FactoryError>,
    ) -> Result<T, FactoryError> {
        let conn = self.acquire()?;
        let result = f(&conn);
        self.release(conn);
        result
    }

    fn acquire(&self) -> Result<Connection, FactoryError> {
        let deadline = Instant::now() + self.acquire_timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(conn) = state.idle.pop() {
                state.outstanding += 1;
                return Ok(conn);
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(pool = %self.name, "connection acquire timed out");
                return Err(FactoryError::Timeout {
                    resource: format!("sqlite pool {}", self.name),
                    waited_ms: self.acquire_timeout.as_millis() as u64,
                });
            }
            if self
                .available
                .wait_until(&mut state, deadline)
                .timed_out()
                && state.idle.is_empty()
            {
                warn!(pool = %self.name, "connection acquire timed out");
                return Err(FactoryError::Timeout {
                    resource: format!("sqlite pool {}", self.name),
                    waited_ms: self.acquire_timeout.as_millis() as u64,
                });
            }
        }
    }

    fn release(&self, conn: Connection) {
        let mut state = self.state.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
        state.idle.push(conn);
        self.available.notify_one();
    }

    /// Execute a statement outside the query path, for setup and
    /// migrations.
    pub fn execute(&self, sql: &str) -> Result<(), FactoryError> {
        self.with_connection(|conn| {
            conn.execute_batch(sql)
                .map_err(|e| FactoryError::Store(format!("execute: {e}")))
        })
    }
}

impl SqlStore for SqlitePool {
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, FactoryError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| FactoryError::Store(format!("prepare: {e}")))?;
            for (i, value) in params.iter().enumerate() {
                let index = i + 1;
                let bound = match value {
                    SqlValue::Null => stmt.raw_bind_parameter(index, rusqlite::types::Null),
                    SqlValue::Integer(n) => stmt.raw_bind_parameter(index, n),
                    SqlValue::Real(x) => stmt.raw_bind_parameter(index, x),
                    SqlValue::Text(s) => stmt.raw_bind_parameter(index, s),
                };
                bound.map_err(|e| FactoryError::Store(format!("bind parameter {index}: {e}")))?;
            }
            let column_count = stmt.column_count();
            let mut rows = stmt.raw_query();
            let mut out = Vec::new();
            loop {
                let row = rows
                    .next()
                    .map_err(|e| FactoryError::Store(format!("fetch row: {e}")))?;
                let Some(row) = row else { break };
                let mut columns = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    let value = row
                        .get_ref(i)
                        .map_err(|e| FactoryError::Store(format!("read column {i}: {e}")))?;
                    columns.push(match value {
                        rusqlite::types::ValueRef::Null => SqlValue::Null,
                        rusqlite::types::ValueRef::Integer(n) => SqlValue::Integer(n),
                        rusqlite::types::ValueRef::Real(x) => SqlValue::Real(x),
                        rusqlite::types::ValueRef::Text(t) => {
                            SqlValue::Text(String::from_utf8_lossy(t).into_owned())
                        }
                        rusqlite::types::ValueRef::Blob(_) => SqlValue::Null,
                    });
                }
                out.push(Row { columns });
            }
            Ok(out)
        })
    }
}
