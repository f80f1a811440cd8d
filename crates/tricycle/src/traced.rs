//! Traced database connection pool.
//!
//! Wraps a `deadpool_postgres::Pool` and logs every statement via tracing.
//! Each call checks out a connection, runs under the pool's call timeout,
//! and returns it. The checkout counts against the same timeout: it is where
//! a fresh connection does its TCP connect and startup handshake.

use std::ops::Deref;
use std::time::Duration;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};
use tracing::Instrument;

use crate::{Error, RemoteError};

/// Default time allowed for a single statement.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// A traced connection pool.
///
/// # Example
///
/// ```ignore
/// let pool = TracedPool::connect("postgres://localhost/tricycle", 4)?;
/// let rows = pool.query("SELECT name FROM public.migrations", &[]).await?;
/// ```
#[derive(Clone)]
pub struct TracedPool {
    inner: Pool,
    timeout: Duration,
}

impl TracedPool {
    /// Create a new traced pool wrapper.
    pub fn new(pool: Pool) -> Self {
        Self {
            inner: pool,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Build a pool of at most `max_size` connections to `database_url`.
    ///
    /// No connection is opened until the first statement runs.
    pub fn connect(database_url: &str, max_size: usize) -> Result<Self, Error> {
        let mut pg_config: tokio_postgres::Config =
            database_url.parse().map_err(Error::DatabaseUrl)?;
        if pg_config.get_connect_timeout().is_none() {
            pg_config.connect_timeout(DEFAULT_CALL_TIMEOUT);
        }
        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager).max_size(max_size).build()?;
        Ok(Self::new(pool))
    }

    /// Set the time allowed for a single statement.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute a statement, returning the number of rows affected.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, RemoteError> {
        let span = tracing::debug_span!(
            "db.execute",
            sql = %sql,
            params = params.len(),
            affected = tracing::field::Empty,
        );
        let conn = self.checkout().instrument(span.clone()).await?;
        let client: &tokio_postgres::Client = conn.deref();
        let affected = self
            .bounded("execute", client.execute(sql, params))
            .instrument(span.clone())
            .await??;
        span.record("affected", affected);
        Ok(affected)
    }

    /// Execute a query, returning all rows.
    pub async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, RemoteError> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            params = params.len(),
            rows = tracing::field::Empty,
        );
        let conn = self.checkout().instrument(span.clone()).await?;
        let client: &tokio_postgres::Client = conn.deref();
        let rows = self
            .bounded("query", client.query(sql, params))
            .instrument(span.clone())
            .await??;
        span.record("rows", rows.len());
        Ok(rows)
    }

    /// Execute a query, returning exactly one row.
    pub async fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Row, RemoteError> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            params = params.len(),
            rows = 1u64,
        );
        let conn = self.checkout().instrument(span.clone()).await?;
        let client: &tokio_postgres::Client = conn.deref();
        let row = self
            .bounded("query", client.query_one(sql, params))
            .instrument(span)
            .await??;
        Ok(row)
    }

    /// Get the inner pool (for cases where you need the raw pool).
    pub fn inner(&self) -> &Pool {
        &self.inner
    }

    async fn checkout(&self) -> Result<deadpool_postgres::Object, RemoteError> {
        tokio::time::timeout(self.timeout, self.inner.get())
            .await
            .map_err(|_| self.timed_out("connect"))?
            .map_err(RemoteError::from)
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T, tokio_postgres::Error>>,
    ) -> Result<Result<T, tokio_postgres::Error>, RemoteError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| self.timed_out(operation))
    }

    fn timed_out(&self, operation: &str) -> RemoteError {
        RemoteError::Timeout {
            operation: operation.to_string(),
            seconds: self.timeout.as_secs(),
        }
    }
}
