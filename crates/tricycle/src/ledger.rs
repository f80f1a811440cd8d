//! The migration ledger: one row per named migration, written once.
//!
//! The `migrations` table is created lazily the first time any ledger query
//! finds it missing.

use chrono::{DateTime, Utc};

use crate::{RemoteError, TracedPool};

/// DDL for the ledger table.
pub const CREATE_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS public.migrations (id SERIAL PRIMARY KEY, name TEXT NOT NULL UNIQUE, applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW())";

const HAS_APPLIED: &str = "SELECT EXISTS (SELECT 1 FROM public.migrations WHERE name = $1)";
const RECORD_APPLIED: &str =
    "INSERT INTO public.migrations (name, applied_at) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING";
const LIST_APPLIED: &str = "SELECT id, name, applied_at FROM public.migrations ORDER BY applied_at, id";

/// A row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub id: i32,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// Outcome of [`Ledger::record_applied`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// A new row was written.
    Inserted,
    /// The name was already recorded; nothing changed.
    AlreadyPresent,
}

/// Bookkeeping of which named migrations have run.
#[allow(async_fn_in_trait)]
pub trait Ledger {
    async fn has_applied(&self, name: &str) -> Result<bool, RemoteError>;

    /// Record `name` as applied at `at`. Recording a name twice is not an error.
    async fn record_applied(&self, name: &str, at: DateTime<Utc>)
    -> Result<Recorded, RemoteError>;

    /// All recorded migrations, oldest first.
    async fn list_applied(&self) -> Result<Vec<MigrationRecord>, RemoteError>;
}

/// The ledger stored in the target database's `migrations` table.
#[derive(Clone)]
pub struct PgLedger {
    pool: TracedPool,
}

impl PgLedger {
    pub fn new(pool: TracedPool) -> Self {
        Self { pool }
    }

    /// Create the ledger table if it does not exist.
    pub async fn ensure_table(&self) -> Result<(), RemoteError> {
        self.pool.execute(CREATE_MIGRATIONS_TABLE, &[]).await?;
        Ok(())
    }

    /// Run `op`; if it fails because the ledger table is missing, create the
    /// table and run it once more.
    async fn with_table<T, F, Fut>(&self, op: F) -> Result<T, RemoteError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        match op().await {
            Err(e) if e.is_undefined_table() => {
                tracing::info!("migrations table missing, creating it");
                self.ensure_table().await?;
                op().await
            }
            other => other,
        }
    }
}

impl Ledger for PgLedger {
    async fn has_applied(&self, name: &str) -> Result<bool, RemoteError> {
        let row = self
            .with_table(move || async move { self.pool.query_one(HAS_APPLIED, &[&name]).await })
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn record_applied(
        &self,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<Recorded, RemoteError> {
        let inserted = self
            .with_table(move || async move {
                self.pool.execute(RECORD_APPLIED, &[&name, &at]).await
            })
            .await;

        match inserted {
            Ok(0) => Ok(Recorded::AlreadyPresent),
            Ok(_) => Ok(Recorded::Inserted),
            // A concurrent writer won between the conflict check and the insert.
            Err(e) if e.is_unique_violation() => Ok(Recorded::AlreadyPresent),
            Err(e) => Err(e),
        }
    }

    async fn list_applied(&self) -> Result<Vec<MigrationRecord>, RemoteError> {
        let rows = self
            .with_table(move || async move { self.pool.query(LIST_APPLIED, &[]).await })
            .await?;
        rows.iter()
            .map(|row| -> Result<MigrationRecord, RemoteError> {
                Ok(MigrationRecord {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    applied_at: row.try_get("applied_at")?,
                })
            })
            .collect()
    }
}
