use thiserror::Error;
use tokio_postgres::error::SqlState;

/// A failed call across the remote boundary (RPCs and ledger queries).
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server-side function is not installed.
    #[error("function {function}() does not exist on the server")]
    RpcMissing { function: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
}

impl RemoteError {
    /// Reclassify an error raised while calling the server function `function`.
    pub(crate) fn for_rpc(self, function: &str) -> Self {
        match self {
            RemoteError::Postgres(e) if e.code() == Some(&SqlState::UNDEFINED_FUNCTION) => {
                RemoteError::RpcMissing {
                    function: function.to_string(),
                }
            }
            other => other,
        }
    }

    /// Whether the error is Postgres' "relation does not exist".
    pub fn is_undefined_table(&self) -> bool {
        matches!(self, RemoteError::Postgres(e) if e.code() == Some(&SqlState::UNDEFINED_TABLE))
    }

    /// Whether the error is a unique constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, RemoteError::Postgres(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION))
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Reading the live schema failed; reconciliation falls back to bootstrap.
    #[error("schema introspection unavailable: {0}")]
    IntrospectionUnavailable(#[source] RemoteError),

    /// Applying SQL failed; the script has to be run by hand.
    #[error("SQL execution unavailable: {0}")]
    ExecutionUnavailable(#[source] RemoteError),

    /// The ledger already holds a row with this name.
    #[error("migration {name} is already recorded in the ledger")]
    LedgerConflict { name: String },

    #[error("migration ledger unavailable: {0}")]
    Ledger(#[source] RemoteError),

    #[error(transparent)]
    MalformedSpec(#[from] tricycle_schema::MalformedSpec),

    #[error("could not write migration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid database url: {0}")]
    DatabaseUrl(#[source] tokio_postgres::Error),

    #[error("could not build connection pool: {0}")]
    PoolBuild(#[from] deadpool_postgres::BuildError),
}
