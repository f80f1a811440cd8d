//! Idempotent, additive schema reconciliation for the Tricycle CRM database.
//!
//! This crate provides:
//! - DDL generation for the tables of a [`Registry`]
//! - Introspection of the live schema through a small set of server-side
//!   functions (see [`remote`])
//! - An additive diff between the two (missing tables, columns, indexes)
//! - A ledger of named migrations, each applied at most once
//!
//! # Reconciling
//!
//! Nothing is ever dropped or altered in place. Every generated statement is
//! guarded so a script can be replayed against a database that already ran it.
//!
//! ```ignore
//! let registry = tricycle_schema::crm()?;
//! let pool = TracedPool::connect(&database_url, 4)?;
//! let remote = PgRemote::new(pool.clone());
//! let ledger = PgLedger::new(pool);
//!
//! let report = Reconciler::new(&registry)
//!     .run(&remote, &ledger, "20240101_init")
//!     .await;
//! println!("{}", report.sql());
//! ```
//!
//! [`Reconciler::run`] never fails. When introspection is unavailable it plans
//! the full bootstrap script; when execution is unavailable it returns the SQL
//! and the steps to apply it by hand.

pub mod artifact;
pub mod ddl;
pub mod delta;
mod error;
pub mod introspect;
pub mod ledger;
pub mod reconcile;
pub mod remote;
mod traced;

pub use artifact::ArtifactWriter;
pub use ddl::DdlGenerator;
pub use delta::SchemaDelta;
pub use error::{Error, RemoteError};
pub use introspect::{LiveSchema, LiveTable, introspect};
pub use ledger::{Ledger, MigrationRecord, PgLedger, Recorded};
pub use reconcile::{
    ApplyPolicy, ManualInstructions, Mode, Outcome, Plan, Reconciler, RunReport,
    UnknownApplyPolicy,
};
pub use remote::{ColumnRow, IndexRow, PgRemote, RemoteSchema, TableRow};
pub use traced::{DEFAULT_CALL_TIMEOUT, TracedPool};

pub use tricycle_schema::{MalformedSpec, Registry};

/// Result type for tricycle operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
