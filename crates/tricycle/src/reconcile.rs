//! Introspect, diff, generate, execute, record.

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use tracing::Instrument;
use tricycle_schema::Registry;
use tricycle_sql::{Lit, Script};

use crate::artifact::ArtifactWriter;
use crate::ddl::{DdlGenerator, join_fragments};
use crate::delta::SchemaDelta;
use crate::introspect::{LiveSchema, introspect};
use crate::ledger::{Ledger, Recorded};
use crate::remote::RemoteSchema;
use crate::{Error, RemoteError};

/// When a migration counts as applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyPolicy {
    /// Record the migration once execution was attempted, even if it failed.
    /// The operator is expected to run the printed script by hand.
    #[default]
    MarkAppliedOnAttempt,
    /// Record the migration only after the script ran successfully.
    MarkAppliedOnSuccess,
}

impl fmt::Display for ApplyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyPolicy::MarkAppliedOnAttempt => write!(f, "attempt"),
            ApplyPolicy::MarkAppliedOnSuccess => write!(f, "success"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown apply policy '{0}' (expected 'attempt' or 'success')")]
pub struct UnknownApplyPolicy(pub String);

impl FromStr for ApplyPolicy {
    type Err = UnknownApplyPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attempt" | "on-attempt" | "mark-applied-on-attempt" => {
                Ok(ApplyPolicy::MarkAppliedOnAttempt)
            }
            "success" | "on-success" | "mark-applied-on-success" => {
                Ok(ApplyPolicy::MarkAppliedOnSuccess)
            }
            _ => Err(UnknownApplyPolicy(s.to_string())),
        }
    }
}

/// How a plan was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No live schema was available: the full registry script.
    Bootstrap,
    /// Additive changes against an introspected schema.
    Diff,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Bootstrap => write!(f, "bootstrap"),
            Mode::Diff => write!(f, "diff"),
        }
    }
}

/// The SQL needed to bring a database in line with the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub mode: Mode,
    pub sql: String,
    pub delta: SchemaDelta,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Steps for an operator to finish a migration the tool could not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualInstructions {
    pub steps: Vec<String>,
}

impl ManualInstructions {
    fn new(name: &str, artifact: Option<&Utf8Path>, recorded: bool) -> Self {
        let mut steps = vec![
            "Open a SQL session on the target database with a role allowed to run DDL \
             (psql, or the hosting platform's SQL editor)."
                .to_string(),
        ];
        steps.push(match artifact {
            Some(path) => format!("Run the script saved at {path}."),
            None => "Run the script printed below.".to_string(),
        });
        steps.push(if recorded {
            format!("Nothing else to do: the ledger already lists '{name}'.")
        } else {
            format!(
                "Record the migration: INSERT INTO public.migrations (name) VALUES ({}) ON CONFLICT (name) DO NOTHING;",
                Lit(name)
            )
        });
        Self { steps }
    }
}

impl fmt::Display for ManualInstructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "{}. {}", i + 1, step)?;
        }
        Ok(())
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The ledger already lists the migration; nothing was executed.
    AlreadyApplied,
    /// The live schema matches the registry; nothing was executed.
    UpToDate,
    /// The script ran successfully.
    Applied,
    /// The script could not be run and must be applied by hand.
    ManualRequired(ManualInstructions),
}

/// Everything a run did, including the problems it worked around.
#[derive(Debug)]
pub struct RunReport {
    pub name: String,
    pub outcome: Outcome,
    pub plan: Option<Plan>,
    pub artifact: Option<Utf8PathBuf>,
    pub recorded: Option<Recorded>,
    /// Non-fatal errors, in the order they happened.
    pub issues: Vec<Error>,
}

impl RunReport {
    /// The generated SQL, or `""` if nothing was generated.
    pub fn sql(&self) -> &str {
        self.plan.as_ref().map(|p| p.sql.as_str()).unwrap_or("")
    }

    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Reconciles a database with a registry.
#[derive(Debug, Clone)]
pub struct Reconciler<'a> {
    registry: &'a Registry,
    policy: ApplyPolicy,
    artifacts: Option<ArtifactWriter>,
}

impl<'a> Reconciler<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            policy: ApplyPolicy::default(),
            artifacts: None,
        }
    }

    pub fn with_policy(mut self, policy: ApplyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Save every executed script as a migration file under `writer`'s directory.
    pub fn with_artifacts(mut self, writer: ArtifactWriter) -> Self {
        self.artifacts = Some(writer);
        self
    }

    pub fn policy(&self) -> ApplyPolicy {
        self.policy
    }

    /// Plan the SQL for `live`, or for an empty database when `live` is `None`.
    ///
    /// Pure: nothing is executed. Against a schema that already matches the
    /// registry the plan's SQL is empty.
    pub fn reconcile(&self, live: Option<&LiveSchema>) -> Plan {
        let ddl = DdlGenerator::new(self.registry);
        let Some(live) = live else {
            return Plan {
                mode: Mode::Bootstrap,
                sql: ddl.bootstrap_script(),
                delta: SchemaDelta::everything(self.registry),
            };
        };

        let delta = SchemaDelta::between(self.registry, live);
        let mut fragments: Vec<Script> = Vec::new();
        let mut policies: Vec<Script> = Vec::new();
        for table in self.registry.tables() {
            match live.get(&table.name) {
                None => {
                    fragments.push(ddl.create_table(table));
                    policies.push(ddl.row_level_security(table));
                }
                Some(current) => {
                    let mut script = ddl.alter_table(&table.name, &current.columns, &table.columns);
                    if let Some(indexes) = delta.indexes_to_add.get(&table.name) {
                        script.extend(ddl.create_indexes(&table.name, indexes));
                    }
                    fragments.push(script);
                }
            }
        }
        fragments.extend(policies);

        Plan {
            mode: Mode::Diff,
            sql: join_fragments(&fragments),
            delta,
        }
    }

    /// Introspect and plan without executing or recording anything.
    ///
    /// Falls back to the bootstrap plan when introspection fails.
    pub async fn preview<R: RemoteSchema>(&self, remote: &R) -> Plan {
        match introspect(remote, self.registry).await {
            Ok(live) => self.reconcile(Some(&live)),
            Err(e) => {
                let err = Error::IntrospectionUnavailable(e);
                tracing::warn!(error = %err, "showing the bootstrap script instead");
                self.reconcile(None)
            }
        }
    }

    /// Run the migration `name` once.
    ///
    /// Never fails: every problem is logged, kept in [`RunReport::issues`],
    /// and degrades the outcome instead.
    pub async fn run<R: RemoteSchema, L: Ledger>(
        &self,
        remote: &R,
        ledger: &L,
        name: &str,
    ) -> RunReport {
        let span = tracing::info_span!("migrate", migration = %name, policy = %self.policy);
        self.run_inner(remote, ledger, name).instrument(span).await
    }

    async fn run_inner<R: RemoteSchema, L: Ledger>(
        &self,
        remote: &R,
        ledger: &L,
        name: &str,
    ) -> RunReport {
        let mut report = RunReport {
            name: name.to_string(),
            outcome: Outcome::AlreadyApplied,
            plan: None,
            artifact: None,
            recorded: None,
            issues: Vec::new(),
        };

        match ledger.has_applied(name).await {
            Ok(true) => {
                tracing::info!("migration already applied");
                return report;
            }
            Ok(false) => {}
            Err(e) => {
                report.warn(Error::Ledger(e), "could not read the ledger, continuing");
            }
        }

        let live = match introspect(remote, self.registry).await {
            Ok(live) => Some(live),
            Err(e) => {
                report.warn(
                    Error::IntrospectionUnavailable(e),
                    "falling back to the bootstrap script",
                );
                None
            }
        };

        let plan = self.reconcile(live.as_ref());
        tracing::debug!(mode = %plan.mode, changes = plan.delta.change_count(), "planned");

        if plan.is_empty() {
            tracing::info!("schema already up to date");
            report.plan = Some(plan);
            report.outcome = Outcome::UpToDate;
            report.recorded = record(ledger, name, &mut report).await;
            return report;
        }

        if let Some(writer) = &self.artifacts {
            match writer.write(name, plan.mode, &plan.sql) {
                Ok(path) => report.artifact = Some(path),
                Err(e) => report.warn(e, "could not save the migration file"),
            }
        }

        let executed = remote.execute_sql(&plan.sql).await;
        report.plan = Some(plan);

        match executed {
            Ok(()) => {
                tracing::info!("migration applied");
                report.outcome = Outcome::Applied;
                report.recorded = record(ledger, name, &mut report).await;
            }
            Err(e) => {
                let rpc_missing = matches!(e, RemoteError::RpcMissing { .. });
                report.warn(
                    Error::ExecutionUnavailable(e),
                    "the script has to be run by hand",
                );
                if rpc_missing {
                    tracing::info!("install the execute_sql function to let migrations run unattended");
                }
                if self.policy == ApplyPolicy::MarkAppliedOnAttempt {
                    report.recorded = record(ledger, name, &mut report).await;
                }
                let recorded = report.recorded.is_some();
                report.outcome = Outcome::ManualRequired(ManualInstructions::new(
                    name,
                    report.artifact.as_deref(),
                    recorded,
                ));
            }
        }

        report
    }
}

impl RunReport {
    fn warn(&mut self, error: Error, message: &str) {
        tracing::warn!(error = %error, "{message}");
        self.issues.push(error);
    }
}

async fn record<L: Ledger>(ledger: &L, name: &str, report: &mut RunReport) -> Option<Recorded> {
    match ledger.record_applied(name, Utc::now()).await {
        Ok(Recorded::Inserted) => {
            tracing::info!("recorded in the ledger");
            Some(Recorded::Inserted)
        }
        Ok(Recorded::AlreadyPresent) => {
            report.warn(
                Error::LedgerConflict {
                    name: name.to_string(),
                },
                "ledger row already present",
            );
            Some(Recorded::AlreadyPresent)
        }
        Err(e) => {
            report.warn(Error::Ledger(e), "could not record the migration");
            None
        }
    }
}
