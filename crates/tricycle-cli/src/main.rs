use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;
use tricycle::{
    ApplyPolicy, ArtifactWriter, DdlGenerator, Ledger, Outcome, PgLedger, PgRemote, Reconciler,
    RemoteError, TracedPool,
};

mod config;
mod output;

use config::{Config, ConfigError};

/// Idempotent schema reconciliation for the Tricycle CRM database.
#[derive(Parser, Debug)]
#[command(name = "tricycle", version, about, long_about = None)]
struct Cli {
    /// Database connection URL (defaults to DATABASE_URL, then the config file)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Configuration file (defaults to .config/tricycle.toml in this or a parent directory)
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// When a migration counts as applied: `attempt` or `success`
    #[arg(long, global = true)]
    policy: Option<ApplyPolicy>,

    /// Do not write migration files
    #[arg(long, global = true)]
    no_artifacts: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the table registry
    Schema,
    /// Print the full bootstrap script (no database needed)
    Sql,
    /// Compare the registry to the database and print the SQL that would run
    Diff,
    /// Reconcile the database and record the migration under NAME
    Migrate {
        /// Migration name, e.g. "20240101_init"
        name: String,
    },
    /// List recorded migrations
    Status,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    MalformedSpec(#[from] tricycle::MalformedSpec),

    #[error(transparent)]
    Tricycle(#[from] tricycle::Error),

    #[error("migration ledger unavailable: {0}")]
    Ledger(#[from] RemoteError),

    #[error("no database URL: pass --database-url, set DATABASE_URL, or add database_url to .config/tricycle.toml")]
    MissingDatabaseUrl,

    #[error("current directory is not valid UTF-8")]
    NonUtf8Cwd,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Before the filter is built, so RUST_LOG can come from .env. A missing .env is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tricycle=info")),
        )
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let config = load_config(cli.config.as_deref())?;
    let registry = tricycle_schema::crm()?;

    match &cli.command {
        Commands::Schema => {
            output::print_schema(&registry);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Sql => {
            println!("{}", DdlGenerator::new(&registry).bootstrap_script());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Diff => {
            let pool = connect(&cli, &config)?;
            let remote = PgRemote::new(pool).with_rpc_schema(config.rpc_schema.clone());
            let plan = Reconciler::new(&registry).preview(&remote).await;
            output::print_plan(&plan);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Migrate { name } => {
            let pool = connect(&cli, &config)?;
            let remote = PgRemote::new(pool.clone()).with_rpc_schema(config.rpc_schema.clone());
            let ledger = PgLedger::new(pool);

            let policy = match cli.policy {
                Some(policy) => policy,
                None => config.apply_policy()?,
            };
            let mut reconciler = Reconciler::new(&registry).with_policy(policy);
            if config.write_artifacts && !cli.no_artifacts {
                reconciler =
                    reconciler.with_artifacts(ArtifactWriter::new(config.migrations_dir.clone()));
            }

            let report = reconciler.run(&remote, &ledger, name).await;
            output::print_report(&report);
            Ok(match report.outcome {
                Outcome::ManualRequired(_) => ExitCode::from(2),
                _ => ExitCode::SUCCESS,
            })
        }
        Commands::Status => {
            let pool = connect(&cli, &config)?;
            let records = PgLedger::new(pool).list_applied().await?;
            output::print_status(&records);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load `--config`, or search for `.config/tricycle.toml`; defaults if there is none.
fn load_config(explicit: Option<&camino::Utf8Path>) -> Result<Config, CliError> {
    if let Some(path) = explicit {
        return Ok(config::load_file(path)?);
    }

    let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
        path: Utf8PathBuf::from("."),
        source,
    })?;
    let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|_| CliError::NonUtf8Cwd)?;
    match config::load_from(&cwd) {
        Ok((config, path)) => {
            tracing::debug!(%path, "loaded config");
            Ok(config)
        }
        Err(ConfigError::NotFound) => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}

/// `--database-url`, then `DATABASE_URL`, then the config file.
fn database_url(cli: &Cli, config: &Config) -> Option<String> {
    cli.database_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .or_else(|| config.database_url.clone())
}

fn connect(cli: &Cli, config: &Config) -> Result<TracedPool, CliError> {
    let url = database_url(cli, config).ok_or(CliError::MissingDatabaseUrl)?;
    tracing::info!(database = %output::mask_password(&url), "connecting");
    Ok(TracedPool::connect(&url, config.pool_size)?)
}
