use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use schemashift_core::naming::NamingConvention;
use schemashift_core::report::JsonFileReportSink;
use schemashift_core::repository::ScriptRepository;
use schemashift_core::types::Version;
use schemashift_db::target::PgMigrationTarget;
use schemashift_engine::Orchestrator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use config::ToolConfig;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Versioned SQL schema migrations for PostgreSQL", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply all pending migrations
    Migrate,
    /// Roll back to a target version; the target itself stays applied
    Rollback {
        #[clap(short = 'v', long = "version", value_name = "VERSION")]
        target: String,
    },
    /// Show the current version and the applied migrations
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "schemashift=info,schemashift_core=info,schemashift_engine=info,schemashift_db=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the requested operation took place.
async fn run(command: Command) -> anyhow::Result<bool> {
    let config = ToolConfig::from_env()?;

    let pool = schemashift_db::create_pool(&config.database_url, config.max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::debug!("Database connection pool created");

    schemashift_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    schemashift_db::bootstrap(&pool)
        .await
        .context("Failed to create bookkeeping tables")?;

    let repository = ScriptRepository::new(&config.migrations_path, &config.rollbacks_path)
        .with_naming(NamingConvention::with_prefix(config.script_prefix.as_str()));
    tracing::debug!(
        migrations = %repository.migrations_dir().display(),
        rollbacks = %repository.rollbacks_dir().display(),
        prefix = %config.script_prefix,
        "Script directories"
    );
    let mut orchestrator = Orchestrator::new(
        repository,
        PgMigrationTarget::new(pool),
        JsonFileReportSink::new(&config.reports_path),
        config.lock_owner(),
    );

    let (action, result) = match command {
        Command::Migrate => ("migration", orchestrator.migrate().await),
        Command::Rollback { target } => (
            "rollback",
            orchestrator.rollback(&Version::new(target)).await,
        ),
        Command::Status => {
            let status = orchestrator
                .status()
                .await
                .context("Error fetching status")?;
            print!("{}", commands::render_status(&status));
            return Ok(true);
        }
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(version) = e.failed_version() {
                tracing::error!(%version, "Script failed, no changes were committed");
            }
            return Err(anyhow::Error::new(e).context(format!("Error during {action}")));
        }
    };

    let summary = commands::describe_outcome(&outcome);
    if commands::succeeded(&outcome) {
        tracing::info!("{summary}");
        Ok(true)
    } else {
        tracing::error!("{summary}");
        Ok(false)
    }
}
