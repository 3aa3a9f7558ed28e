//! strata-sync CLI
//!
//! Command-line tool for synchronizing model schemas against their stores.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use strata_model::definition::MigrateMode;
use strata_sync::config::AppConfig;
use strata_sync::dialect::{SqlDialect, SqliteDialect};
use strata_sync::orchestrator::MigrationOrchestrator;
use strata_sync::table::TableBuilder;
use strata_sync::typemap::TypeMapper;

/// Declarative schema synchronization for entity models.
#[derive(Parser)]
#[command(name = "strata-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (JSON).
    #[arg(short, long, env = "STRATA_CONFIG", default_value = "strata.json")]
    config: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize every model against its store.
    Sync {
        /// Override the configured migrate mode (none, drop, alter).
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Print the SQL each table build would execute, without executing.
    Plan {
        /// Only plan the named model.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Validate the configuration and model definitions.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Check => {
            config.validate()?;
            let models = config.model_set()?;
            info!(
                stores = config.stores.len(),
                models = models.len(),
                "configuration is valid"
            );
        }

        Commands::Plan { model } => {
            let models = config.model_set()?;
            let types = TypeMapper::new();
            let builder = TableBuilder::new(&types, &models);
            let dialect = SqliteDialect::new();

            let mut matched = 0;
            for definition in models.iter() {
                if let Some(ref only) = model {
                    if !definition.identity.eq_ignore_ascii_case(only) {
                        continue;
                    }
                }
                matched += 1;

                let build = builder.build(definition);
                for failure in &build.report.failures {
                    warn!(
                        model = %definition.identity,
                        attribute = %failure.attribute,
                        error = %failure.error,
                        "column would be skipped"
                    );
                }

                println!("-- {} ({})", definition.name, build.plan.table);
                for sql in dialect.create_table_sql(&build.plan) {
                    println!("{sql};");
                }
                for join in &build.join_tables {
                    println!("-- join table {}", join.table);
                    for sql in dialect.create_table_sql(join) {
                        println!("{sql};");
                    }
                }
                println!();
            }

            if matched == 0 {
                warn!("no models matched");
            }
        }

        Commands::Sync { mode } => {
            config.validate()?;
            let models = config.model_set()?;
            let global = match mode.as_deref() {
                Some(raw) => raw.parse::<MigrateMode>()?,
                None => config.models.migrate,
            };
            let connections = config.connect_all().await?;

            let result = MigrationOrchestrator::new(&connections, &models)
                .with_default_store(config.models.default_store.as_deref())
                .run(global)
                .await;

            if !result.is_success() {
                error!(
                    failed = result.failures.len(),
                    completed = result.completed.len(),
                    skipped = result.skipped.len(),
                    "synchronization finished with failures"
                );
                return Ok(ExitCode::FAILURE);
            }
            info!(
                completed = result.completed.len(),
                skipped = result.skipped.len(),
                "synchronization finished"
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}
