mod cohort;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cohort::CohortCommands;

#[derive(Debug, Parser)]
#[command(name = "ordercohort")]
#[command(about = "N-th order cohort retention reports")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Cohort retention reports
    Cohort {
        #[command(subcommand)]
        command: CohortCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // Logs go to stderr so `--format json` output stays machine-readable.
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Db { command }) => run_db(command).await,
        Some(Commands::Cohort { command }) => cohort::run(command).await,
        None => {
            println!("ordercohort: pass a subcommand, see --help");
            Ok(())
        }
    }
}

async fn run_db(command: DbCommands) -> anyhow::Result<()> {
    let config = ordercohort_core::load_app_config()?;
    let pool = connect(&config).await?;
    match command {
        DbCommands::Ping => {
            ordercohort_db::ping(&pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = ordercohort_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
    }
    Ok(())
}

/// Open a pool sized by the loaded config.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub(crate) async fn connect(
    config: &ordercohort_core::AppConfig,
) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = ordercohort_db::PoolConfig::from_app_config(config);
    let pool = ordercohort_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests;
