//! `cohort` command handlers.
//!
//! Orders come either from Postgres (ranked in SQL) or from a JSON file on
//! disk, so reports can be produced without a database.

mod input;
mod report;

use std::path::{Path, PathBuf};

use clap::{Subcommand, ValueEnum};
use ordercohort_core::{calculate_for_index, summarize_cohorts, OrderIndex, RankedOrder};
use ordercohort_db::RankedOrderScope;

pub(crate) use input::load_orders_from_file;
pub(crate) use report::{render_json, render_table};

/// Sub-commands available under `cohort`.
#[derive(Debug, Subcommand)]
pub enum CohortCommands {
    /// Retention of the N-th order per first-purchase month
    Nth {
        /// Which order to measure (2 = second order)
        #[arg(long)]
        n: OrderIndex,
        /// Only rank orders placed in this calendar year
        #[arg(long)]
        year: Option<i32>,
        /// Only rank orders containing a product whose title matches
        #[arg(long)]
        product: Option<String>,
        /// Read orders from a JSON file instead of the database
        #[arg(long, conflicts_with_all = ["year", "product"])]
        input: Option<PathBuf>,
        /// The input file holds unranked orders; rank them in memory
        #[arg(long, requires = "input")]
        unranked: bool,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Append the grand-total row and per-cohort weights
        #[arg(long)]
        summary: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub(crate) async fn run(command: CohortCommands) -> anyhow::Result<()> {
    match command {
        CohortCommands::Nth {
            n,
            year,
            product,
            input,
            unranked,
            format,
            summary,
        } => {
            let orders = match input.as_deref() {
                Some(path) => load_orders_from_file(path, unranked)?,
                None => fetch_orders(year, product.as_deref()).await?,
            };
            run_cohort_nth(&orders, n, format, summary, input.as_deref())
        }
    }
}

async fn fetch_orders(
    year: Option<i32>,
    product: Option<&str>,
) -> anyhow::Result<Vec<RankedOrder>> {
    let config = ordercohort_core::load_app_config()?;
    let pool = crate::connect(&config).await?;
    let scope = RankedOrderScope {
        product: product.filter(|p| !p.trim().is_empty()),
        year,
        timezone: &config.reporting_timezone,
    };
    let orders = ordercohort_db::fetch_ranked_orders(&pool, &scope).await?;
    tracing::info!(orders = orders.len(), ?year, ?product, "fetched ranked orders");
    Ok(orders)
}

/// Compute the cohort table for `n` and print it in the requested format.
///
/// # Errors
///
/// Returns an error if the orders break the ranked-order contract or the
/// JSON output cannot be serialized.
pub(crate) fn run_cohort_nth(
    orders: &[RankedOrder],
    n: OrderIndex,
    format: OutputFormat,
    with_summary: bool,
    source: Option<&Path>,
) -> anyhow::Result<()> {
    let cohorts = calculate_for_index(orders, n)?;
    let summary = with_summary.then(|| summarize_cohorts(&cohorts));

    match format {
        OutputFormat::Json => println!("{}", render_json(n, &cohorts, summary.as_ref())?),
        OutputFormat::Table => {
            if cohorts.is_empty() {
                let origin = source.map_or_else(
                    || "the database".to_string(),
                    |p| p.display().to_string(),
                );
                println!(
                    "no cohorts found; no customer in {origin} has {} order(s)",
                    n.get() - 1
                );
                return Ok(());
            }
            print!("{}", render_table(n, &cohorts, summary.as_ref()));
        }
    }

    Ok(())
}
