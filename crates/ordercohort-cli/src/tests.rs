use super::*;
use crate::cohort::OutputFormat;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["ordercohort", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["ordercohort", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["ordercohort"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_cohort_nth_defaults() {
    let cli = Cli::try_parse_from(["ordercohort", "cohort", "nth", "--n", "2"]).unwrap();
    let Some(Commands::Cohort {
        command:
            CohortCommands::Nth {
                n,
                year,
                product,
                input,
                unranked,
                format,
                summary,
            },
    }) = cli.command
    else {
        panic!("expected cohort nth");
    };

    assert_eq!(n.get(), 2);
    assert!(year.is_none());
    assert!(product.is_none());
    assert!(input.is_none());
    assert!(!unranked);
    assert_eq!(format, OutputFormat::Table);
    assert!(!summary);
}

#[test]
fn parses_cohort_nth_with_db_filters() {
    let cli = Cli::try_parse_from([
        "ordercohort",
        "cohort",
        "nth",
        "--n",
        "3",
        "--year",
        "2025",
        "--product",
        "Glow Serum",
        "--format",
        "json",
        "--summary",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Cohort {
            command: CohortCommands::Nth {
                year: Some(2025),
                product: Some(ref p),
                format: OutputFormat::Json,
                summary: true,
                ..
            }
        }) if p == "Glow Serum"
    ));
}

#[test]
fn parses_cohort_nth_from_unranked_file() {
    let cli = Cli::try_parse_from([
        "ordercohort",
        "cohort",
        "nth",
        "--n",
        "2",
        "--input",
        "orders.json",
        "--unranked",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Cohort {
            command: CohortCommands::Nth {
                input: Some(ref path),
                unranked: true,
                ..
            }
        }) if path.as_os_str() == "orders.json"
    ));
}

#[test]
fn cohort_nth_requires_n() {
    assert!(Cli::try_parse_from(["ordercohort", "cohort", "nth"]).is_err());
}

#[test]
fn cohort_nth_rejects_invalid_order_index() {
    for n in ["1", "0", "1.5", "abc"] {
        assert!(
            Cli::try_parse_from(["ordercohort", "cohort", "nth", "--n", n]).is_err(),
            "n={n} should be rejected"
        );
    }
}

#[test]
fn input_conflicts_with_db_filters() {
    let with_year = Cli::try_parse_from([
        "ordercohort",
        "cohort",
        "nth",
        "--n",
        "2",
        "--input",
        "orders.json",
        "--year",
        "2025",
    ]);
    assert!(with_year.is_err());

    let with_product = Cli::try_parse_from([
        "ordercohort",
        "cohort",
        "nth",
        "--n",
        "2",
        "--input",
        "orders.json",
        "--product",
        "serum",
    ]);
    assert!(with_product.is_err());
}

#[test]
fn unranked_requires_input() {
    assert!(
        Cli::try_parse_from(["ordercohort", "cohort", "nth", "--n", "2", "--unranked"]).is_err()
    );
}

#[test]
fn run_cohort_nth_handles_empty_orders() {
    let n = ordercohort_core::OrderIndex::new(2).expect("n");
    cohort::run_cohort_nth(&[], n, OutputFormat::Json, true, None).expect("empty input is fine");
    cohort::run_cohort_nth(&[], n, OutputFormat::Table, false, None).expect("empty input is fine");
}
