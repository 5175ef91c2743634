use anyhow::Context;
use bookswap_config::{load as load_config, AppConfig};
use bookswap_database::run_migrations;
use bookswap_queries::{run_logged, Example};
use bookswap_runtime::{shutdown_signal, telemetry, BookswapServices};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "bookswap")]
#[command(about = "Bookswap query playground (runs the top-5 report by default)")]
struct Cli {
    /// Seed sample data before running the command
    #[arg(long, global = true)]
    seed: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Apply pending migrations and exit
    Migrate,
    /// Seed the database with sample data
    Seed,
    /// List every example with its level
    List,
    /// Run the named examples in order
    Run {
        #[arg(required = true, value_name = "EXAMPLE")]
        examples: Vec<Example>,
    },
    /// Run every example, level by level
    RunAll,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::List) = cli.command {
        list_examples();
        return Ok(());
    }

    telemetry::init_tracing().context("failed to initialise tracing")?;

    let mut config = load_config().context("failed to load configuration")?;
    config.seed.on_startup |= cli.seed || cli.command == Some(Commands::Seed);

    let services = BookswapServices::initialise(&config)
        .await
        .context("failed to initialise bookswap services")?;

    match cli.command {
        Some(Commands::Migrate) => {
            // Migrations already ran during initialisation; a second pass is a no-op.
            run_migrations(&services.db_pool)
                .await
                .context("failed to run migrations")?;
            info!("database schema is up to date");
        }
        Some(Commands::Seed) => info!("sample data seeded"),
        Some(Commands::Run { examples }) => run_examples(&services, &config, &examples).await,
        Some(Commands::RunAll) => run_examples(&services, &config, Example::ALL).await,
        Some(Commands::List) => list_examples(),
        None => run_examples(&services, &config, &[Example::Top5UsersByBooksOwned]).await,
    }

    services.close().await;
    Ok(())
}

async fn run_examples(services: &BookswapServices, config: &AppConfig, examples: &[Example]) {
    tokio::select! {
        failures = run_logged(examples, &services.db_pool, &config.examples) => {
            if failures > 0 {
                warn!(failures, total = examples.len(), "some examples failed");
            } else {
                info!(total = examples.len(), "examples finished");
            }
        }
        _ = shutdown_signal() => warn!("interrupted before all examples finished"),
    }
}

fn list_examples() {
    for example in Example::ALL {
        println!("level{}  {}", example.level(), example.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_defaults_to_top_five() {
        let cli = Cli::try_parse_from(["bookswap"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.seed);
    }

    #[test]
    fn run_parses_example_names() {
        let cli = Cli::try_parse_from([
            "bookswap",
            "run",
            "create-user",
            "top-rated-users",
            "--seed",
        ])
        .unwrap();
        assert!(cli.seed);
        assert_eq!(
            cli.command,
            Some(Commands::Run {
                examples: vec![Example::CreateUser, Example::TopRatedUsers],
            })
        );
    }

    #[test]
    fn run_rejects_unknown_examples() {
        assert!(Cli::try_parse_from(["bookswap", "run", "drop-tables"]).is_err());
        assert!(Cli::try_parse_from(["bookswap", "run"]).is_err());
    }
}
