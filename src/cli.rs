use std::fs::File;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use persona_core::config::AppConfig;
use persona_core::error::AppError;
use persona_core::inventory::{AssessmentMode, CatalogLoader, Inventory};
use persona_core::telemetry;
use tracing::info;

use crate::{interactive, render};

#[derive(Parser, Debug)]
#[command(
    name = "persona",
    about = "Take an adaptive personality inventory from the terminal",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a new assessment (default command)
    Run(RunArgs),
    /// Continue a saved session by id
    Resume(ResumeArgs),
    /// Answer every item with the same value, for demos
    Simulate(SimulateArgs),
    /// Summarize the catalog that would be used
    Catalog(CatalogArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct CatalogSource {
    /// JSON catalog document (overrides PERSONA_CATALOG_PATH)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// CSV item table that replaces the catalog's item pool
    #[arg(long)]
    pub(crate) items_csv: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// demo, basic or comprehensive (defaults to PERSONA_MODE)
    #[arg(long, value_parser = parse_mode)]
    pub(crate) mode: Option<AssessmentMode>,
    /// Seed for reproducible item order
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    #[command(flatten)]
    pub(crate) source: CatalogSource,
    /// Print the final report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ResumeArgs {
    /// Id printed when the session was started
    pub(crate) session_id: String,
    #[command(flatten)]
    pub(crate) source: CatalogSource,
    /// Print the final report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct SimulateArgs {
    /// Answer given to every item
    #[arg(long, default_value_t = 3)]
    pub(crate) answer: u8,
    #[arg(long, value_parser = parse_mode)]
    pub(crate) mode: Option<AssessmentMode>,
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    #[command(flatten)]
    pub(crate) source: CatalogSource,
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CatalogArgs {
    #[command(flatten)]
    pub(crate) source: CatalogSource,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    info!(environment = ?config.environment, "persona starting");

    let command = cli
        .command
        .unwrap_or_else(|| Command::Run(RunArgs::default()));

    match command {
        Command::Run(args) => interactive::run(&config, args).await,
        Command::Resume(args) => interactive::resume(&config, args).await,
        Command::Simulate(args) => interactive::simulate(&config, args),
        Command::Catalog(args) => {
            let inventory = load_inventory(&config, &args.source)?;
            render::catalog(&inventory);
            Ok(())
        }
    }
}

/// The configured or requested catalog, falling back to the built-in one,
/// with its item pool optionally replaced from a CSV table.
pub(crate) fn load_inventory(
    config: &AppConfig,
    source: &CatalogSource,
) -> Result<Inventory, AppError> {
    let path = source.catalog.as_ref().or(config.catalog.path.as_ref());
    let base = CatalogLoader::load_or_fallback(path.map(PathBuf::as_path));

    match &source.items_csv {
        Some(csv_path) => {
            let file = File::open(csv_path)?;
            Ok(CatalogLoader::with_items_csv(&base, file)?)
        }
        None => Ok(base),
    }
}

fn parse_mode(raw: &str) -> Result<AssessmentMode, String> {
    AssessmentMode::parse(raw)
        .ok_or_else(|| format!("unknown mode '{raw}' (expected demo, basic or comprehensive)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_is_the_default_and_flags_parse() {
        let cli = Cli::try_parse_from(["persona"]).expect("no arguments parse");
        assert!(cli.command.is_none());

        let args = ["persona", "run", "--mode", "Full", "--seed", "7", "--json"];
        let cli = Cli::try_parse_from(args).expect("run flags parse");
        match cli.command {
            Some(Command::Run(args)) => {
                assert_eq!(args.mode, Some(AssessmentMode::Comprehensive));
                assert_eq!(args.seed, Some(7));
                assert!(args.json);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn unknown_modes_are_rejected() {
        assert!(Cli::try_parse_from(["persona", "run", "--mode", "marathon"]).is_err());
    }

    #[test]
    fn simulate_defaults_to_the_scale_midpoint() {
        let cli = Cli::try_parse_from(["persona", "simulate"]).expect("simulate parses");
        match cli.command {
            Some(Command::Simulate(args)) => assert_eq!(args.answer, 3),
            other => panic!("expected simulate, got {other:?}"),
        }
    }
}
