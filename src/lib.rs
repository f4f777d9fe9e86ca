pub mod commands;
pub mod config;
pub mod consolidate;
pub mod excel;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use commands::CommandError;
use config::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "consolidator",
    version,
    about = "Consolidate per-person attendance workbooks into a master workbook"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Directory holding the children folder and the master workbook.
    #[arg(long, global = true, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,
    /// Settings file (defaults to consolidator.json in the base directory).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Skip fonts, fills, borders and column widths.
    #[arg(long, global = true, default_value_t = false)]
    pub plain: bool,
    /// Debug-level logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rebuild the master workbook, keeping the previous one as backup.
    Run,
    /// Write a timestamped copy beside the master workbook instead.
    Preview,
    /// Validate the child files and print metrics without writing anything.
    Check,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

pub fn run() -> Result<(), CommandError> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let base_dir = cli.global.base_dir.unwrap_or_else(|| PathBuf::from("."));
    let settings = Settings::load(&base_dir, cli.global.config.as_deref())?;
    let presentation = commands::presentation(cli.global.plain);

    match cli.command {
        Command::Run => commands::run_consolidate(&settings, presentation).map(|_| ()),
        Command::Preview => commands::run_preview(&settings, presentation).map(|_| ()),
        Command::Check => commands::run_check(&settings).map(|_| ()),
    }
}
