//! tilestitch CLI - Command-line interface
//!
//! Renders the areas from `~/.tilestitch/config.ini` (or `--config`) into
//! one PNG mosaic each.

mod commands;
mod error;

use std::future::Future;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::bbox::BboxArgs;
use commands::plan::PlanArgs;
use commands::run::RunArgs;
use error::{CliError, EXIT_AREA_FAILED};
use tilestitch::config::config_directory;
use tilestitch::logging::{default_log_file, init_logging, LoggingGuard};

#[derive(Parser)]
#[command(name = "tilestitch")]
#[command(version)]
#[command(about = "Stitch slippy-map tiles covering a geographic area into one large raster", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every configured area (or those picked with --area)
    Run(RunArgs),

    /// Show tile ranges, counts and output sizes without fetching anything
    Plan(PlanArgs),

    /// Render a single area given as a bounding box
    Bbox(BboxArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Plan never touches the network; keep its output free of log lines.
    let logging = match &cli.command {
        Commands::Plan(_) => None,
        _ => match setup_logging(cli.verbose) {
            Ok(guard) => Some(guard),
            Err(e) => return e.report(),
        },
    };

    let result = match cli.command {
        Commands::Run(args) => block_on(commands::run::run(args)),
        Commands::Plan(args) => commands::plan::run(args),
        Commands::Bbox(args) => block_on(commands::bbox::run(args)),
    };

    // Flushes buffered log lines before the exit status is handed back
    drop(logging);

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_AREA_FAILED),
        Err(e) => e.report(),
    }
}

/// Runs `command` to completion on a runtime of its own.
///
/// The runtime is shut down before returning, which waits for blocking
/// tasks still in flight so their temporary files are removed.
fn block_on<F>(command: F) -> Result<bool, CliError>
where
    F: Future<Output = Result<bool, CliError>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let result = runtime.block_on(command);
    drop(runtime);
    result
}

fn setup_logging(verbose: bool) -> Result<LoggingGuard, CliError> {
    let log_dir = config_directory().join("logs");
    init_logging(&log_dir, default_log_file(), verbose)
        .map_err(|e| CliError::LoggingInit(format!("{}: {}", log_dir.display(), e)))
}
