//! Run command - render every configured area.

use clap::Args;
use console::style;

use tilestitch::area::Area;
use tilestitch::config::ConfigFile;
use tilestitch::orchestrator::BatchReport;

use super::common::{build_orchestrator, format_bytes, load_config, select_areas, SelectionArgs};
use crate::error::CliError;

/// Arguments for the run command.
#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Runs the batch and returns true when every area succeeded.
pub async fn run(args: RunArgs) -> Result<bool, CliError> {
    let config = load_config(&args.selection.overrides)?;
    let areas = select_areas(&config, &args.selection.areas)?;
    execute(&config, &areas).await
}

/// Renders `areas` with the settings in `config` and prints the summary.
pub async fn execute(config: &ConfigFile, areas: &[Area]) -> Result<bool, CliError> {
    let orchestrator = build_orchestrator(config).await?;

    println!(
        "Rendering {} area(s) at zoom {} into {}",
        areas.len(),
        config.mosaic.zoom,
        config.output.directory.display()
    );
    println!();

    let report = orchestrator.run_batch(areas).await;
    print_summary(&report);
    Ok(report.all_succeeded())
}

fn print_summary(report: &BatchReport) {
    println!(
        "{:<24} {:<6} {:>7} {:>13} {:>10} {:>8}",
        style("Area").bold(),
        style("Status").bold(),
        style("Tiles").bold(),
        style("Pixels").bold(),
        style("Cached").bold(),
        style("Time").bold()
    );

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(area) => {
                println!(
                    "{:<24} {:<6} {:>7} {:>13} {:>9.0}% {:>7.1}s",
                    outcome.area_name,
                    style("ok").green(),
                    area.plan.tile_count,
                    format!("{}x{}", area.compose.width, area.compose.height),
                    area.fetch.hit_rate() * 100.0,
                    area.elapsed.as_secs_f64()
                );
                println!("    {}", style(area.plan.output_path.display()).dim());
            }
            Err(e) => {
                println!(
                    "{:<24} {:<6}",
                    outcome.area_name,
                    style("FAILED").red().bold()
                );
                println!("    {}", style(e).red());
            }
        }
    }

    let totals = report.total_fetch_stats();
    println!();
    println!(
        "{} succeeded, {} failed; {} cached, {} downloaded ({})",
        report.succeeded(),
        report.failed(),
        totals.hits,
        totals.misses,
        format_bytes(totals.bytes_fetched)
    );
}
