//! Plan command - pre-flight checks without fetching anything.

use clap::Args;
use console::style;

use tilestitch::area::AreaError;
use tilestitch::orchestrator::{plan_area, OutputClaims};

use super::common::{format_bytes, load_config, select_areas, SelectionArgs};
use crate::error::CliError;

/// Arguments for the plan command.
#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Prints each area's tile range and output size.
///
/// Returns true when every area would pass the pre-flight checks.
pub fn run(args: PlanArgs) -> Result<bool, CliError> {
    let config = load_config(&args.selection.overrides)?;
    let areas = select_areas(&config, &args.selection.areas)?;
    let run_config = config.run_config();

    println!(
        "Zoom {}, tile size {}px, ceiling {} tiles{}",
        run_config.zoom,
        run_config.mosaic.tile_size,
        run_config.max_tiles,
        if config.mosaic.expand { ", 3x3 expansion" } else { "" }
    );
    println!();

    let mut all_ok = true;
    let mut claims = OutputClaims::new();
    for area in &areas {
        println!("{}", style(area.name()).bold());
        match plan_area(area, &run_config) {
            Ok(plan) => {
                let raw_bytes = plan.width as u64 * plan.height as u64 * 4;
                println!("  Tiles:   {} ({})", plan.range, plan.tile_count);
                println!("  Extent:  {}", plan.geo_bounds);
                println!(
                    "  Output:  {}x{} px, {} uncompressed",
                    plan.width,
                    plan.height,
                    format_bytes(raw_bytes)
                );
                println!("  File:    {}", plan.output_path.display());
                if let Err(e) = claims.claim(&plan.output_path, area.name()) {
                    all_ok = false;
                    println!("  {} {}", style("Conflict:").red().bold(), e);
                }
            }
            Err(AreaError::AreaTooLarge { count, ceiling }) => {
                all_ok = false;
                println!(
                    "  {} {} tiles exceeds the ceiling of {}",
                    style("Too large:").red().bold(),
                    count,
                    ceiling
                );
            }
            Err(e) => {
                all_ok = false;
                println!("  {} {}", style("Invalid:").red().bold(), e);
            }
        }
        println!();
    }

    Ok(all_ok)
}
