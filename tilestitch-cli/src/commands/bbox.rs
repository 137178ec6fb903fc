//! Bbox command - render one area given on the command line.

use clap::Args;

use tilestitch::area::Area;
use tilestitch::coord::BoundingBox;

use super::common::{load_config, OverrideArgs};
use super::run::execute;
use crate::error::CliError;

/// Arguments for the bbox command.
#[derive(Debug, Args)]
pub struct BboxArgs {
    /// Bounding box as minLon,minLat,maxLon,maxLat
    #[arg(
        long,
        value_name = "MINLON,MINLAT,MAXLON,MAXLAT",
        value_delimiter = ',',
        num_args = 4,
        allow_hyphen_values = true,
        required = true
    )]
    pub bbox: Vec<f64>,

    /// Area name, used for the output file name
    #[arg(long)]
    pub name: String,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

/// Renders the single area; areas from the config file are ignored.
pub async fn run(args: BboxArgs) -> Result<bool, CliError> {
    let area = area_from_args(&args)?;
    let config = load_config(&args.overrides)?;
    execute(&config, &[area]).await
}

fn area_from_args(args: &BboxArgs) -> Result<Area, CliError> {
    let [min_lon, min_lat, max_lon, max_lat] = args.bbox[..] else {
        return Err(CliError::Config(format!(
            "--bbox needs exactly four numbers, got {}",
            args.bbox.len()
        )));
    };
    let bbox =
        BoundingBox::new(min_lon, min_lat, max_lon, max_lat).map_err(CliError::BoundingBox)?;
    Ok(Area::from_bbox(args.name.clone(), bbox))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(bbox: Vec<f64>) -> BboxArgs {
        BboxArgs {
            bbox,
            name: "adhoc".to_string(),
            overrides: OverrideArgs::default(),
        }
    }

    #[test]
    fn test_area_from_args() {
        let area = area_from_args(&args(vec![-118.2537, 34.0422, -118.2437, 34.0522])).unwrap();
        assert_eq!(area.name(), "adhoc");
        assert_eq!(area.tile_range(18).unwrap().width(), 8);
    }

    #[test]
    fn test_inverted_bbox_rejected() {
        assert!(matches!(
            area_from_args(&args(vec![-118.2, 34.1, -118.3, 34.0])),
            Err(CliError::BoundingBox(_))
        ));
    }

    #[test]
    fn test_wrong_arity_rejected() {
        assert!(matches!(
            area_from_args(&args(vec![1.0, 2.0])),
            Err(CliError::Config(_))
        ));
    }
}
