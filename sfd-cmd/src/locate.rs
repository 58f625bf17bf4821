//! Grid intersection of planar point coordinates.

use anyhow::Context;
use log::info;
use sfd_core::grid::{GridSpec, StructuredGrid};
use sfd_core::table::read_table_file;
use std::path::Path;

/// Read planar points and a grid definition, and write the point table
/// addressed by grid cell.
pub fn run_locate(
    points_csv: &str,
    grid_json: &str,
    output_csv: &str,
    id_column: &str,
) -> anyhow::Result<()> {
    let spec_text = read_table_file(Path::new(grid_json))?;
    let spec = GridSpec::from_json(&spec_text)
        .with_context(|| format!("parsing grid definition {}", grid_json))?;
    let grid = StructuredGrid::from_spec(&spec)?;

    let points_text = read_table_file(Path::new(points_csv))?;
    let table = grid
        .locate_points(&points_text, id_column)
        .with_context(|| format!("locating points from {}", points_csv))?;

    std::fs::write(output_csv, table.to_csv()?)
        .with_context(|| format!("writing {}", output_csv))?;
    info!("Located {} points. Output: {}", table.points.len(), output_csv);
    Ok(())
}
