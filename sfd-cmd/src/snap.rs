//! Snapping a point table onto the stream network.

use anyhow::Context;
use log::info;
use sfd_core::network::NetworkCell;
use sfd_core::point::PointTable;
use sfd_core::table::read_table_file;
use sfd_data::snap::{snap_table, DirectMatchRule, FallbackScope, SnapConfig};
use std::path::Path;

/// Read points and the network, snap, and write the snapped table.
#[allow(clippy::too_many_arguments)]
pub fn run_snap(
    points_csv: &str,
    network_csv: &str,
    output_csv: &str,
    id_column: &str,
    search_distance: &[i64],
    global_presence: bool,
    shared_fallback: bool,
) -> anyhow::Result<()> {
    if search_distance.is_empty() {
        anyhow::bail!("--search-distance needs at least one value");
    }
    let config = SnapConfig {
        id_column: id_column.to_string(),
        direct_match: if global_presence {
            DirectMatchRule::GlobalPresence
        } else {
            DirectMatchRule::Unshifted
        },
        fallback: if shared_fallback {
            FallbackScope::SharedCandidates
        } else {
            FallbackScope::OwnCandidates
        },
        ..SnapConfig::default()
    }
    .with_search_distance(search_distance);

    let points_text = read_table_file(Path::new(points_csv))?;
    let points = PointTable::from_csv(&points_text, &config.id_column)
        .with_context(|| format!("reading points from {}", points_csv))?;
    let network_text = read_table_file(Path::new(network_csv))?;
    let network = NetworkCell::parse_network_csv(&network_text)
        .with_context(|| format!("reading stream network from {}", network_csv))?;

    info!(
        "Snapping {} points onto {} network cells with a {}-offset window",
        points.points.len(),
        network.len(),
        config.search_offsets.len()
    );
    let snapped = snap_table(&points, &network, &config)?;

    std::fs::write(output_csv, snapped.to_csv()?)
        .with_context(|| format!("writing {}", output_csv))?;
    let summary = snapped.summary();
    info!(
        "Snap complete: {} resolved, {} ambiguous, {} unresolved. Output: {}",
        summary.resolved, summary.ambiguous, summary.unresolved, output_csv
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn snap_writes_snapped_table() {
        let dir = tempfile::tempdir().unwrap();
        let points = dir.path().join("points.csv");
        let network = dir.path().join("network.csv");
        let output = dir.path().join("snapped.csv");
        fs::write(&points, "gauge_id,row,col\nG1,5,11\nFAR,40,40\n").unwrap();
        fs::write(&network, "i,j,reachID,iseg,ireach\n5,10,1,1,1\n").unwrap();

        run_snap(
            points.to_str().unwrap(),
            network.to_str().unwrap(),
            output.to_str().unwrap(),
            "gauge_id",
            &[-1, 0, 1],
            false,
            false,
        )
        .unwrap();
        let written = fs::read_to_string(&output).unwrap();
        assert_eq!(
            written,
            "gauge_id,row,col,segment,reach,reach_id\nG1,5,10,1,1,1\nFAR,,,,,\n"
        );
    }

    #[test]
    fn snap_shared_fallback_writes_extra_rows() {
        let dir = tempfile::tempdir().unwrap();
        let points = dir.path().join("points.csv");
        let network = dir.path().join("network.csv");
        let output = dir.path().join("snapped.csv");
        fs::write(&points, "gauge_id,row,col\nA,4,9\nB,5,11\n").unwrap();
        fs::write(&network, "i,j,reachID,iseg,ireach\n5,10,3,1,3\n5,11,7,1,7\n").unwrap();

        run_snap(
            points.to_str().unwrap(),
            network.to_str().unwrap(),
            output.to_str().unwrap(),
            "gauge_id",
            &[-1, 0, 1],
            false,
            true,
        )
        .unwrap();
        let written = fs::read_to_string(&output).unwrap();
        assert_eq!(
            written,
            "gauge_id,row,col,segment,reach,reach_id\nA,5,10,1,3,3\nB,5,11,1,7,7\nB,5,10,1,3,3\n"
        );
    }

    #[test]
    fn snap_missing_network_fails() {
        let dir = tempfile::tempdir().unwrap();
        let points = dir.path().join("points.csv");
        fs::write(&points, "gauge_id,row,col\nG1,5,11\n").unwrap();
        let result = run_snap(
            points.to_str().unwrap(),
            dir.path().join("missing.csv").to_str().unwrap(),
            dir.path().join("out.csv").to_str().unwrap(),
            "gauge_id",
            &[-1, 0, 1],
            false,
            false,
        );
        assert!(result.is_err());
    }
}
