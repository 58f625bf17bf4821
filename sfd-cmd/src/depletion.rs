//! Streamflow depletion between two model runs.

use anyhow::Context;
use log::info;
use sfd_core::depletion::{write_depletion_csv, DepletionColumns};
use sfd_core::run::RunFormat;
use sfd_core::snapped::SnappedTable;
use sfd_core::table::read_table_file;
use sfd_data::depletion::{evaluate, EvaluateConfig};
use std::path::Path;

/// Read snapped points and both runs, and write the depletion table.
#[allow(clippy::too_many_arguments)]
pub fn run_depletion(
    points_csv: &str,
    historical_dir: &str,
    baseline_dir: &str,
    output_csv: &str,
    id_column: &str,
    format: RunFormat,
    output_file: &str,
    wide: bool,
) -> anyhow::Result<()> {
    let config = EvaluateConfig {
        format,
        output_file: output_file.to_string(),
    };
    let points_text = read_table_file(Path::new(points_csv))?;
    let snapped = SnappedTable::from_csv(&points_text, id_column)
        .with_context(|| format!("reading snapped points from {}", points_csv))?;

    let historical = config.run_handle(historical_dir);
    let baseline = config.run_handle(baseline_dir);
    info!(
        "Evaluating depletion for {} points: {} vs {}",
        snapped.points.len(),
        historical.output_path().display(),
        baseline.output_path().display()
    );
    let records = evaluate(
        &snapped.points,
        &historical,
        &baseline,
        config.reader().as_ref(),
    )?;

    let columns = if wide {
        DepletionColumns::Wide
    } else {
        DepletionColumns::Canonical
    };
    std::fs::write(
        output_csv,
        write_depletion_csv(&records, id_column, columns)?,
    )
    .with_context(|| format!("writing {}", output_csv))?;
    info!(
        "Depletion complete: {} rows. Output: {}",
        records.len(),
        output_csv
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const HEADER: &str = "kstpkper,row,col,segment,reach,Qin,Qaquifer,Qout,Qovr,Qprecip,Qet\n";

    #[test]
    fn depletion_writes_canonical_table() {
        let dir = tempfile::tempdir().unwrap();
        let historical = dir.path().join("historical");
        let baseline = dir.path().join("baseline");
        fs::create_dir(&historical).unwrap();
        fs::create_dir(&baseline).unwrap();
        fs::write(
            historical.join("flux.csv"),
            format!("{HEADER}\"(0, 0)\",5,10,1,1,0,0,100,0,0,0\n"),
        )
        .unwrap();
        fs::write(
            baseline.join("flux.csv"),
            format!("{HEADER}\"(0, 0)\",5,10,1,1,0,0,80,0,0,0\n"),
        )
        .unwrap();
        let points = dir.path().join("snapped.csv");
        fs::write(
            &points,
            "gauge_id,row,col,segment,reach,reach_id\nG1,5,10,1,1,1\n",
        )
        .unwrap();
        let output = dir.path().join("depletion.csv");

        run_depletion(
            points.to_str().unwrap(),
            historical.to_str().unwrap(),
            baseline.to_str().unwrap(),
            output.to_str().unwrap(),
            "gauge_id",
            RunFormat::Csv,
            "flux.csv",
            false,
        )
        .unwrap();
        let written = fs::read_to_string(&output).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next(),
            Some("gauge_id,row,col,segment,reach,kstpkper,timestep,stress_period,outflow_historical,outflow_baseline,depletion")
        );
        assert_eq!(lines.next(), Some("G1,5,10,1,1,\"(0, 0)\",0,0,100,80,20"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn depletion_missing_run_fails() {
        let dir = tempfile::tempdir().unwrap();
        let points = dir.path().join("snapped.csv");
        fs::write(
            &points,
            "gauge_id,row,col,segment,reach,reach_id\nG1,5,10,1,1,1\n",
        )
        .unwrap();
        let result = run_depletion(
            points.to_str().unwrap(),
            dir.path().to_str().unwrap(),
            dir.path().to_str().unwrap(),
            dir.path().join("out.csv").to_str().unwrap(),
            "gauge_id",
            RunFormat::SfrListing,
            "trans_2d.sfb",
            false,
        );
        assert!(result.is_err());
        assert!(!dir.path().join("out.csv").exists());
    }
}
