//! Readers for the per-cell, per-time-step stream flux output of a model run.
//!
//! Two sources are supported: the stream listing text written by the
//! groundwater solver (`trans_2d.sfb`), and a flux table already exported to
//! CSV. Both produce zero-based [`FluxRecord`]s and never modify the file.

use crate::error::{Result, SfdError};
use crate::flux::{FluxQuantities, FluxRecord, TimeIndex};
use crate::point::{COL_ALIASES, ROW_ALIASES};
use crate::table::{find_column, read_table_file, require_columns, Column, FieldReader};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use sfd_utils::fortran::parse_fortran_f64;
use std::path::PathBuf;

/// Stream output file name written by the groundwater model.
pub const DEFAULT_OUTPUT_FILE: &str = "trans_2d.sfb";

/// A model run directory and the stream output file inside it.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct RunHandle {
    pub dir: PathBuf,
    pub file_name: String,
}

impl RunHandle {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        RunHandle {
            dir: dir.into(),
            file_name: DEFAULT_OUTPUT_FILE.to_string(),
        }
    }

    pub fn with_file_name(mut self, file_name: &str) -> Self {
        self.file_name = file_name.to_string();
        self
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

/// Loads the full flux table of one run.
pub trait RunReader {
    fn read_run(&self, run: &RunHandle) -> Result<Vec<FluxRecord>>;
}

/// Supported run output formats.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum RunFormat {
    /// Stream listing text written by the solver.
    #[default]
    SfrListing,
    /// Header-row CSV flux table.
    Csv,
}

impl RunFormat {
    pub fn reader(&self) -> Box<dyn RunReader> {
        match self {
            RunFormat::SfrListing => Box::new(SfrListingReader),
            RunFormat::Csv => Box::new(CsvFluxReader),
        }
    }
}

/// Reads the solver's stream listing output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SfrListingReader;

impl RunReader for SfrListingReader {
    fn read_run(&self, run: &RunHandle) -> Result<Vec<FluxRecord>> {
        let path = run.output_path();
        let text = read_table_file(&path)?;
        let records = parse_sfr_listing(&text)?;
        log::info!(
            "[SFD] run: Read {} stream flux rows from {}",
            records.len(),
            path.display()
        );
        Ok(records)
    }
}

/// Reads a CSV flux table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFluxReader;

impl RunReader for CsvFluxReader {
    fn read_run(&self, run: &RunHandle) -> Result<Vec<FluxRecord>> {
        let path = run.output_path();
        let text = read_table_file(&path)?;
        let records = parse_flux_csv(&text)?;
        log::info!(
            "[SFD] run: Read {} flux rows from {}",
            records.len(),
            path.display()
        );
        Ok(records)
    }
}

/// Value following `keyword` in a whitespace-split header line.
fn keyword_value(tokens: &[&str], keyword: &str) -> Option<u32> {
    let pos = tokens.iter().position(|t| t.eq_ignore_ascii_case(keyword))?;
    tokens.get(pos + 1)?.parse().ok()
}

fn one_based(value: i64, line: usize, what: &str) -> Result<i64> {
    if value < 1 {
        return Err(SfdError::InvalidListing {
            line,
            reason: format!("{} {} is not a 1-based index", what, value),
        });
    }
    Ok(value - 1)
}

/// Parse stream listing text.
///
/// Each block opens with a header containing `PERIOD <kper> STEP <kstp>`.
/// Data lines start with `layer row col segment reach` followed by
/// `Qin Qaquifer Qout Qovr Qprecip Qet` and further columns that are ignored.
/// All indices in the file are 1-based and are returned zero-based.
pub fn parse_sfr_listing(text: &str) -> Result<Vec<FluxRecord>> {
    let mut records = Vec::new();
    let mut time: Option<TimeIndex> = None;

    for (n, line) in text.lines().enumerate() {
        let line_no = n + 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        let indices: Vec<i64> = tokens
            .iter()
            .take(5)
            .map_while(|t| t.parse::<i64>().ok())
            .collect();
        if indices.len() < 5 || tokens.len() < 11 {
            if let (Some(kper), Some(kstp)) = (
                keyword_value(&tokens, "PERIOD"),
                keyword_value(&tokens, "STEP"),
            ) {
                if kper < 1 || kstp < 1 {
                    return Err(SfdError::InvalidListing {
                        line: line_no,
                        reason: format!("period {} step {} are not 1-based", kper, kstp),
                    });
                }
                time = Some(TimeIndex::new(kstp - 1, kper - 1));
            }
            continue;
        }

        let Some(time) = time else {
            return Err(SfdError::InvalidListing {
                line: line_no,
                reason: "stream data before any PERIOD/STEP header".to_string(),
            });
        };
        let mut values = [0.0; 6];
        for (slot, token) in values.iter_mut().zip(&tokens[5..11]) {
            *slot = parse_fortran_f64(token).ok_or_else(|| SfdError::InvalidListing {
                line: line_no,
                reason: format!("unreadable flux value {:?}", token),
            })?;
        }
        records.push(FluxRecord {
            time,
            layer: Some(one_based(indices[0], line_no, "layer")?),
            row: one_based(indices[1], line_no, "row")?,
            col: one_based(indices[2], line_no, "column")?,
            segment: indices[3],
            reach: indices[4],
            quantities: FluxQuantities::from_array(values),
        });
    }
    Ok(records)
}

/// Parse a CSV flux table.
///
/// Time is read from a `kstpkper` column (`"(ts, sp)"`) or from separate
/// `timestep`/`stress_period` columns. Indices are taken as zero-based.
pub fn parse_flux_csv(csv_data: &str) -> Result<Vec<FluxRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());
    let headers = rdr.headers()?.clone();

    let kstpkper = find_column(&headers, &["kstpkper"]);
    let mut columns = vec![
        Column::new("row", ROW_ALIASES),
        Column::new("col", COL_ALIASES),
        Column::new("segment", &["segment", "iseg"]),
        Column::new("reach", &["reach", "ireach"]),
        Column::new("Qin", &["Qin"]),
        Column::new("Qaquifer", &["Qaquifer"]),
        Column::new("Qout", &["Qout", "Qriver"]),
        Column::new("Qovr", &["Qovr"]),
        Column::new("Qprecip", &["Qprecip"]),
        Column::new("Qet", &["Qet"]),
    ];
    if kstpkper.is_none() {
        columns.push(Column::new("timestep", &["timestep", "ts", "kstp"]));
        columns.push(Column::new("stress_period", &["stress_period", "sp", "kper"]));
    }
    let idx = require_columns("flux", &headers, &columns)?;
    let layer = find_column(&headers, &["layer", "k"]);

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let fields = FieldReader::new("flux", &record);
        let time = match kstpkper {
            Some(k) => fields
                .text(k)
                .parse::<TimeIndex>()
                .map_err(|_| fields.invalid("kstpkper", fields.text(k)))?,
            None => TimeIndex::new(
                non_negative(&fields, idx[10], "timestep")?,
                non_negative(&fields, idx[11], "stress_period")?,
            ),
        };
        let mut values = [0.0; 6];
        for (i, slot) in values.iter_mut().enumerate() {
            *slot = fields.real(idx[4 + i], FluxQuantities::SOURCE_NAMES[i])?;
        }
        records.push(FluxRecord {
            time,
            layer: match layer {
                Some(l) => fields.optional_index(l, "layer")?,
                None => None,
            },
            row: fields.index(idx[0], "row")?,
            col: fields.index(idx[1], "col")?,
            segment: fields.index(idx[2], "segment")?,
            reach: fields.index(idx[3], "reach")?,
            quantities: FluxQuantities::from_array(values),
        });
    }
    Ok(records)
}

fn non_negative(fields: &FieldReader<'_>, idx: usize, column: &str) -> Result<u32> {
    let value = fields.index(idx, column)?;
    u32::try_from(value).map_err(|_| fields.invalid(column, &value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const LISTING: &str = "
 STREAM LISTING     PERIOD     1 STEP     1
 FLOW RATES FOR EACH STREAM REACH
 LAYER ROW COL. STREAM   RCH.  FLOW INTO   FLOW TO     FLOW OUT OF  OVRLND.   DIRECT   STREAM
                SEG.NO.  NO.   STRM. RCH.  AQUIFER     STRM. RCH.   RUNOFF    PRECIP   ET
 ------------------------------------------------------------------------------------------
    1    6   11     1    1  0.12000E+03  0.20000E+02  0.10000E+03  0.0000E+00  0.0000E+00  0.0000E+00  0.1234E+04  0.50E+00
    1    6   12     1    2  0.10000E+03 -0.50000E+01  0.10500E+03  0.0000E+00  0.0000E+00  0.0000E+00  0.1230E+04  0.50E+00

 STREAM LISTING     PERIOD     2 STEP    10
 ------------------------------------------------------------------------------------------
    1    6   11     1    1  0.11000E+03  0.30000E+02  0.80000E+02  0.0000E+00  0.1000-100  0.0000E+00  0.1234E+04  0.50E+00
";

    #[test]
    fn test_parse_listing_is_zero_based() {
        let records = parse_sfr_listing(LISTING).unwrap();
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.time, TimeIndex::new(0, 0));
        assert_eq!((first.row, first.col), (5, 10));
        assert_eq!(first.layer, Some(0));
        assert_eq!((first.segment, first.reach), (1, 1));
        assert_eq!(first.quantities.q_out, 100.0);
        assert_eq!(records[1].quantities.q_aquifer, -5.0);

        let last = &records[2];
        assert_eq!(last.time, TimeIndex::new(9, 1));
        assert_eq!(last.quantities.q_out, 80.0);
        assert!(last.quantities.q_precip > 0.0);
    }

    #[test]
    fn test_data_before_header_is_rejected() {
        let text = "    1    6   11     1    1  1.0  2.0  3.0  4.0  5.0  6.0\n";
        let err = parse_sfr_listing(text).unwrap_err();
        assert!(matches!(err, SfdError::InvalidListing { line: 1, .. }));
    }

    #[test]
    fn test_unreadable_value_is_rejected() {
        let text = " STREAM LISTING PERIOD 1 STEP 1\n 1 6 11 1 1 1.0 2.0 ***** 4.0 5.0 6.0\n";
        let err = parse_sfr_listing(text).unwrap_err();
        assert!(matches!(err, SfdError::InvalidListing { line: 2, .. }));
    }

    #[test]
    fn test_parse_flux_csv_with_kstpkper() {
        let csv = "\
kstpkper,i,j,Qin,Qaquifer,Qout,Qovr,Qprecip,Qet,segment,reach
\"(0, 0)\",5,10,120.0,20.0,100.0,0.0,0.0,0.0,1,1
\"(9, 1)\",5,10,110.0,30.0,80.0,0.0,0.0,0.0,1,1
";
        let records = parse_flux_csv(csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].time, TimeIndex::new(9, 1));
        assert_eq!((records[0].row, records[0].col), (5, 10));
        assert_eq!(records[0].layer, None);
    }

    #[test]
    fn test_parse_flux_csv_with_split_time() {
        let csv = "\
ts,sp,row,col,segment,reach,Qin,Qaquifer,Qriver,Qovr,Qprecip,Qet
3,2,5,10,1,1,1.0,2.0,3.0,4.0,5.0,6.0
";
        let records = parse_flux_csv(csv).unwrap();
        assert_eq!(records[0].time, TimeIndex::new(3, 2));
        assert_eq!(records[0].quantities.q_out, 3.0);
    }

    #[test]
    fn test_parse_flux_csv_schema_mismatch() {
        let err = parse_flux_csv("row,col,segment,reach\n1,1,1,1\n").unwrap_err();
        match err {
            SfdError::SchemaMismatch { missing, .. } => {
                assert!(missing.contains(&"Qout".to_string()));
                assert!(missing.contains(&"timestep".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_run_output_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let run = RunHandle::new(dir.path());
        assert!(!run.output_path().exists());
        let err = RunFormat::SfrListing.reader().read_run(&run).unwrap_err();
        match err {
            SfdError::MissingInputFile(path) => assert!(path.ends_with(DEFAULT_OUTPUT_FILE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_repeated_reads_leave_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let run = RunHandle::new(dir.path());
        fs::write(run.output_path(), LISTING).unwrap();

        let reader = RunFormat::SfrListing.reader();
        let first = reader.read_run(&run).unwrap();
        let second = reader.read_run(&run).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(run.output_path()).unwrap(), LISTING);
    }
}
