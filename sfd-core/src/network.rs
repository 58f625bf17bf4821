use crate::error::Result;
use crate::point::{COL_ALIASES, ROW_ALIASES};
use crate::table::{require_columns, Column, FieldReader};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

/// A grid cell that belongs to the stream-routing network.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct NetworkCell {
    pub row: i64,
    pub col: i64,
    /// Increases downstream; the smallest value is the most upstream reach.
    pub reach_id: i64,
    pub segment: i64,
    pub reach: i64,
}

impl NetworkCell {
    /// Parse a network table (the model's reach data).
    ///
    /// Expected columns: `row`, `col`, `reach_id`, `segment`, `reach`, or the
    /// model export names `i`, `j`, `reachID`, `iseg`, `ireach`. Extra columns
    /// are ignored.
    pub fn parse_network_csv(csv_data: &str) -> Result<Vec<NetworkCell>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_data.as_bytes());
        let headers = rdr.headers()?.clone();
        let idx = require_columns(
            "network",
            &headers,
            &[
                Column::new("row", ROW_ALIASES),
                Column::new("col", COL_ALIASES),
                Column::new("reach_id", &["reach_id", "reachid"]),
                Column::new("segment", &["segment", "iseg"]),
                Column::new("reach", &["reach", "ireach"]),
            ],
        )?;

        let mut cells = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let fields = FieldReader::new("network", &record);
            cells.push(NetworkCell {
                row: fields.index(idx[0], "row")?,
                col: fields.index(idx[1], "col")?,
                reach_id: fields.index(idx[2], "reach_id")?,
                segment: fields.index(idx[3], "segment")?,
                reach: fields.index(idx[4], "reach")?,
            });
        }
        log::info!("[SFD] network: Loaded {} network cells", cells.len());
        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SfdError;

    #[test]
    fn test_parse_model_export_names() {
        let csv = "\
k,i,j,iseg,ireach,reachID,rchlen
0,5,10,1,1,1,400.0
0,5,11,1,2,2,400.0
0,6,11,2,1,3,283.0
";
        let cells = NetworkCell::parse_network_csv(csv).unwrap();
        assert_eq!(cells.len(), 3);
        assert_eq!(
            cells[2],
            NetworkCell {
                row: 6,
                col: 11,
                reach_id: 3,
                segment: 2,
                reach: 1,
            }
        );
    }

    #[test]
    fn test_parse_canonical_names() {
        let csv = "row,col,reach_id,segment,reach\n5,10,1,1,1\n";
        let cells = NetworkCell::parse_network_csv(csv).unwrap();
        assert_eq!(cells[0].reach_id, 1);
    }

    #[test]
    fn test_schema_mismatch_names_missing_columns() {
        let err = NetworkCell::parse_network_csv("i,j\n1,2\n").unwrap_err();
        match err {
            SfdError::SchemaMismatch { table, missing } => {
                assert_eq!(table, "network");
                assert_eq!(missing, vec!["reach_id", "segment", "reach"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_value_reports_column() {
        let err = NetworkCell::parse_network_csv("row,col,reach_id,segment,reach\n5,x,1,1,1\n")
            .unwrap_err();
        assert!(matches!(err, SfdError::InvalidValue { column, .. } if column == "col"));
    }
}
