use crate::error::Result;
use crate::network::NetworkCell;
use crate::point::{
    attribute_positions, Point, COL_ALIASES, ROW_ALIASES, X_ALIASES, Y_ALIASES,
};
use crate::table::{finish_writer, optional_field, require_columns, Column, FieldReader};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of snapping one point onto the stream network.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Resolution {
    /// Exactly one network cell.
    Resolved(NetworkCell),
    /// Several cells tie; all of them are kept.
    Ambiguous(Vec<NetworkCell>),
    /// No network cell inside the search window.
    Unresolved,
}

impl Resolution {
    pub fn from_cells(mut cells: Vec<NetworkCell>) -> Self {
        match cells.len() {
            0 => Resolution::Unresolved,
            1 => Resolution::Resolved(cells.remove(0)),
            _ => Resolution::Ambiguous(cells),
        }
    }

    pub fn cells(&self) -> &[NetworkCell] {
        match self {
            Resolution::Resolved(cell) => std::slice::from_ref(cell),
            Resolution::Ambiguous(cells) => cells,
            Resolution::Unresolved => &[],
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Resolution::Unresolved)
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Resolution::Ambiguous(_))
    }
}

/// A point after snapping: its identity and attributes, without the input
/// grid coordinates, plus the network cell(s) it resolved to.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SnappedPoint {
    pub id: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub attributes: Vec<String>,
    pub resolution: Resolution,
}

impl SnappedPoint {
    pub fn from_point(point: &Point, resolution: Resolution) -> Self {
        SnappedPoint {
            id: point.id.clone(),
            x: point.x,
            y: point.y,
            attributes: point.attributes.clone(),
            resolution,
        }
    }

    /// One point per resolved cell, addressed at that cell.
    pub fn to_points(&self) -> Vec<Point> {
        self.resolution
            .cells()
            .iter()
            .map(|cell| Point {
                id: self.id.clone(),
                row: cell.row,
                col: cell.col,
                x: self.x,
                y: self.y,
                attributes: self.attributes.clone(),
            })
            .collect()
    }
}

/// Counts of each resolution outcome.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize)]
pub struct SnapSummary {
    pub resolved: usize,
    pub ambiguous: usize,
    pub unresolved: usize,
}

/// Snapped points with the column layout of the point table they came from.
#[derive(Debug, PartialEq, Clone)]
pub struct SnappedTable {
    pub id_column: String,
    pub attribute_names: Vec<String>,
    pub has_planar: bool,
    pub points: Vec<SnappedPoint>,
}

impl SnappedTable {
    pub fn summary(&self) -> SnapSummary {
        let mut summary = SnapSummary::default();
        for point in &self.points {
            match point.resolution {
                Resolution::Resolved(_) => summary.resolved += 1,
                Resolution::Ambiguous(_) => summary.ambiguous += 1,
                Resolution::Unresolved => summary.unresolved += 1,
            }
        }
        summary
    }

    /// Write one row per resolved cell; unresolved points get one row with
    /// empty coordinates.
    ///
    /// Columns: identity, attributes, `row, col, segment, reach, reach_id`,
    /// then `x, y` when the source had planar coordinates.
    pub fn to_csv(&self) -> Result<String> {
        let mut wtr = WriterBuilder::new().from_writer(Vec::new());
        let mut header = vec![self.id_column.clone()];
        header.extend(self.attribute_names.iter().cloned());
        header.extend(
            ["row", "col", "segment", "reach", "reach_id"]
                .iter()
                .map(|s| s.to_string()),
        );
        if self.has_planar {
            header.extend(["x".to_string(), "y".to_string()]);
        }
        wtr.write_record(&header)?;

        for point in &self.points {
            let cells: Vec<Option<&NetworkCell>> = match point.resolution.cells() {
                [] => vec![None],
                cells => cells.iter().map(Some).collect(),
            };
            for cell in cells {
                let mut record = vec![point.id.clone()];
                record.extend(point.attributes.iter().cloned());
                record.extend([
                    optional_field(cell.map(|c| c.row)),
                    optional_field(cell.map(|c| c.col)),
                    optional_field(cell.map(|c| c.segment)),
                    optional_field(cell.map(|c| c.reach)),
                    optional_field(cell.map(|c| c.reach_id)),
                ]);
                if self.has_planar {
                    record.extend([optional_field(point.x), optional_field(point.y)]);
                }
                wtr.write_record(&record)?;
            }
        }
        finish_writer(wtr)
    }

    /// Read a table written by [`SnappedTable::to_csv`].
    ///
    /// Rows sharing an identity are regrouped into one point, in order of
    /// first appearance. A row with empty coordinates marks an unresolved
    /// point.
    pub fn from_csv(csv_data: &str, id_column: &str) -> Result<SnappedTable> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_data.as_bytes());
        let headers = rdr.headers()?.clone();
        let id_aliases = [id_column];
        let idx = require_columns(
            "snapped points",
            &headers,
            &[
                Column::new(id_column, &id_aliases),
                Column::new("row", ROW_ALIASES),
                Column::new("col", COL_ALIASES),
                Column::new("segment", &["segment", "iseg"]),
                Column::new("reach", &["reach", "ireach"]),
                Column::new("reach_id", &["reach_id", "reachid"]),
            ],
        )?;
        let planar = Column::new("x", X_ALIASES)
            .find(&headers)
            .zip(Column::new("y", Y_ALIASES).find(&headers));
        let mut claimed = idx.clone();
        if let Some((x_idx, y_idx)) = planar {
            claimed.extend([x_idx, y_idx]);
        }
        let attributes = attribute_positions(&headers, &claimed);

        let mut points: Vec<SnappedPoint> = Vec::new();
        let mut cells_by_point: Vec<Vec<NetworkCell>> = Vec::new();
        let mut position: HashMap<String, usize> = HashMap::new();
        for result in rdr.records() {
            let record = result?;
            let fields = FieldReader::new("snapped points", &record);
            let id = fields.text(idx[0]).to_string();
            let cell = match fields.optional_index(idx[1], "row")? {
                None => None,
                Some(row) => Some(NetworkCell {
                    row,
                    col: fields.index(idx[2], "col")?,
                    segment: fields.index(idx[3], "segment")?,
                    reach: fields.index(idx[4], "reach")?,
                    reach_id: fields.index(idx[5], "reach_id")?,
                }),
            };
            let slot = match position.get(&id) {
                Some(&slot) => slot,
                None => {
                    let (x, y) = match planar {
                        Some((x_idx, y_idx)) => (
                            fields.optional_real(x_idx, "x")?,
                            fields.optional_real(y_idx, "y")?,
                        ),
                        None => (None, None),
                    };
                    points.push(SnappedPoint {
                        id: id.clone(),
                        x,
                        y,
                        attributes: attributes
                            .iter()
                            .map(|&i| fields.text(i).to_string())
                            .collect(),
                        resolution: Resolution::Unresolved,
                    });
                    cells_by_point.push(Vec::new());
                    position.insert(id.clone(), points.len() - 1);
                    points.len() - 1
                }
            };
            match cell {
                Some(cell) => cells_by_point[slot].push(cell),
                None if !cells_by_point[slot].is_empty() => {
                    return Err(fields.invalid("row", ""));
                }
                None => {}
            }
        }
        for (point, cells) in points.iter_mut().zip(cells_by_point) {
            point.resolution = Resolution::from_cells(cells);
        }
        log::info!("[SFD] snapped: Loaded {} snapped points", points.len());

        Ok(SnappedTable {
            id_column: id_column.to_string(),
            attribute_names: attributes
                .iter()
                .map(|&i| headers.get(i).unwrap_or("").to_string())
                .collect(),
            has_planar: planar.is_some(),
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(row: i64, col: i64, reach_id: i64) -> NetworkCell {
        NetworkCell {
            row,
            col,
            reach_id,
            segment: 1,
            reach: reach_id,
        }
    }

    fn table() -> SnappedTable {
        SnappedTable {
            id_column: "gauge_id".to_string(),
            attribute_names: vec!["name".to_string()],
            has_planar: false,
            points: vec![
                SnappedPoint {
                    id: "G1".to_string(),
                    x: None,
                    y: None,
                    attributes: vec!["upper".to_string()],
                    resolution: Resolution::Resolved(cell(5, 10, 1)),
                },
                SnappedPoint {
                    id: "G2".to_string(),
                    x: None,
                    y: None,
                    attributes: vec!["middle".to_string()],
                    resolution: Resolution::Ambiguous(vec![cell(7, 3, 4), cell(7, 4, 4)]),
                },
                SnappedPoint {
                    id: "G3".to_string(),
                    x: None,
                    y: None,
                    attributes: vec!["lower".to_string()],
                    resolution: Resolution::Unresolved,
                },
            ],
        }
    }

    #[test]
    fn test_from_cells_tags_outcome() {
        assert_eq!(Resolution::from_cells(vec![]), Resolution::Unresolved);
        assert_eq!(
            Resolution::from_cells(vec![cell(1, 1, 1)]),
            Resolution::Resolved(cell(1, 1, 1))
        );
        assert!(Resolution::from_cells(vec![cell(1, 1, 1), cell(1, 2, 1)]).is_ambiguous());
    }

    #[test]
    fn test_to_csv_flattens_resolutions() {
        let out = table().to_csv().unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "gauge_id,name,row,col,segment,reach,reach_id");
        assert_eq!(lines[1], "G1,upper,5,10,1,1,1");
        assert_eq!(lines[2], "G2,middle,7,3,1,4,4");
        assert_eq!(lines[3], "G2,middle,7,4,1,4,4");
        assert_eq!(lines[4], "G3,lower,,,,,");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_from_csv_regroups_rows() {
        let original = table();
        let parsed = SnappedTable::from_csv(&original.to_csv().unwrap(), "gauge_id").unwrap();
        assert_eq!(parsed, original);
        assert_eq!(
            parsed.summary(),
            SnapSummary {
                resolved: 1,
                ambiguous: 1,
                unresolved: 1,
            }
        );
    }

    #[test]
    fn test_to_points_expands_ties() {
        let points = table().points[1].to_points();
        assert_eq!(points.len(), 2);
        assert_eq!((points[1].row, points[1].col), (7, 4));
        assert!(table().points[2].to_points().is_empty());
    }
}
