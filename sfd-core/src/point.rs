use crate::error::{Result, SfdError};
use crate::table::{finish_writer, optional_field, require_columns, Column, FieldReader};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default identity column of a point table.
pub const DEFAULT_ID_COLUMN: &str = "gauge_id";

pub(crate) const ROW_ALIASES: &[&str] = &["row", "i"];
pub(crate) const COL_ALIASES: &[&str] = &["col", "column", "j"];
pub(crate) const X_ALIASES: &[&str] = &["x"];
pub(crate) const Y_ALIASES: &[&str] = &["y"];

/// A benchmark location (stream gauge) addressed by grid cell.
///
/// `row`/`col` come from a grid intersection and may be one cell off.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    pub row: i64,
    pub col: i64,
    /// Projected planar coordinates, when the table carries them.
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Remaining columns of the source table, aligned with
    /// [`PointTable::attribute_names`].
    pub attributes: Vec<String>,
}

impl Point {
    pub fn new(id: &str, row: i64, col: i64) -> Self {
        Point {
            id: id.to_string(),
            row,
            col,
            x: None,
            y: None,
            attributes: Vec::new(),
        }
    }
}

/// A point table together with the column layout it was read with.
#[derive(Debug, PartialEq, Clone)]
pub struct PointTable {
    pub id_column: String,
    pub attribute_names: Vec<String>,
    /// True when both `x` and `y` columns were present.
    pub has_planar: bool,
    pub points: Vec<Point>,
}

/// Header positions not claimed by a recognised column.
pub(crate) fn attribute_positions(headers: &StringRecord, claimed: &[usize]) -> Vec<usize> {
    (0..headers.len()).filter(|i| !claimed.contains(i)).collect()
}

pub(crate) fn check_unique<'a>(ids: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(SfdError::DuplicatePoint(id.to_string()));
        }
    }
    Ok(())
}

impl PointTable {
    pub fn new(id_column: &str, points: Vec<Point>) -> Self {
        let has_planar = points.iter().any(|p| p.x.is_some() && p.y.is_some());
        PointTable {
            id_column: id_column.to_string(),
            attribute_names: Vec::new(),
            has_planar,
            points,
        }
    }

    /// Parse a point table addressed by grid cell.
    ///
    /// Required columns: the identity column, `row` (or `i`), `col` (or `j`).
    /// Optional `x`, `y`. Any other column is kept as an attribute.
    pub fn from_csv(csv_data: &str, id_column: &str) -> Result<PointTable> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_data.as_bytes());
        let headers = rdr.headers()?.clone();
        let id_aliases = [id_column];
        let required = require_columns(
            "points",
            &headers,
            &[
                Column::new(id_column, &id_aliases),
                Column::new("row", ROW_ALIASES),
                Column::new("col", COL_ALIASES),
            ],
        )?;
        let (id_idx, row_idx, col_idx) = (required[0], required[1], required[2]);
        let planar = Column::new("x", X_ALIASES)
            .find(&headers)
            .zip(Column::new("y", Y_ALIASES).find(&headers));

        let mut claimed = vec![id_idx, row_idx, col_idx];
        if let Some((x_idx, y_idx)) = planar {
            claimed.extend([x_idx, y_idx]);
        }
        let attributes = attribute_positions(&headers, &claimed);

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let fields = FieldReader::new("points", &record);
            let (x, y) = match planar {
                Some((x_idx, y_idx)) => (
                    fields.optional_real(x_idx, "x")?,
                    fields.optional_real(y_idx, "y")?,
                ),
                None => (None, None),
            };
            points.push(Point {
                id: fields.text(id_idx).to_string(),
                row: fields.index(row_idx, "row")?,
                col: fields.index(col_idx, "col")?,
                x,
                y,
                attributes: attributes
                    .iter()
                    .map(|&i| fields.text(i).to_string())
                    .collect(),
            });
        }
        check_unique(points.iter().map(|p| p.id.as_str()))?;
        log::info!("[SFD] points: Loaded {} points", points.len());

        Ok(PointTable {
            id_column: id_column.to_string(),
            attribute_names: attributes
                .iter()
                .map(|&i| headers.get(i).unwrap_or("").to_string())
                .collect(),
            has_planar: planar.is_some(),
            points,
        })
    }

    /// Write the table with `row`/`col` placed after the attributes.
    pub fn to_csv(&self) -> Result<String> {
        let mut wtr = WriterBuilder::new().from_writer(Vec::new());
        let mut header = vec![self.id_column.clone()];
        header.extend(self.attribute_names.iter().cloned());
        header.extend(["row".to_string(), "col".to_string()]);
        if self.has_planar {
            header.extend(["x".to_string(), "y".to_string()]);
        }
        wtr.write_record(&header)?;

        for point in &self.points {
            let mut record = vec![point.id.clone()];
            record.extend(point.attributes.iter().cloned());
            record.extend([point.row.to_string(), point.col.to_string()]);
            if self.has_planar {
                record.extend([optional_field(point.x), optional_field(point.y)]);
            }
            wtr.write_record(&record)?;
        }
        finish_writer(wtr)
    }
}
