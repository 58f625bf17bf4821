//! Structured model grid and point-in-cell intersection.
//!
//! The grid is not rotated. Its origin `(xoff, yoff)` is the lower-left corner
//! while rows are numbered from the top, so row 0 is the northernmost row.
//! Cells are half-open: a point on an interior edge belongs to the cell to its
//! right (columns) or below it (rows). This edge rule is why intersected
//! gauges can land one cell away from the stream they sit on.

use crate::error::{Result, SfdError};
use crate::point::{
    attribute_positions, check_unique, Point, PointTable, COL_ALIASES, ROW_ALIASES, X_ALIASES,
    Y_ALIASES,
};
use crate::table::{find_column, require_columns, Column, FieldReader};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

/// Grid definition as read from JSON.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GridSpec {
    /// Per-column widths and per-row heights.
    Explicit {
        #[serde(default)]
        xoff: f64,
        #[serde(default)]
        yoff: f64,
        delr: Vec<f64>,
        delc: Vec<f64>,
    },
    /// Square cells of one size.
    Uniform {
        #[serde(default)]
        xoff: f64,
        #[serde(default)]
        yoff: f64,
        nrow: usize,
        ncol: usize,
        cell_size: f64,
    },
}

impl GridSpec {
    pub fn from_json(json: &str) -> Result<GridSpec> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A structured grid ready for intersection.
#[derive(Debug, PartialEq, Clone)]
pub struct StructuredGrid {
    xoff: f64,
    yoff: f64,
    /// Column edges measured from the left boundary, `ncol + 1` values.
    col_edges: Vec<f64>,
    /// Row edges measured from the top boundary, `nrow + 1` values.
    row_edges: Vec<f64>,
}

fn cumulative_edges(sizes: &[f64], axis: &str) -> Result<Vec<f64>> {
    if sizes.is_empty() {
        return Err(SfdError::InvalidGrid(format!("no {} spacing given", axis)));
    }
    let mut edges = Vec::with_capacity(sizes.len() + 1);
    let mut total = 0.0;
    edges.push(total);
    for (i, &size) in sizes.iter().enumerate() {
        if !(size.is_finite() && size > 0.0) {
            return Err(SfdError::InvalidGrid(format!(
                "{} spacing {} is {}, expected a positive number",
                axis, i, size
            )));
        }
        total += size;
        edges.push(total);
    }
    Ok(edges)
}

/// Index of the half-open interval of `edges` containing `v`.
fn interval(edges: &[f64], v: f64) -> Option<usize> {
    let last = *edges.last()?;
    if !(v >= 0.0 && v < last) {
        return None;
    }
    Some(edges.partition_point(|&e| e <= v) - 1)
}

impl StructuredGrid {
    pub fn from_spec(spec: &GridSpec) -> Result<StructuredGrid> {
        let (xoff, yoff, delr, delc) = match spec {
            GridSpec::Explicit {
                xoff,
                yoff,
                delr,
                delc,
            } => (*xoff, *yoff, delr.clone(), delc.clone()),
            GridSpec::Uniform {
                xoff,
                yoff,
                nrow,
                ncol,
                cell_size,
            } => (*xoff, *yoff, vec![*cell_size; *ncol], vec![*cell_size; *nrow]),
        };
        Ok(StructuredGrid {
            xoff,
            yoff,
            col_edges: cumulative_edges(&delr, "column")?,
            row_edges: cumulative_edges(&delc, "row")?,
        })
    }

    pub fn nrow(&self) -> usize {
        self.row_edges.len() - 1
    }

    pub fn ncol(&self) -> usize {
        self.col_edges.len() - 1
    }

    fn height(&self) -> f64 {
        self.row_edges[self.nrow()]
    }

    /// Zero-based `(row, col)` of the cell containing `(x, y)`, or `None`
    /// outside the grid.
    pub fn intersect(&self, x: f64, y: f64) -> Option<(i64, i64)> {
        let col = interval(&self.col_edges, x - self.xoff)?;
        let row = interval(&self.row_edges, self.height() - (y - self.yoff))?;
        Some((row as i64, col as i64))
    }

    /// Read a point table with planar `x`, `y` and address each point by the
    /// grid cell containing it.
    ///
    /// Existing `row`/`col` columns are replaced. A point outside the grid is
    /// an error.
    pub fn locate_points(&self, csv_data: &str, id_column: &str) -> Result<PointTable> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_data.as_bytes());
        let headers = rdr.headers()?.clone();
        let id_aliases = [id_column];
        let idx = require_columns(
            "points",
            &headers,
            &[
                Column::new(id_column, &id_aliases),
                Column::new("x", X_ALIASES),
                Column::new("y", Y_ALIASES),
            ],
        )?;
        let mut claimed = idx.clone();
        claimed.extend(find_column(&headers, ROW_ALIASES));
        claimed.extend(find_column(&headers, COL_ALIASES));
        let attributes = attribute_positions(&headers, &claimed);

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let fields = FieldReader::new("points", &record);
            let id = fields.text(idx[0]).to_string();
            let x = fields.real(idx[1], "x")?;
            let y = fields.real(idx[2], "y")?;
            let (row, col) = self
                .intersect(x, y)
                .ok_or_else(|| SfdError::PointOutsideGrid { id: id.clone(), x, y })?;
            log::debug!("[SFD] grid: {} at ({}, {}) -> cell ({}, {})", id, x, y, row, col);
            points.push(Point {
                id,
                row,
                col,
                x: Some(x),
                y: Some(y),
                attributes: attributes
                    .iter()
                    .map(|&i| fields.text(i).to_string())
                    .collect(),
            });
        }
        check_unique(points.iter().map(|p| p.id.as_str()))?;
        log::info!(
            "[SFD] grid: Located {} points on a {}x{} grid",
            points.len(),
            self.nrow(),
            self.ncol()
        );

        Ok(PointTable {
            id_column: id_column.to_string(),
            attribute_names: attributes
                .iter()
                .map(|&i| headers.get(i).unwrap_or("").to_string())
                .collect(),
            has_planar: true,
            points,
        })
    }
}
