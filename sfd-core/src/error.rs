/// Error types for the SFD core library
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for table, grid and run-output operations
#[derive(Error, Debug)]
pub enum SfdError {
    /// A required run output or table file does not exist
    #[error("Missing input file: {}", .0.display())]
    MissingInputFile(PathBuf),

    /// Required columns are absent from an input table
    #[error("Table '{table}' is missing required column(s): {}", .missing.join(", "))]
    SchemaMismatch { table: String, missing: Vec<String> },

    /// A field could not be parsed as the expected type
    #[error("Table '{table}' line {line}: invalid {column} value {value:?}")]
    InvalidValue {
        table: String,
        line: u64,
        column: String,
        value: String,
    },

    /// A point identity appears more than once in a point table
    #[error("Duplicate point identity: {0}")]
    DuplicatePoint(String),

    /// Planar coordinates fall outside the structured grid
    #[error("Point {id} at ({x}, {y}) lies outside the model grid")]
    PointOutsideGrid { id: String, x: f64, y: f64 },

    /// Stream listing output could not be parsed
    #[error("Invalid stream listing at line {line}: {reason}")]
    InvalidListing { line: usize, reason: String },

    /// Grid definition is unusable
    #[error("Invalid grid definition: {0}")]
    InvalidGrid(String),

    /// Failed to read or write CSV data
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Grid definition JSON could not be parsed
    #[error("Failed to parse grid definition: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying file read failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Results using SfdError
pub type Result<T> = std::result::Result<T, SfdError>;
