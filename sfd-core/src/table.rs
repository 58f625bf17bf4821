//! Header lookup and field parsing shared by every CSV table reader.
//!
//! Column names vary between model exports (`i`/`row`, `iseg`/`segment`,
//! `reachID`/`reach_id`), so each logical column is looked up through a list of
//! accepted aliases, compared case-insensitively. Every missing column is
//! reported at once through [`SfdError::SchemaMismatch`].

use crate::error::{Result, SfdError};
use csv::StringRecord;
use std::path::Path;

/// Read a table file into memory, reporting absence as `MissingInputFile`.
pub fn read_table_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(SfdError::MissingInputFile(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Position of the first header matching any alias.
pub fn find_column(headers: &StringRecord, aliases: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| aliases.iter().any(|a| h.trim().eq_ignore_ascii_case(a)))
}

/// A logical column and the header names it may appear under.
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub name: &'a str,
    pub aliases: &'a [&'a str],
}

impl<'a> Column<'a> {
    pub const fn new(name: &'a str, aliases: &'a [&'a str]) -> Self {
        Self { name, aliases }
    }

    /// Position of this column in `headers`, if present.
    pub fn find(&self, headers: &StringRecord) -> Option<usize> {
        find_column(headers, self.aliases)
    }
}

/// Resolve required columns, returning header positions in the order requested.
pub fn require_columns(
    table: &str,
    headers: &StringRecord,
    columns: &[Column<'_>],
) -> Result<Vec<usize>> {
    let mut positions = Vec::with_capacity(columns.len());
    let mut missing = Vec::new();
    for column in columns {
        match column.find(headers) {
            Some(idx) => positions.push(idx),
            None => missing.push(column.name.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(SfdError::SchemaMismatch {
            table: table.to_string(),
            missing,
        });
    }
    Ok(positions)
}

/// Typed access to the fields of one record, with errors naming the table,
/// line and column.
pub struct FieldReader<'a> {
    table: &'a str,
    record: &'a StringRecord,
}

impl<'a> FieldReader<'a> {
    pub fn new(table: &'a str, record: &'a StringRecord) -> Self {
        Self { table, record }
    }

    /// Trimmed text of a field; empty when the record is short.
    pub fn text(&self, idx: usize) -> &'a str {
        self.record.get(idx).unwrap_or("").trim()
    }

    /// An `InvalidValue` error for this record.
    pub fn invalid(&self, column: &str, value: &str) -> SfdError {
        SfdError::InvalidValue {
            table: self.table.to_string(),
            line: self.record.position().map(|p| p.line()).unwrap_or(0),
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    /// An integer grid index. Whole-valued reals such as `5.0` are accepted.
    pub fn index(&self, idx: usize, column: &str) -> Result<i64> {
        self.optional_index(idx, column)?
            .ok_or_else(|| self.invalid(column, ""))
    }

    /// An integer grid index, `None` when the field is empty.
    pub fn optional_index(&self, idx: usize, column: &str) -> Result<Option<i64>> {
        let s = self.text(idx);
        if s.is_empty() {
            return Ok(None);
        }
        if let Ok(v) = s.parse::<i64>() {
            return Ok(Some(v));
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(Some(v as i64)),
            _ => Err(self.invalid(column, s)),
        }
    }

    /// A real value.
    pub fn real(&self, idx: usize, column: &str) -> Result<f64> {
        self.optional_real(idx, column)?
            .ok_or_else(|| self.invalid(column, ""))
    }

    /// A real value, `None` when the field is empty.
    pub fn optional_real(&self, idx: usize, column: &str) -> Result<Option<f64>> {
        let s = self.text(idx);
        if s.is_empty() {
            return Ok(None);
        }
        s.parse::<f64>()
            .map(Some)
            .map_err(|_| self.invalid(column, s))
    }
}

/// Flush an in-memory CSV writer into a string.
pub fn finish_writer(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes)
        .map_err(|e| SfdError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Write an optional value as an empty field when absent.
pub fn optional_field<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use csv::ReaderBuilder;

    fn first_record(data: &str) -> (StringRecord, StringRecord) {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        let record = rdr.records().next().unwrap().unwrap();
        (headers, record)
    }

    #[test]
    fn test_aliases_are_case_insensitive() {
        let (headers, _) = first_record("I,J,reachID\n1,2,3\n");
        assert_eq!(find_column(&headers, &["row", "i"]), Some(0));
        assert_eq!(find_column(&headers, &["reach_id", "reachid"]), Some(2));
        assert_eq!(find_column(&headers, &["segment", "iseg"]), None);
    }

    #[test]
    fn test_require_columns_lists_every_missing_column() {
        let (headers, _) = first_record("row,col\n1,2\n");
        let err = require_columns(
            "network",
            &headers,
            &[
                Column::new("row", &["row"]),
                Column::new("reach_id", &["reach_id"]),
                Column::new("segment", &["segment"]),
            ],
        )
        .unwrap_err();
        match err {
            SfdError::SchemaMismatch { table, missing } => {
                assert_eq!(table, "network");
                assert_eq!(missing, vec!["reach_id", "segment"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_index_accepts_whole_reals() {
        let (_, record) = first_record("row,col,x\n5.0,7,1.5\n");
        let fields = FieldReader::new("points", &record);
        assert_eq!(fields.index(0, "row").unwrap(), 5);
        assert_eq!(fields.index(1, "col").unwrap(), 7);
        assert!(fields.index(2, "x").is_err());
    }

    #[test]
    fn test_optional_fields() {
        let (_, record) = first_record("row,x\n,\n");
        let fields = FieldReader::new("points", &record);
        assert_eq!(fields.optional_index(0, "row").unwrap(), None);
        assert_eq!(fields.optional_real(1, "x").unwrap(), None);
        assert!(fields.real(1, "x").is_err());
        assert_eq!(optional_field::<f64>(None), "");
        assert_eq!(optional_field(Some(2.5)), "2.5");
    }

    #[test]
    fn test_missing_file() {
        let err = read_table_file(Path::new("definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, SfdError::MissingInputFile(_)));
    }
}
