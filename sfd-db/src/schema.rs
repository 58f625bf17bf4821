//! SQL schema definitions for the in-memory SQLite database.
//!
//! Contains CREATE TABLE statements for the snapping and run alignment
//! tables. The schema is applied as a single batch when the database is
//! initialized.

/// Returns the full SQL schema as a single batch string.
///
/// This creates the following tables:
///
/// **Snapping tables:**
/// - `points` - Input points with their intersected grid cell
/// - `search_offsets` - `(di, dj)` offsets of the neighbourhood search window
/// - `network_cells` - Stream network reach data
///
/// **Depletion tables:**
/// - `snapped_points` - One row per (point, resolved cell)
/// - `flux` - Per-cell, per-time-step stream fluxes of both runs, keyed by `run`
///
/// `seq` columns record insertion order so that query results follow input
/// order. Flux quantities are nullable: SQLite stores a NaN as NULL.
pub fn create_schema() -> &'static str {
    r#"
    CREATE TABLE IF NOT EXISTS points (
        seq INTEGER PRIMARY KEY,
        point_id TEXT NOT NULL UNIQUE,
        row INTEGER NOT NULL,
        col INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS search_offsets (
        seq INTEGER PRIMARY KEY,
        di INTEGER NOT NULL,
        dj INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS network_cells (
        seq INTEGER PRIMARY KEY,
        row INTEGER NOT NULL,
        col INTEGER NOT NULL,
        reach_id INTEGER NOT NULL,
        segment INTEGER NOT NULL,
        reach INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_network_cell ON network_cells(row, col);

    CREATE TABLE IF NOT EXISTS snapped_points (
        seq INTEGER PRIMARY KEY,
        point_id TEXT NOT NULL,
        row INTEGER NOT NULL,
        col INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_snapped_cell ON snapped_points(row, col);

    CREATE TABLE IF NOT EXISTS flux (
        seq INTEGER PRIMARY KEY,
        run TEXT NOT NULL CHECK (run IN ('historical', 'baseline')),
        timestep INTEGER NOT NULL,
        stress_period INTEGER NOT NULL,
        row INTEGER NOT NULL,
        col INTEGER NOT NULL,
        segment INTEGER NOT NULL,
        reach INTEGER NOT NULL,
        q_in REAL,
        q_aquifer REAL,
        q_out REAL,
        q_overland REAL,
        q_precip REAL,
        q_et REAL
    );
    CREATE INDEX IF NOT EXISTS idx_flux_run_cell ON flux(run, row, col);

    "#
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn schema_is_valid_sql() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(create_schema())
            .expect("Schema SQL should be valid");
    }

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(create_schema()).unwrap();

        let expected_tables = [
            "points",
            "search_offsets",
            "network_cells",
            "snapped_points",
            "flux",
        ];

        for table in &expected_tables {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table '{}' should exist", table);
        }
    }

    #[test]
    fn flux_rejects_unknown_run() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(create_schema()).unwrap();
        let result = conn.execute(
            "INSERT INTO flux (run, timestep, stress_period, row, col, segment, reach,
                               q_in, q_aquifer, q_out, q_overland, q_precip, q_et)
             VALUES ('scenario', 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0)",
            [],
        );
        assert!(result.is_err(), "Only historical and baseline runs are allowed");
    }

    #[test]
    fn flux_accepts_missing_quantities() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(create_schema()).unwrap();
        conn.execute(
            "INSERT INTO flux (run, timestep, stress_period, row, col, segment, reach,
                               q_in, q_aquifer, q_out, q_overland, q_precip, q_et)
             VALUES ('historical', 0, 0, 0, 0, 1, 1, 0, 0, ?1, 0, 0, 0)",
            [f64::NAN],
        )
        .expect("A NaN quantity should be stored as NULL");
        let q_out: Option<f64> = conn
            .query_row("SELECT q_out FROM flux", [], |row| row.get(0))
            .unwrap();
        assert_eq!(q_out, None);
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(create_schema()).unwrap();
        // Applying schema a second time should not fail due to IF NOT EXISTS.
        conn.execute_batch(create_schema())
            .expect("Applying schema twice should succeed due to IF NOT EXISTS");
    }
}
