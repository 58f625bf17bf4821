//! Loading functions for populating the in-memory SQLite database.
//!
//! Inputs arrive already parsed into `sfd-core` types; each loader inserts
//! its rows inside one transaction, in slice order. Insertion order is kept
//! in the `seq` column and drives the order of query results.

use crate::Database;
use rusqlite::params;
use sfd_core::flux::{FluxRecord, Run};
use sfd_core::network::NetworkCell;
use sfd_core::point::Point;
use sfd_core::snapped::SnappedPoint;

impl Database {
    /// Load input points with their grid cell.
    ///
    /// Point identities must be unique; a repeated identity fails the load.
    pub fn load_points(&self, points: &[Point]) -> anyhow::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO points (point_id, row, col) VALUES (?1, ?2, ?3)")?;
            for point in points {
                stmt.execute(params![point.id, point.row, point.col])?;
            }
        }
        tx.commit()?;
        log::info!("[SFD] loader: Loaded {} points", points.len());
        Ok(())
    }

    /// Load the `(di, dj)` offsets of the search window, in window order.
    pub fn load_search_offsets(&self, offsets: &[(i64, i64)]) -> anyhow::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO search_offsets (di, dj) VALUES (?1, ?2)")?;
            for (di, dj) in offsets {
                stmt.execute(params![di, dj])?;
            }
        }
        tx.commit()?;
        log::info!("[SFD] loader: Loaded {} search offsets", offsets.len());
        Ok(())
    }

    /// Load stream network cells.
    pub fn load_network(&self, cells: &[NetworkCell]) -> anyhow::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO network_cells (row, col, reach_id, segment, reach)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for cell in cells {
                stmt.execute(params![cell.row, cell.col, cell.reach_id, cell.segment, cell.reach])?;
            }
        }
        tx.commit()?;
        log::info!("[SFD] loader: Loaded {} network cells", cells.len());
        Ok(())
    }

    /// Load snapped points, one row per resolved cell.
    ///
    /// Unresolved points have no cell and are skipped; ambiguous points
    /// contribute one row per tied cell.
    pub fn load_snapped_points(&self, points: &[SnappedPoint]) -> anyhow::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0u32;
        let mut skipped = 0u32;
        {
            let mut stmt =
                tx.prepare("INSERT INTO snapped_points (point_id, row, col) VALUES (?1, ?2, ?3)")?;
            for point in points {
                if point.resolution.is_unresolved() {
                    skipped += 1;
                    continue;
                }
                for cell in point.resolution.cells() {
                    stmt.execute(params![point.id, cell.row, cell.col])?;
                    count += 1;
                }
            }
        }
        tx.commit()?;
        log::info!(
            "[SFD] loader: Loaded {} snapped cells (skipped {} unresolved points)",
            count,
            skipped
        );
        Ok(())
    }

    /// Load the flux table of one run.
    pub fn load_flux(&self, run: Run, records: &[FluxRecord]) -> anyhow::Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO flux (run, timestep, stress_period, row, col, segment, reach,
                                   q_in, q_aquifer, q_out, q_overland, q_precip, q_et)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for r in records {
                let q = &r.quantities;
                stmt.execute(params![
                    run.as_str(),
                    r.time.timestep,
                    r.time.stress_period,
                    r.row,
                    r.col,
                    r.segment,
                    r.reach,
                    q.q_in,
                    q.q_aquifer,
                    q.q_out,
                    q.q_overland,
                    q.q_precip,
                    q.q_et,
                ])?;
            }
        }
        tx.commit()?;
        log::info!(
            "[SFD] loader: Loaded {} {} flux records",
            records.len(),
            run.as_str()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfd_core::flux::{FluxQuantities, TimeIndex};
    use sfd_core::snapped::Resolution;

    fn count(db: &Database, sql: &str) -> i64 {
        db.conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    fn cell(row: i64, col: i64) -> NetworkCell {
        NetworkCell {
            row,
            col,
            reach_id: 1,
            segment: 1,
            reach: 1,
        }
    }

    #[test]
    fn load_points_inserts_rows() {
        let db = Database::new().unwrap();
        db.load_points(&[Point::new("G1", 5, 11), Point::new("G2", 2, 2)])
            .unwrap();
        assert_eq!(count(&db, "SELECT COUNT(*) FROM points"), 2);
    }

    #[test]
    fn load_points_rejects_duplicate_ids() {
        let db = Database::new().unwrap();
        let result = db.load_points(&[Point::new("G1", 5, 11), Point::new("G1", 2, 2)]);
        assert!(result.is_err(), "Duplicate point ids should be rejected");
        // the failed transaction leaves nothing behind
        assert_eq!(count(&db, "SELECT COUNT(*) FROM points"), 0);
    }

    #[test]
    fn load_snapped_points_expands_ties_and_skips_unresolved() {
        let db = Database::new().unwrap();
        let snapped = vec![
            SnappedPoint::from_point(&Point::new("A", 0, 0), Resolution::Resolved(cell(0, 1))),
            SnappedPoint::from_point(
                &Point::new("B", 3, 3),
                Resolution::Ambiguous(vec![cell(3, 2), cell(3, 4)]),
            ),
            SnappedPoint::from_point(&Point::new("C", 9, 9), Resolution::Unresolved),
        ];
        db.load_snapped_points(&snapped).unwrap();
        assert_eq!(count(&db, "SELECT COUNT(*) FROM snapped_points"), 3);
        assert_eq!(
            count(&db, "SELECT COUNT(*) FROM snapped_points WHERE point_id = 'C'"),
            0
        );
    }

    #[test]
    fn load_flux_tags_run() {
        let db = Database::new().unwrap();
        let record = FluxRecord {
            time: TimeIndex::new(0, 0),
            layer: Some(0),
            row: 1,
            col: 1,
            segment: 1,
            reach: 1,
            quantities: FluxQuantities::default(),
        };
        db.load_flux(Run::Historical, &[record.clone(), record.clone()])
            .unwrap();
        db.load_flux(Run::Baseline, &[record]).unwrap();
        assert_eq!(
            count(&db, "SELECT COUNT(*) FROM flux WHERE run = 'historical'"),
            2
        );
        assert_eq!(
            count(&db, "SELECT COUNT(*) FROM flux WHERE run = 'baseline'"),
            1
        );
    }
}
