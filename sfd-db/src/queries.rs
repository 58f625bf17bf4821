//! Typed query methods for the snapping and run alignment steps.
//!
//! # Ordering
//!
//! Results follow input order: points in load order, then offsets in
//! window order, then network cells in load order. Flux rows of one cell
//! keep the order in which the run listed them.

use crate::models::SnapCandidate;
use crate::Database;
use rusqlite::params;
use sfd_core::depletion::{depletion_of, DepletionRecord};
use sfd_core::flux::{FluxQuantities, Run, TimeIndex};
use sfd_core::network::NetworkCell;

/// Six quantities starting at column `first`; NULL reads back as NaN.
fn quantities(row: &rusqlite::Row<'_>, first: usize) -> rusqlite::Result<[f64; 6]> {
    let mut values = [f64::NAN; 6];
    for (i, value) in values.iter_mut().enumerate() {
        if let Some(v) = row.get::<_, Option<f64>>(first + i)? {
            *value = v;
        }
    }
    Ok(values)
}

impl Database {
    // ───────────────────── Snapping Queries ─────────────────────

    /// Every network cell inside each point's search window.
    ///
    /// The window is the cross product of the loaded search offsets applied
    /// to the point's own cell. Points with no network cell in their window
    /// produce no rows.
    pub fn query_snap_candidates(&self) -> anyhow::Result<Vec<SnapCandidate>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.point_id, o.di, o.dj, n.row, n.col, n.reach_id, n.segment, n.reach
             FROM points p
             CROSS JOIN search_offsets o
             JOIN network_cells n ON n.row = p.row + o.di AND n.col = p.col + o.dj
             ORDER BY p.seq, o.seq, n.seq",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SnapCandidate {
                    point_id: row.get(0)?,
                    di: row.get(1)?,
                    dj: row.get(2)?,
                    cell: NetworkCell {
                        row: row.get(3)?,
                        col: row.get(4)?,
                        reach_id: row.get(5)?,
                        segment: row.get(6)?,
                        reach: row.get(7)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        log::info!(
            "[SFD] query: query_snap_candidates returned {} records",
            rows.len()
        );
        Ok(rows)
    }

    // ───────────────────── Depletion Queries ─────────────────────

    /// Historical fluxes at each snapped cell, aligned with the baseline.
    ///
    /// Every historical row at a snapped cell is kept. The baseline side is
    /// matched on point, cell and time index and is `None` where the
    /// baseline has no such row. Baseline rows without a historical
    /// counterpart are dropped.
    pub fn query_depletion(&self) -> anyhow::Result<Vec<DepletionRecord>> {
        let mut stmt = self.conn.prepare(
            "WITH at_points AS (
                 SELECT s.seq AS point_seq, s.point_id, f.seq AS flux_seq, f.run,
                        f.timestep, f.stress_period, f.row, f.col, f.segment, f.reach,
                        f.q_in, f.q_aquifer, f.q_out, f.q_overland, f.q_precip, f.q_et
                 FROM snapped_points s
                 JOIN flux f ON f.row = s.row AND f.col = s.col
             ),
             h AS (SELECT * FROM at_points WHERE run = ?1),
             b AS (SELECT * FROM at_points WHERE run = ?2)
             SELECT h.point_id, h.row, h.col, h.segment, h.reach,
                    h.timestep, h.stress_period,
                    h.q_in, h.q_aquifer, h.q_out, h.q_overland, h.q_precip, h.q_et,
                    b.q_in, b.q_aquifer, b.q_out, b.q_overland, b.q_precip, b.q_et,
                    b.flux_seq
             FROM h
             LEFT JOIN b
               ON b.point_id = h.point_id
              AND b.row = h.row
              AND b.col = h.col
              AND b.timestep = h.timestep
              AND b.stress_period = h.stress_period
             ORDER BY h.point_seq, h.flux_seq, b.flux_seq",
        )?;
        let rows = stmt
            .query_map(
                params![Run::Historical.as_str(), Run::Baseline.as_str()],
                |row| {
                    let historical = FluxQuantities::from_array(quantities(row, 7)?);
                    let baseline = match row.get::<_, Option<i64>>(19)? {
                        Some(_) => Some(FluxQuantities::from_array(quantities(row, 13)?)),
                        None => None,
                    };
                    Ok(DepletionRecord {
                        id: row.get(0)?,
                        row: row.get(1)?,
                        col: row.get(2)?,
                        segment: row.get(3)?,
                        reach: row.get(4)?,
                        time: TimeIndex::new(row.get(5)?, row.get(6)?),
                        depletion: depletion_of(&historical, baseline.as_ref()),
                        historical,
                        baseline,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        log::info!(
            "[SFD] query: query_depletion returned {} records",
            rows.len()
        );
        Ok(rows)
    }

    /// Identities of snapped points that have at least one historical row.
    pub fn query_points_with_flux(&self) -> anyhow::Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.point_id
             FROM snapped_points s
             WHERE EXISTS (
                 SELECT 1 FROM flux f
                 WHERE f.run = ?1 AND f.row = s.row AND f.col = s.col
             )
             GROUP BY s.point_id
             ORDER BY MIN(s.seq)",
        )?;
        let rows = stmt
            .query_map(params![Run::Historical.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(rows)
    }
}
