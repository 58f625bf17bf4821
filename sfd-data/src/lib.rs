//! Snapping and depletion analysis over the in-memory database.
//!
//! This crate turns parsed inputs into results: points are snapped onto
//! the stream network, and the fluxes of two runs are aligned at the
//! snapped cells and differenced.

/// Snapping points onto the stream network.
pub mod snap {
    use anyhow::Context;
    use itertools::Itertools;
    use sfd_core::network::NetworkCell;
    use sfd_core::point::{Point, PointTable, DEFAULT_ID_COLUMN};
    use sfd_core::snapped::{Resolution, SnappedPoint, SnappedTable};
    use sfd_db::models::SnapCandidate;
    use sfd_db::Database;
    use std::collections::{HashMap, HashSet};

    /// Which candidates count as a direct match before falling back to the
    /// most upstream reach.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum DirectMatchRule {
        /// The point's own cell, when its row and column both occur among
        /// the input points.
        #[default]
        Unshifted,
        /// Any cell in the window whose row and column both occur among the
        /// input points.
        GlobalPresence,
    }

    /// Which candidate rows a fallback selects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum FallbackScope {
        /// Only the falling-back point's own candidates.
        #[default]
        OwnCandidates,
        /// Every candidate row carrying the fallback `reach_id`, whichever
        /// point it belongs to. A point whose window holds such a cell gains
        /// it in addition to its own result.
        SharedCandidates,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct SnapConfig {
        pub id_column: String,
        pub search_offsets: Vec<(i64, i64)>,
        pub direct_match: DirectMatchRule,
        pub fallback: FallbackScope,
    }

    impl Default for SnapConfig {
        fn default() -> Self {
            SnapConfig {
                id_column: DEFAULT_ID_COLUMN.to_string(),
                search_offsets: sfd_utils::window::default_offsets(),
                direct_match: DirectMatchRule::default(),
                fallback: FallbackScope::default(),
            }
        }
    }

    impl SnapConfig {
        /// Square window built from one list of distances per axis.
        pub fn with_search_distance(mut self, distance: &[i64]) -> Self {
            self.search_offsets = sfd_utils::window::search_offsets(distance);
            self
        }
    }

    fn direct_cells(
        candidates: &[&SnapCandidate],
        rule: DirectMatchRule,
        point_rows: &HashSet<i64>,
        point_cols: &HashSet<i64>,
    ) -> Vec<NetworkCell> {
        candidates
            .iter()
            .filter(|c| rule == DirectMatchRule::GlobalPresence || c.is_unshifted())
            .filter(|c| point_rows.contains(&c.cell.row) && point_cols.contains(&c.cell.col))
            .map(|c| c.cell)
            .unique()
            .collect()
    }

    /// Smallest `reach_id` among the candidates.
    fn upstream_reach(candidates: &[&SnapCandidate]) -> Option<i64> {
        candidates.iter().map(|c| c.cell.reach_id).min()
    }

    fn candidates_of<'a>(
        by_point: &'a HashMap<&str, Vec<&'a SnapCandidate>>,
        id: &str,
    ) -> &'a [&'a SnapCandidate] {
        by_point.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve one point from its candidates.
    ///
    /// `point_rows` and `point_cols` are the rows and columns of every input
    /// point.
    pub fn resolve(
        candidates: &[&SnapCandidate],
        rule: DirectMatchRule,
        point_rows: &HashSet<i64>,
        point_cols: &HashSet<i64>,
    ) -> Resolution {
        let direct = direct_cells(candidates, rule, point_rows, point_cols);
        if !direct.is_empty() {
            return Resolution::from_cells(direct);
        }

        let Some(upstream) = upstream_reach(candidates) else {
            return Resolution::Unresolved;
        };
        Resolution::from_cells(
            candidates
                .iter()
                .filter(|c| c.cell.reach_id == upstream)
                .map(|c| c.cell)
                .unique()
                .collect(),
        )
    }

    /// Snap every point onto the network, in input order.
    pub fn snap_points(
        points: &[Point],
        network: &[NetworkCell],
        config: &SnapConfig,
    ) -> anyhow::Result<Vec<SnappedPoint>> {
        let db = Database::new()?;
        db.load_points(points).context("loading points")?;
        db.load_search_offsets(&config.search_offsets)?;
        db.load_network(network).context("loading stream network")?;
        let candidates = db.query_snap_candidates()?;

        let mut by_point: HashMap<&str, Vec<&SnapCandidate>> = HashMap::new();
        for candidate in &candidates {
            by_point
                .entry(candidate.point_id.as_str())
                .or_default()
                .push(candidate);
        }
        let point_rows: HashSet<i64> = points.iter().map(|p| p.row).collect();
        let point_cols: HashSet<i64> = points.iter().map(|p| p.col).collect();

        // reach ids chosen by some point's fallback
        let shared: HashSet<i64> = match config.fallback {
            FallbackScope::OwnCandidates => HashSet::new(),
            FallbackScope::SharedCandidates => points
                .iter()
                .map(|p| candidates_of(&by_point, &p.id))
                .filter(|own| {
                    direct_cells(own, config.direct_match, &point_rows, &point_cols).is_empty()
                })
                .filter_map(upstream_reach)
                .collect(),
        };

        let mut snapped = Vec::with_capacity(points.len());
        for point in points {
            let own = candidates_of(&by_point, &point.id);
            let mut resolution = resolve(own, config.direct_match, &point_rows, &point_cols);
            if !shared.is_empty() {
                let cells = resolution
                    .cells()
                    .iter()
                    .copied()
                    .chain(
                        own.iter()
                            .filter(|c| shared.contains(&c.cell.reach_id))
                            .map(|c| c.cell),
                    )
                    .unique()
                    .collect();
                resolution = Resolution::from_cells(cells);
            }
            match &resolution {
                Resolution::Resolved(cell) => log::debug!(
                    "[SFD] snap: {} ({}, {}) -> ({}, {}) reach_id {}",
                    point.id,
                    point.row,
                    point.col,
                    cell.row,
                    cell.col,
                    cell.reach_id
                ),
                Resolution::Ambiguous(cells) => log::warn!(
                    "[SFD] snap: {} ({}, {}) is ambiguous between {} cells",
                    point.id,
                    point.row,
                    point.col,
                    cells.len()
                ),
                Resolution::Unresolved => log::warn!(
                    "[SFD] snap: {} ({}, {}) has no network cell in its search window",
                    point.id,
                    point.row,
                    point.col
                ),
            }
            snapped.push(SnappedPoint::from_point(point, resolution));
        }
        Ok(snapped)
    }

    /// Snap a point table and keep its column layout.
    pub fn snap_table(
        table: &PointTable,
        network: &[NetworkCell],
        config: &SnapConfig,
    ) -> anyhow::Result<SnappedTable> {
        let points = snap_points(&table.points, network, config)?;
        let snapped = SnappedTable {
            id_column: table.id_column.clone(),
            attribute_names: table.attribute_names.clone(),
            has_planar: table.has_planar,
            points,
        };
        let summary = snapped.summary();
        log::info!(
            "[SFD] snap: {} resolved, {} ambiguous, {} unresolved",
            summary.resolved,
            summary.ambiguous,
            summary.unresolved
        );
        Ok(snapped)
    }

}

/// Streamflow depletion between a historical and a baseline run.
pub mod depletion {
    use anyhow::Context;
    use sfd_core::depletion::DepletionRecord;
    use sfd_core::flux::{FluxRecord, Run};
    use sfd_core::run::{RunFormat, RunHandle, RunReader, DEFAULT_OUTPUT_FILE};
    use sfd_core::snapped::SnappedPoint;
    use sfd_db::Database;
    use std::collections::HashSet;
    use std::path::PathBuf;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct EvaluateConfig {
        pub format: RunFormat,
        /// Output file name inside each run directory.
        pub output_file: String,
    }

    impl Default for EvaluateConfig {
        fn default() -> Self {
            EvaluateConfig {
                format: RunFormat::default(),
                output_file: DEFAULT_OUTPUT_FILE.to_string(),
            }
        }
    }

    impl EvaluateConfig {
        pub fn run_handle(&self, dir: impl Into<PathBuf>) -> RunHandle {
            RunHandle::new(dir).with_file_name(&self.output_file)
        }

        pub fn reader(&self) -> Box<dyn RunReader> {
            self.format.reader()
        }
    }

    /// Read both runs and compute depletion at the snapped points.
    ///
    /// Both runs are read before any alignment; a missing output file
    /// fails the whole evaluation.
    pub fn evaluate(
        points: &[SnappedPoint],
        historical: &RunHandle,
        baseline: &RunHandle,
        reader: &dyn RunReader,
    ) -> anyhow::Result<Vec<DepletionRecord>> {
        let historical_records = reader
            .read_run(historical)
            .with_context(|| format!("reading historical run {}", historical.dir.display()))?;
        let baseline_records = reader
            .read_run(baseline)
            .with_context(|| format!("reading baseline run {}", baseline.dir.display()))?;
        evaluate_records(points, &historical_records, &baseline_records)
    }

    /// Keep the rows whose row and column each occur among the snapped cells.
    fn at_snapped_cells(
        records: &[FluxRecord],
        rows: &HashSet<i64>,
        cols: &HashSet<i64>,
    ) -> Vec<FluxRecord> {
        records
            .iter()
            .filter(|r| rows.contains(&r.row) && cols.contains(&r.col))
            .cloned()
            .collect()
    }

    /// Align already loaded flux tables at the snapped points.
    ///
    /// Rows follow point order, then the historical run's row order.
    pub fn evaluate_records(
        points: &[SnappedPoint],
        historical: &[FluxRecord],
        baseline: &[FluxRecord],
    ) -> anyhow::Result<Vec<DepletionRecord>> {
        let cells: Vec<_> = points.iter().flat_map(|p| p.resolution.cells()).collect();
        let rows: HashSet<i64> = cells.iter().map(|c| c.row).collect();
        let cols: HashSet<i64> = cells.iter().map(|c| c.col).collect();

        let historical = at_snapped_cells(historical, &rows, &cols);
        let baseline = at_snapped_cells(baseline, &rows, &cols);
        log::info!(
            "[SFD] depletion: {} historical and {} baseline rows near {} snapped cells",
            historical.len(),
            baseline.len(),
            cells.len()
        );

        let db = Database::new()?;
        db.load_snapped_points(points)
            .context("loading snapped points")?;
        db.load_flux(Run::Historical, &historical)
            .context("loading historical fluxes")?;
        db.load_flux(Run::Baseline, &baseline)
            .context("loading baseline fluxes")?;

        let with_flux: HashSet<String> = db.query_points_with_flux()?.into_iter().collect();
        for point in points {
            if point.resolution.is_unresolved() {
                log::debug!("[SFD] depletion: skipping unresolved point {}", point.id);
            } else if !with_flux.contains(&point.id) {
                log::warn!("[SFD] depletion: no flux rows for point {}", point.id);
            }
        }

        let records = db.query_depletion()?;
        let unmatched = records.iter().filter(|r| r.baseline.is_none()).count();
        if unmatched > 0 {
            log::warn!(
                "[SFD] depletion: {} historical rows have no baseline counterpart",
                unmatched
            );
        }
        Ok(records)
    }

}
