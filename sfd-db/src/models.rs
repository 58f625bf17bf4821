//! Query result model structs.

use sfd_core::network::NetworkCell;
use serde::Serialize;

/// A network cell reached from a point through one search offset.
///
/// Produced by the candidate join of points, offsets and network cells.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SnapCandidate {
    pub point_id: String,
    /// Row offset from the point's cell.
    pub di: i64,
    /// Column offset from the point's cell.
    pub dj: i64,
    pub cell: NetworkCell,
}

impl SnapCandidate {
    /// True when the candidate is the point's own cell.
    pub fn is_unshifted(&self) -> bool {
        self.di == 0 && self.dj == 0
    }
}
