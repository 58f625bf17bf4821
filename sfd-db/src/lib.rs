//! In-memory SQLite database layer for gauge snapping and run alignment.
//!
//! Points, the neighbourhood search window, stream network cells and the
//! flux tables of both model runs are loaded into an in-memory SQLite
//! database. The relational steps of the analysis are expressed as typed
//! query methods over those tables:
//!
//! - the candidate join of points, search offsets and network cells
//! - the alignment of historical and baseline fluxes on snapped cells
//!
//! # Usage
//!
//! ```rust
//! use sfd_core::network::NetworkCell;
//! use sfd_core::point::Point;
//! use sfd_db::Database;
//!
//! let db = Database::new().unwrap();
//! db.load_points(&[Point::new("G1", 5, 11)]).unwrap();
//! db.load_search_offsets(&[(-1, -1), (0, -1), (0, 0)]).unwrap();
//! db.load_network(&[NetworkCell { row: 5, col: 10, reach_id: 3, segment: 1, reach: 3 }])
//!     .unwrap();
//!
//! let candidates = db.query_snap_candidates().unwrap();
//! assert_eq!(candidates.len(), 1);
//! assert_eq!((candidates[0].di, candidates[0].dj), (0, -1));
//! ```
//!
//! # Tables
//!
//! See [`schema::create_schema`] for the full SQL schema.

pub mod schema;
mod loader;
mod queries;
pub mod models;

use rusqlite::Connection;

/// In-memory SQLite database holding one analysis' working tables.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new in-memory database with the full schema applied.
    ///
    /// The database is empty after creation; use the `load_*` methods
    /// to populate it.
    pub fn new() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::create_schema())?;
        Ok(Self { conn })
    }
}
