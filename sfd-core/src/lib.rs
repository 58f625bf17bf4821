//! Core types and readers for streamflow depletion analysis.
//!
//! Points (stream gauges), stream network cells, per-cell flux records of a
//! model run, and the derived snapped points and depletion records, together
//! with the CSV tables, grid intersection and run output readers that produce
//! and persist them.

pub mod depletion;
pub mod error;
pub mod flux;
pub mod grid;
pub mod network;
pub mod point;
pub mod run;
pub mod snapped;
pub mod table;

pub use error::{Result, SfdError};
