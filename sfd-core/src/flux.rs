use serde::{Deserialize, Serialize};
use sfd_utils::kstpkper::{format_kstpkper, parse_kstpkper};
use std::fmt;
use std::str::FromStr;

/// Compound simulation time index: a time step within a stress period.
///
/// Both components are zero-based. Ordering is by stress period first.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct TimeIndex {
    pub timestep: u32,
    pub stress_period: u32,
}

impl TimeIndex {
    pub fn new(timestep: u32, stress_period: u32) -> Self {
        Self {
            timestep,
            stress_period,
        }
    }
}

impl Ord for TimeIndex {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.stress_period, self.timestep).cmp(&(other.stress_period, other.timestep))
    }
}

impl PartialOrd for TimeIndex {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Written as `(ts, sp)`, the form used by the `kstpkper` column.
impl fmt::Display for TimeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_kstpkper(self.timestep, self.stress_period))
    }
}

impl FromStr for TimeIndex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_kstpkper(s)
            .map(|(timestep, stress_period)| TimeIndex::new(timestep, stress_period))
            .map_err(|e| e.to_string())
    }
}

/// The two paired simulations that are differenced.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Run {
    /// With extraction (pumping as recorded).
    Historical,
    /// Extraction set to zero.
    Baseline,
}

impl Run {
    pub fn as_str(&self) -> &'static str {
        match self {
            Run::Historical => "historical",
            Run::Baseline => "baseline",
        }
    }

    /// Suffix that keeps same-named quantities of both runs apart.
    pub fn suffix(&self) -> &'static str {
        match self {
            Run::Historical => "_historical",
            Run::Baseline => "_baseline",
        }
    }
}

/// Named flux quantities of one stream cell, volume per time.
///
/// Field order matches the stream listing columns.
#[derive(Debug, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FluxQuantities {
    /// Flow into the reach from upstream.
    pub q_in: f64,
    /// Exchange between stream and aquifer.
    pub q_aquifer: f64,
    /// Flow out of the reach downstream, reported as `Qriver`.
    pub q_out: f64,
    /// Overland runoff.
    pub q_overland: f64,
    /// Direct precipitation.
    pub q_precip: f64,
    /// Stream evapotranspiration.
    pub q_et: f64,
}

impl FluxQuantities {
    /// Column names as written by the model's stream output, in field order.
    pub const SOURCE_NAMES: [&'static str; 6] = ["Qin", "Qaquifer", "Qout", "Qovr", "Qprecip", "Qet"];

    /// Canonical names after `Qout` is renamed to `Qriver`.
    pub const CANONICAL_NAMES: [&'static str; 6] =
        ["Qin", "Qaquifer", "Qriver", "Qovr", "Qprecip", "Qet"];

    pub fn from_array(values: [f64; 6]) -> Self {
        let [q_in, q_aquifer, q_out, q_overland, q_precip, q_et] = values;
        Self {
            q_in,
            q_aquifer,
            q_out,
            q_overland,
            q_precip,
            q_et,
        }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.q_in,
            self.q_aquifer,
            self.q_out,
            self.q_overland,
            self.q_precip,
            self.q_et,
        ]
    }

    /// Canonical names suffixed for one run, e.g. `Qriver_baseline`.
    pub fn column_names(run: Run) -> Vec<String> {
        Self::CANONICAL_NAMES
            .iter()
            .map(|name| format!("{}{}", name, run.suffix()))
            .collect()
    }
}

/// One stream network cell at one time step of one run.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FluxRecord {
    pub time: TimeIndex,
    pub layer: Option<i64>,
    pub row: i64,
    pub col: i64,
    pub segment: i64,
    pub reach: i64,
    pub quantities: FluxQuantities,
}
