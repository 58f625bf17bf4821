use crate::error::Result;
use crate::flux::{FluxQuantities, Run, TimeIndex};
use crate::table::{finish_writer, optional_field};
use csv::WriterBuilder;
use serde::Serialize;

/// One point at one time step, with both runs' fluxes aligned.
///
/// `baseline` is `None` when the baseline run has no row for this key. A
/// quantity a run left unset is NaN.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct DepletionRecord {
    pub id: String,
    pub row: i64,
    pub col: i64,
    /// Taken from the historical run.
    pub segment: i64,
    pub reach: i64,
    pub time: TimeIndex,
    pub historical: FluxQuantities,
    pub baseline: Option<FluxQuantities>,
    /// `outflow_historical - outflow_baseline`; signed, never clamped.
    pub depletion: Option<f64>,
}

/// Streamflow depletion for one aligned pair of flux rows.
///
/// `None` when the baseline row is missing or either outflow is NaN.
pub fn depletion_of(historical: &FluxQuantities, baseline: Option<&FluxQuantities>) -> Option<f64> {
    baseline
        .map(|b| historical.q_out - b.q_out)
        .filter(|d| !d.is_nan())
}

/// Formats a quantity, writing NaN as an empty field.
fn quantity_field(value: Option<f64>) -> String {
    optional_field(value.filter(|v| !v.is_nan()))
}

impl DepletionRecord {
    pub fn outflow_historical(&self) -> f64 {
        self.historical.q_out
    }

    pub fn outflow_baseline(&self) -> Option<f64> {
        self.baseline.map(|b| b.q_out)
    }
}

/// Column projection of the depletion table.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum DepletionColumns {
    /// Identity, cell, time, both outflows and depletion.
    #[default]
    Canonical,
    /// Canonical columns plus every other flux quantity of both runs.
    Wide,
}

/// Quantities other than outflow, as (suffixed name, value) per run.
fn other_quantities(q: Option<&FluxQuantities>, run: Run) -> Vec<(String, Option<f64>)> {
    let names = FluxQuantities::column_names(run);
    let values = q.map(|q| q.to_array());
    names
        .into_iter()
        .enumerate()
        .filter(|(i, _)| *i != 2)
        .map(|(i, name)| (name, values.map(|v| v[i])))
        .collect()
}

/// Write depletion records as CSV. Nulls are empty fields.
pub fn write_depletion_csv(
    records: &[DepletionRecord],
    id_column: &str,
    columns: DepletionColumns,
) -> Result<String> {
    let mut wtr = WriterBuilder::new().from_writer(Vec::new());
    let mut header: Vec<String> = [
        id_column,
        "row",
        "col",
        "segment",
        "reach",
        "kstpkper",
        "timestep",
        "stress_period",
        "outflow_historical",
        "outflow_baseline",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    if columns == DepletionColumns::Wide {
        header.extend(other_quantities(None, Run::Historical).into_iter().map(|(n, _)| n));
        header.extend(other_quantities(None, Run::Baseline).into_iter().map(|(n, _)| n));
    }
    header.push("depletion".to_string());
    wtr.write_record(&header)?;

    for r in records {
        let mut record = vec![
            r.id.clone(),
            r.row.to_string(),
            r.col.to_string(),
            r.segment.to_string(),
            r.reach.to_string(),
            r.time.to_string(),
            r.time.timestep.to_string(),
            r.time.stress_period.to_string(),
            quantity_field(Some(r.outflow_historical())),
            quantity_field(r.outflow_baseline()),
        ];
        if columns == DepletionColumns::Wide {
            for (_, value) in other_quantities(Some(&r.historical), Run::Historical)
                .into_iter()
                .chain(other_quantities(r.baseline.as_ref(), Run::Baseline))
            {
                record.push(quantity_field(value));
            }
        }
        record.push(optional_field(r.depletion));
        wtr.write_record(&record)?;
    }
    finish_writer(wtr)
}
