//! Two-axis sensitivity grid over revenue and margin shocks.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::debt::structure::FinancingStructure;
use crate::normalization::NormalizedEbitda;
use crate::projection::OperatingAssumptions;
use crate::stress::scenarios::StressScenario;
use crate::stress::run_scenario;
use crate::types::*;
use crate::ViabilityResult;

/// Classification per (revenue shift, margin shift) combination.
///
/// `cells[i][j]` holds the classification for `revenue_axis[i]` crossed
/// with `margin_axis[j]`; None marks a cell whose projection failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub revenue_axis: Vec<Rate>,
    pub margin_axis: Vec<Rate>,
    pub cells: Vec<Vec<Option<Recommendation>>>,
}

/// Evaluate the full grid. Cells are independent; a failed cell is
/// recorded as None with a warning and the rest of the grid completes.
pub fn sensitivity_grid(
    revenue_axis: &[Rate],
    margin_axis: &[Rate],
    base_assumptions: &OperatingAssumptions,
    structure: &FinancingStructure,
    normalized: &NormalizedEbitda,
    horizon_years: u32,
) -> ViabilityResult<ComputationOutput<SensitivityGrid>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if revenue_axis.is_empty() || margin_axis.is_empty() {
        return Err(crate::ViabilityError::Validation {
            field: "axes".into(),
            reason: "Both sensitivity axes must carry at least one value".into(),
        });
    }

    let mut cells: Vec<Vec<Option<Recommendation>>> = Vec::with_capacity(revenue_axis.len());
    for revenue_shift in revenue_axis {
        let mut row: Vec<Option<Recommendation>> = Vec::with_capacity(margin_axis.len());
        for margin_shift in margin_axis {
            let scenario = StressScenario {
                name: format!("revenue {revenue_shift:+} / margin {margin_shift:+}"),
                revenue_shift: *revenue_shift,
                margin_shift: *margin_shift,
                rate_shift: Decimal::ZERO,
                wc_shift: Decimal::ZERO,
            };
            match run_scenario(&scenario, base_assumptions, structure, normalized, horizon_years)
            {
                Ok(output) => row.push(Some(output.result.classification)),
                Err(e) => {
                    warnings.push(format!("Cell '{}' failed: {e}", scenario.name));
                    row.push(None);
                }
            }
        }
        cells.push(row);
    }

    let grid = SensitivityGrid {
        revenue_axis: revenue_axis.to_vec(),
        margin_axis: margin_axis.to_vec(),
        cells,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Sensitivity Grid",
        &serde_json::json!({
            "revenue_axis_len": revenue_axis.len(),
            "margin_axis_len": margin_axis.len(),
            "horizon_years": horizon_years,
        }),
        warnings,
        elapsed,
        grid,
    ))
}
