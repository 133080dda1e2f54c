//! Stress testing: scenario runs over shocked copies of the base case.
//!
//! A failing scenario (e.g. leverage undefined once EBITDA turns
//! negative) is reported per-scenario and never aborts the batch.

pub mod scenarios;
pub mod sensitivity;

pub use scenarios::{classify, predefined_scenarios, StressScenario};
pub use sensitivity::{sensitivity_grid, SensitivityGrid};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::debt::structure::{aggregate_structure, FinancingStructure};
use crate::normalization::NormalizedEbitda;
use crate::projection::{project, rate_at, OperatingAssumptions, Trajectory};
use crate::types::*;
use crate::ViabilityResult;

/// Outcome of one scenario projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub scenario: StressScenario,
    pub trajectory: Trajectory,
    pub dscr_min: Option<Multiple>,
    pub leverage_end: Multiple,
    pub classification: Recommendation,
}

/// One entry in a stress suite: either an outcome or the error that
/// stopped the scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRun {
    pub name: String,
    pub outcome: Option<ScenarioOutcome>,
    pub error: Option<String>,
}

/// Expand a per-year vector to the full horizon with its clamp-to-last
/// values.
fn materialized(values: &[Decimal], horizon_years: u32) -> Vec<Decimal> {
    (1..=horizon_years.max(1))
        .map(|year| rate_at(values, year))
        .collect()
}

/// Apply scenario deltas to copies of the base inputs. The shared base
/// is never mutated.
///
/// Revenue and margin shocks land on year 1 only. The vectors are
/// padded to the horizon first; otherwise the projection's
/// clamp-to-last lookup would repeat a shock placed on a short vector
/// in every later year.
fn apply_scenario(
    scenario: &StressScenario,
    base_assumptions: &OperatingAssumptions,
    structure: &FinancingStructure,
    horizon_years: u32,
) -> (OperatingAssumptions, FinancingStructure) {
    let mut assumptions = base_assumptions.clone();

    if !scenario.revenue_shift.is_zero() {
        let mut growth = materialized(&assumptions.revenue_growth, horizon_years);
        growth[0] += scenario.revenue_shift;
        assumptions.revenue_growth = growth;
    }
    if !scenario.margin_shift.is_zero() {
        let mut deltas = materialized(&assumptions.margin_delta, horizon_years);
        deltas[0] += scenario.margin_shift;
        assumptions.margin_delta = deltas;
    }
    assumptions.wc_fraction += scenario.wc_shift;

    let mut structure = structure.clone();
    for tranche in &mut structure.tranches {
        tranche.rate += scenario.rate_shift;
    }

    (assumptions, structure)
}

/// Run a single scenario against shocked copies of the base case.
pub fn run_scenario(
    scenario: &StressScenario,
    base_assumptions: &OperatingAssumptions,
    structure: &FinancingStructure,
    normalized: &NormalizedEbitda,
    horizon_years: u32,
) -> ViabilityResult<ComputationOutput<ScenarioOutcome>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let (assumptions, shocked_structure) =
        apply_scenario(scenario, base_assumptions, structure, horizon_years);

    let schedule = aggregate_structure(&shocked_structure.tranches, horizon_years)?;
    warnings.extend(schedule.warnings);

    let projection = project(normalized, &assumptions, &schedule.result, horizon_years)?;
    warnings.extend(projection.warnings);
    let trajectory = projection.result;

    let dscr_min = trajectory.dscr_min();
    let leverage_end = trajectory.leverage_end();
    let classification = classify(dscr_min, leverage_end);

    let outcome = ScenarioOutcome {
        scenario: scenario.clone(),
        trajectory,
        dscr_min,
        leverage_end,
        classification,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Stress Scenario Projection",
        &serde_json::json!({
            "scenario": scenario.name,
            "revenue_shift": scenario.revenue_shift.to_string(),
            "margin_shift": scenario.margin_shift.to_string(),
            "rate_shift": scenario.rate_shift.to_string(),
            "wc_shift": scenario.wc_shift.to_string(),
            "horizon_years": horizon_years,
        }),
        warnings,
        elapsed,
        outcome,
    ))
}

/// Run the predefined suite plus any custom scenarios, in order.
///
/// Each scenario is isolated: a failure is recorded on its run entry
/// and the batch continues.
pub fn run_stress_suite(
    custom_scenarios: &[StressScenario],
    base_assumptions: &OperatingAssumptions,
    structure: &FinancingStructure,
    normalized: &NormalizedEbitda,
    horizon_years: u32,
) -> ViabilityResult<ComputationOutput<Vec<ScenarioRun>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mut scenarios = predefined_scenarios();
    scenarios.extend(custom_scenarios.iter().cloned());

    let mut runs: Vec<ScenarioRun> = Vec::with_capacity(scenarios.len());
    for scenario in &scenarios {
        match run_scenario(scenario, base_assumptions, structure, normalized, horizon_years) {
            Ok(output) => {
                warnings.extend(output.warnings);
                runs.push(ScenarioRun {
                    name: scenario.name.clone(),
                    outcome: Some(output.result),
                    error: None,
                });
            }
            Err(e) => {
                warnings.push(format!("Scenario '{}' failed: {e}", scenario.name));
                runs.push(ScenarioRun {
                    name: scenario.name.clone(),
                    outcome: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let no_go_count = runs
        .iter()
        .filter(|r| {
            r.outcome
                .as_ref()
                .map_or(false, |o| o.classification == Recommendation::NoGo)
        })
        .count();

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Stress Test Suite",
        &serde_json::json!({
            "scenario_count": scenarios.len(),
            "custom_count": custom_scenarios.len(),
            "no_go_count": no_go_count,
            "horizon_years": horizon_years,
        }),
        warnings,
        elapsed,
        runs,
    ))
}
