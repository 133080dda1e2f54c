//! Full screening pipeline behind a single entry point.
//!
//! Validate the structure, normalize EBITDA, build the debt schedule,
//! project, stress, test covenants, and decide, collecting every
//! sub-step's warnings into one envelope.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::covenants::{evaluate_covenants, standard_covenants, Covenant, CovenantResult};
use crate::debt::structure::{
    aggregate_structure, validate_structure, AggregateSchedule, FinancingStructure,
    StructureSummary,
};
use crate::decision::{decide, AcquisitionDecision, DecisionSpec};
use crate::metrics::MetricRegistry;
use crate::normalization::{normalize, NormalizationInput, NormalizedEbitda};
use crate::projection::{project, OperatingAssumptions, Trajectory};
use crate::stress::{run_stress_suite, ScenarioRun, StressScenario};
use crate::types::*;
use crate::ViabilityResult;

/// Everything the pipeline needs. Covenants, custom scenarios, and the
/// decision spec default to the standard sets when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationInput {
    pub normalization: NormalizationInput,
    pub structure: FinancingStructure,
    pub assumptions: OperatingAssumptions,
    pub horizon_years: u32,
    #[serde(default)]
    pub covenants: Option<Vec<Covenant>>,
    #[serde(default)]
    pub scenarios: Option<Vec<StressScenario>>,
    #[serde(default)]
    pub decision: Option<DecisionSpec>,
    #[serde(default)]
    pub balance_tolerance: Option<Money>,
}

/// Combined output of the full pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationOutput {
    pub structure_summary: StructureSummary,
    pub normalized: NormalizedEbitda,
    pub debt_schedule: AggregateSchedule,
    pub trajectory: Trajectory,
    pub stress: Vec<ScenarioRun>,
    pub covenants: Vec<CovenantResult>,
    pub decision: AcquisitionDecision,
}

/// Run the full screening pipeline on the base case.
pub fn run_evaluation(
    input: &EvaluationInput,
) -> ViabilityResult<ComputationOutput<EvaluationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let structure_output = validate_structure(&input.structure, input.balance_tolerance)?;
    warnings.extend(structure_output.warnings);

    let normalized_output = normalize(&input.normalization)?;
    warnings.extend(normalized_output.warnings);
    let normalized = normalized_output.result;

    let schedule_output = aggregate_structure(&input.structure.tranches, input.horizon_years)?;
    warnings.extend(schedule_output.warnings);
    let schedule = schedule_output.result;

    let projection_output = project(
        &normalized,
        &input.assumptions,
        &schedule,
        input.horizon_years,
    )?;
    warnings.extend(projection_output.warnings);
    let trajectory = projection_output.result;

    let custom_scenarios = input.scenarios.clone().unwrap_or_default();
    let stress_output = run_stress_suite(
        &custom_scenarios,
        &input.assumptions,
        &input.structure,
        &normalized,
        input.horizon_years,
    )?;
    warnings.extend(stress_output.warnings);

    let covenants = input.covenants.clone().unwrap_or_else(standard_covenants);
    let registry = MetricRegistry::standard();
    let covenant_output = evaluate_covenants(&covenants, &trajectory, &registry)?;
    warnings.extend(covenant_output.warnings);

    let decision_spec = input.decision.clone().unwrap_or_default();
    let decision_output = decide(&trajectory, &decision_spec, None)?;
    warnings.extend(decision_output.warnings);

    let output = EvaluationOutput {
        structure_summary: structure_output.result,
        normalized,
        debt_schedule: schedule,
        trajectory,
        stress: stress_output.result,
        covenants: covenant_output.result,
        decision: decision_output.result,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Acquisition Viability Screening",
        &serde_json::json!({
            "horizon_years": input.horizon_years,
            "tranche_count": input.structure.tranches.len(),
            "covenant_count": covenants.len(),
            "custom_scenario_count": custom_scenarios.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
