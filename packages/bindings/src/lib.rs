use napi::Result as NapiResult;
use napi_derive::napi;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[napi]
pub fn normalize_ebitda(input_json: String) -> NapiResult<String> {
    let input: lbo_viability_core::normalization::NormalizationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        lbo_viability_core::normalization::normalize(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Debt
// ---------------------------------------------------------------------------

#[napi]
pub fn validate_financing_structure(input_json: String) -> NapiResult<String> {
    let input: lbo_viability_core::debt::structure::FinancingStructure =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = lbo_viability_core::debt::structure::validate_structure(&input, None)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(serde::Deserialize)]
struct DebtScheduleBindingInput {
    tranches: Vec<lbo_viability_core::debt::DebtTranche>,
    horizon_years: u32,
}

#[napi]
pub fn build_debt_schedule(input_json: String) -> NapiResult<String> {
    let binding_input: DebtScheduleBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = lbo_viability_core::debt::structure::aggregate_structure(
        &binding_input.tranches,
        binding_input.horizon_years,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

#[derive(serde::Deserialize)]
struct ProjectionBindingInput {
    normalization: lbo_viability_core::normalization::NormalizationInput,
    tranches: Vec<lbo_viability_core::debt::DebtTranche>,
    assumptions: lbo_viability_core::projection::OperatingAssumptions,
    horizon_years: u32,
}

fn build_trajectory(
    binding_input: &ProjectionBindingInput,
) -> NapiResult<lbo_viability_core::projection::Trajectory> {
    let normalized = lbo_viability_core::normalization::normalize(&binding_input.normalization)
        .map_err(to_napi_error)?
        .result;
    let schedule = lbo_viability_core::debt::structure::aggregate_structure(
        &binding_input.tranches,
        binding_input.horizon_years,
    )
    .map_err(to_napi_error)?
    .result;
    let trajectory = lbo_viability_core::projection::project(
        &normalized,
        &binding_input.assumptions,
        &schedule,
        binding_input.horizon_years,
    )
    .map_err(to_napi_error)?
    .result;
    Ok(trajectory)
}

#[napi]
pub fn project_trajectory(input_json: String) -> NapiResult<String> {
    let binding_input: ProjectionBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let normalized = lbo_viability_core::normalization::normalize(&binding_input.normalization)
        .map_err(to_napi_error)?
        .result;
    let schedule = lbo_viability_core::debt::structure::aggregate_structure(
        &binding_input.tranches,
        binding_input.horizon_years,
    )
    .map_err(to_napi_error)?
    .result;
    let output = lbo_viability_core::projection::project(
        &normalized,
        &binding_input.assumptions,
        &schedule,
        binding_input.horizon_years,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Stress
// ---------------------------------------------------------------------------

#[derive(serde::Deserialize)]
struct StressBindingInput {
    normalization: lbo_viability_core::normalization::NormalizationInput,
    structure: lbo_viability_core::debt::structure::FinancingStructure,
    assumptions: lbo_viability_core::projection::OperatingAssumptions,
    horizon_years: u32,
    #[serde(default)]
    scenarios: Vec<lbo_viability_core::stress::StressScenario>,
}

#[napi]
pub fn run_stress_suite(input_json: String) -> NapiResult<String> {
    let binding_input: StressBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let normalized = lbo_viability_core::normalization::normalize(&binding_input.normalization)
        .map_err(to_napi_error)?
        .result;
    let output = lbo_viability_core::stress::run_stress_suite(
        &binding_input.scenarios,
        &binding_input.assumptions,
        &binding_input.structure,
        &normalized,
        binding_input.horizon_years,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(serde::Deserialize)]
struct SensitivityBindingInput {
    normalization: lbo_viability_core::normalization::NormalizationInput,
    structure: lbo_viability_core::debt::structure::FinancingStructure,
    assumptions: lbo_viability_core::projection::OperatingAssumptions,
    horizon_years: u32,
    revenue_axis: Vec<rust_decimal::Decimal>,
    margin_axis: Vec<rust_decimal::Decimal>,
}

#[napi]
pub fn build_sensitivity_grid(input_json: String) -> NapiResult<String> {
    let binding_input: SensitivityBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let normalized = lbo_viability_core::normalization::normalize(&binding_input.normalization)
        .map_err(to_napi_error)?
        .result;
    let output = lbo_viability_core::stress::sensitivity_grid(
        &binding_input.revenue_axis,
        &binding_input.margin_axis,
        &binding_input.assumptions,
        &binding_input.structure,
        &normalized,
        binding_input.horizon_years,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Covenants
// ---------------------------------------------------------------------------

#[derive(serde::Deserialize)]
struct CovenantBindingInput {
    #[serde(flatten)]
    projection: ProjectionBindingInput,
    #[serde(default)]
    covenants: Option<Vec<lbo_viability_core::covenants::Covenant>>,
}

#[napi]
pub fn evaluate_covenants(input_json: String) -> NapiResult<String> {
    let binding_input: CovenantBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let trajectory = build_trajectory(&binding_input.projection)?;
    let covenants = binding_input
        .covenants
        .unwrap_or_else(lbo_viability_core::covenants::standard_covenants);
    let registry = lbo_viability_core::metrics::MetricRegistry::standard();
    let output =
        lbo_viability_core::covenants::evaluate_covenants(&covenants, &trajectory, &registry)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

#[derive(serde::Deserialize)]
struct DecisionBindingInput {
    #[serde(flatten)]
    projection: ProjectionBindingInput,
    #[serde(default)]
    decision: Option<lbo_viability_core::decision::DecisionSpec>,
    #[serde(default)]
    scenario: Option<String>,
}

#[napi]
pub fn decide_acquisition(input_json: String) -> NapiResult<String> {
    let binding_input: DecisionBindingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let trajectory = build_trajectory(&binding_input.projection)?;
    let spec = binding_input.decision.unwrap_or_default();
    let output = lbo_viability_core::decision::decide(
        &trajectory,
        &spec,
        binding_input.scenario.as_deref(),
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

#[napi]
pub fn run_evaluation(input_json: String) -> NapiResult<String> {
    let input: lbo_viability_core::evaluate::EvaluationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = lbo_viability_core::evaluate::run_evaluation(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
