use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use lbo_viability_core::debt::structure::FinancingStructure;
use lbo_viability_core::normalization::{normalize, NormalizationInput};
use lbo_viability_core::projection::OperatingAssumptions;
use lbo_viability_core::stress::{run_stress_suite, sensitivity_grid, StressScenario};

use crate::input;

/// Base case plus optional custom scenarios
#[derive(Deserialize)]
pub struct StressRequest {
    pub normalization: NormalizationInput,
    pub structure: FinancingStructure,
    pub assumptions: OperatingAssumptions,
    pub horizon_years: u32,
    #[serde(default)]
    pub scenarios: Option<Vec<StressScenario>>,
}

/// Arguments for the stress suite
#[derive(Args)]
pub struct StressArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_stress(args: StressArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: StressRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for stress testing".into());
    };

    let normalized = normalize(&request.normalization)?.result;
    let custom = request.scenarios.unwrap_or_default();
    let result = run_stress_suite(
        &custom,
        &request.assumptions,
        &request.structure,
        &normalized,
        request.horizon_years,
    )?;
    Ok(serde_json::to_value(result)?)
}

/// Base case plus the two shock axes
#[derive(Deserialize)]
pub struct SensitivityRequest {
    pub normalization: NormalizationInput,
    pub structure: FinancingStructure,
    pub assumptions: OperatingAssumptions,
    pub horizon_years: u32,
    pub revenue_axis: Vec<Decimal>,
    pub margin_axis: Vec<Decimal>,
}

/// Arguments for the sensitivity grid
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: SensitivityRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for sensitivity analysis".into());
    };

    let normalized = normalize(&request.normalization)?.result;
    let result = sensitivity_grid(
        &request.revenue_axis,
        &request.margin_axis,
        &request.assumptions,
        &request.structure,
        &normalized,
        request.horizon_years,
    )?;
    Ok(serde_json::to_value(result)?)
}
