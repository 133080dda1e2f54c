use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use lbo_viability_core::debt::structure::aggregate_structure;
use lbo_viability_core::debt::DebtTranche;
use lbo_viability_core::normalization::{normalize, NormalizationInput};
use lbo_viability_core::projection::{project, OperatingAssumptions, Trajectory};

use crate::input;

/// Inputs shared by every trajectory-based command
#[derive(Deserialize)]
pub struct ProjectionRequest {
    pub normalization: NormalizationInput,
    pub tranches: Vec<DebtTranche>,
    pub assumptions: OperatingAssumptions,
    pub horizon_years: u32,
}

/// Normalize, schedule, and project in one pass.
pub(crate) fn build_trajectory(
    request: &ProjectionRequest,
) -> Result<Trajectory, Box<dyn std::error::Error>> {
    let normalized = normalize(&request.normalization)?.result;
    let schedule = aggregate_structure(&request.tranches, request.horizon_years)?.result;
    let trajectory = project(
        &normalized,
        &request.assumptions,
        &schedule,
        request.horizon_years,
    )?
    .result;
    Ok(trajectory)
}

/// Arguments for the cash flow projection
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ProjectionRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for projection".into());
    };

    let normalized = normalize(&request.normalization)?.result;
    let schedule = aggregate_structure(&request.tranches, request.horizon_years)?.result;
    let result = project(
        &normalized,
        &request.assumptions,
        &schedule,
        request.horizon_years,
    )?;
    Ok(serde_json::to_value(result)?)
}
