use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use lbo_viability_core::decision::{decide, DecisionSpec};

use crate::commands::projection::{build_trajectory, ProjectionRequest};
use crate::input;

/// Projection inputs plus an optional decision spec override
#[derive(Deserialize)]
pub struct DecideRequest {
    #[serde(flatten)]
    pub base: ProjectionRequest,
    #[serde(default)]
    pub decision: Option<DecisionSpec>,
    #[serde(default)]
    pub scenario: Option<String>,
}

/// Arguments for the decision engine
#[derive(Args)]
pub struct DecideArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_decide(args: DecideArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: DecideRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for the decision engine".into());
    };

    let trajectory = build_trajectory(&request.base)?;
    let spec = request.decision.unwrap_or_default();
    let result = decide(&trajectory, &spec, request.scenario.as_deref())?;
    Ok(serde_json::to_value(result)?)
}
