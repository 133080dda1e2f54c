use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use lbo_viability_core::covenants::{evaluate_covenants, standard_covenants, Covenant};
use lbo_viability_core::metrics::MetricRegistry;

use crate::commands::projection::{build_trajectory, ProjectionRequest};
use crate::input;

/// Projection inputs plus the covenants to test; defaults to the
/// standard leverage/DSCR pair
#[derive(Deserialize)]
pub struct CovenantTestRequest {
    #[serde(flatten)]
    pub base: ProjectionRequest,
    #[serde(default)]
    pub covenants: Option<Vec<Covenant>>,
}

/// Arguments for covenant testing
#[derive(Args)]
pub struct CovenantTestArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_covenant_test(args: CovenantTestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: CovenantTestRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for covenant testing".into());
    };

    let trajectory = build_trajectory(&request.base)?;
    let covenants = request.covenants.unwrap_or_else(standard_covenants);
    let registry = MetricRegistry::standard();
    let result = evaluate_covenants(&covenants, &trajectory, &registry)?;
    Ok(serde_json::to_value(result)?)
}
