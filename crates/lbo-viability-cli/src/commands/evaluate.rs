use clap::Args;
use serde_json::Value;

use lbo_viability_core::evaluate::{run_evaluation, EvaluationInput};

use crate::input;

/// Arguments for the full screening pipeline
#[derive(Args)]
pub struct EvaluateArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_evaluate(args: EvaluateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let eval_input: EvaluationInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for evaluation".into());
    };

    let result = run_evaluation(&eval_input)?;
    Ok(serde_json::to_value(result)?)
}
