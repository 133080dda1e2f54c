use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use lbo_viability_core::normalization::{self, NormalizationInput};

use crate::input;

/// Arguments for EBITDA normalization
#[derive(Args)]
pub struct NormalizeArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Base operating result before adjustments
    #[arg(long, allow_hyphen_values = true)]
    pub base_operating_result: Option<Decimal>,

    /// Effective cash tax rate as a decimal (0.25 = 25%)
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Annual maintenance capex
    #[arg(long)]
    pub maintenance_capex: Option<Decimal>,
}

pub fn run_normalize(args: NormalizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let norm_input: NormalizationInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let base = args
            .base_operating_result
            .ok_or("--base-operating-result is required (or provide --input)")?;
        let tax_rate = args
            .tax_rate
            .ok_or("--tax-rate is required (or provide --input)")?;
        let maintenance_capex = args
            .maintenance_capex
            .ok_or("--maintenance-capex is required (or provide --input)")?;

        // Adjustment lists come through --input or stdin JSON
        NormalizationInput {
            base_operating_result: base,
            adjustments: vec![],
            tax_rate,
            maintenance_capex,
        }
    };

    let result = normalization::normalize(&norm_input)?;
    Ok(serde_json::to_value(result)?)
}
