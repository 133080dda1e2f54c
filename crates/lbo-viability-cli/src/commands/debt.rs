use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use lbo_viability_core::debt::schedule::AmortizationMethod;
use lbo_viability_core::debt::structure::aggregate_structure;
use lbo_viability_core::debt::DebtTranche;

use crate::input;

/// Tranche list plus the projection horizon
#[derive(Deserialize)]
pub struct DebtScheduleRequest {
    pub tranches: Vec<DebtTranche>,
    pub horizon_years: u32,
}

/// Arguments for the debt schedule
#[derive(Args)]
pub struct DebtScheduleArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Principal of a single tranche
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate as a decimal (0.045 = 4.5%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Tranche duration in years
    #[arg(long)]
    pub duration: Option<u32>,

    /// Interest-only grace years
    #[arg(long, default_value_t = 0)]
    pub grace: u32,

    /// Amortization method: constant or linear
    #[arg(long, default_value = "constant")]
    pub method: String,

    /// Projection horizon in years (defaults to the tranche duration)
    #[arg(long)]
    pub horizon: Option<u32>,
}

pub fn run_debt_schedule(args: DebtScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: DebtScheduleRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let principal = args
            .principal
            .ok_or("--principal is required (or provide --input)")?;
        let rate = args.rate.ok_or("--rate is required (or provide --input)")?;
        let duration = args
            .duration
            .ok_or("--duration is required (or provide --input)")?;
        let method = match args.method.as_str() {
            "constant" => AmortizationMethod::ConstantPayment,
            "linear" => AmortizationMethod::LinearPrincipal,
            other => return Err(format!("Unknown method '{}'; use constant or linear", other).into()),
        };

        DebtScheduleRequest {
            tranches: vec![DebtTranche {
                name: "Tranche".into(),
                principal,
                rate,
                duration_years: duration,
                grace_years: args.grace,
                method,
            }],
            horizon_years: args.horizon.unwrap_or(duration),
        }
    };

    let result = aggregate_structure(&request.tranches, request.horizon_years)?;
    Ok(serde_json::to_value(result)?)
}
