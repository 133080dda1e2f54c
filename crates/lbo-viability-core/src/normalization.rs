//! Normalization of reported operating income into lender-acceptable EBITDA.
//!
//! Workflow: base operating result (EBE) + adjustments = bank EBITDA;
//! bank EBITDA less notional tax and maintenance capex = equity EBITDA.
//! Every step appends a human-readable line to the audit trail.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ViabilityError;
use crate::types::*;
use crate::ViabilityResult;

/// Category tag for an EBITDA adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentCategory {
    /// Owner-manager compensation above market rate
    Personnel,
    /// Rent and lease restatements
    Rent,
    /// Non-recurring exceptional items
    Exceptional,
    /// Non-recurring subsidies
    Subsidy,
    Other,
}

/// A single normalization adjustment. Positive amounts increase EBITDA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentEntry {
    pub name: String,
    pub amount: Money,
    pub category: AdjustmentCategory,
    #[serde(default)]
    pub rationale: String,
}

/// Input for the normalization step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationInput {
    /// Base operating result (gross operating surplus) before adjustments
    pub base_operating_result: Money,
    pub adjustments: Vec<AdjustmentEntry>,
    /// Effective cash tax rate applied when deriving equity EBITDA
    pub tax_rate: Rate,
    /// Annual maintenance capex deducted when deriving equity EBITDA
    pub maintenance_capex: Money,
}

/// Normalized EBITDA figures with their audit trail.
///
/// Frozen once computed; downstream components treat this as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEbitda {
    pub base_operating_result: Money,
    pub adjustments: Vec<AdjustmentEntry>,
    pub bank_ebitda: Money,
    pub equity_ebitda: Money,
    /// Append-only trail, one line per adjustment and per derived figure,
    /// in insertion order
    pub audit_trail: Vec<String>,
}

/// Normalize a base operating result into bank and equity EBITDA.
pub fn normalize(
    input: &NormalizationInput,
) -> ViabilityResult<ComputationOutput<NormalizedEbitda>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.tax_rate < Decimal::ZERO || input.tax_rate > Decimal::ONE {
        return Err(ViabilityError::Validation {
            field: "tax_rate".into(),
            reason: "Tax rate must be between 0 and 1".into(),
        });
    }
    if input.maintenance_capex < Decimal::ZERO {
        return Err(ViabilityError::Validation {
            field: "maintenance_capex".into(),
            reason: "Maintenance capex must not be negative".into(),
        });
    }
    for (i, adj) in input.adjustments.iter().enumerate() {
        if adj.name.trim().is_empty() {
            return Err(ViabilityError::Validation {
                field: format!("adjustments[{i}].name"),
                reason: "Adjustment name must not be empty".into(),
            });
        }
    }

    if input.base_operating_result <= Decimal::ZERO {
        warnings.push(format!(
            "Base operating result is non-positive ({}); the target may not support leverage",
            input.base_operating_result
        ));
    }

    let mut audit_trail: Vec<String> = Vec::with_capacity(input.adjustments.len() + 3);
    audit_trail.push(format!(
        "Base operating result: {}",
        input.base_operating_result
    ));

    let mut total_adjustments = Decimal::ZERO;
    for adj in &input.adjustments {
        total_adjustments += adj.amount;
        audit_trail.push(format!(
            "Adjustment ({:?}) {}: {:+}",
            adj.category, adj.name, adj.amount
        ));
    }

    let bank_ebitda = input.base_operating_result + total_adjustments;
    audit_trail.push(format!(
        "Bank EBITDA: {} {:+} = {}",
        input.base_operating_result, total_adjustments, bank_ebitda
    ));

    let notional_tax = bank_ebitda * input.tax_rate;
    let equity_ebitda = bank_ebitda - notional_tax - input.maintenance_capex;
    audit_trail.push(format!(
        "Equity EBITDA: {} - {} (tax) - {} (maintenance capex) = {}",
        bank_ebitda, notional_tax, input.maintenance_capex, equity_ebitda
    ));

    if bank_ebitda <= Decimal::ZERO {
        warnings.push("Bank EBITDA is non-positive after adjustments".into());
    }

    let output = NormalizedEbitda {
        base_operating_result: input.base_operating_result,
        adjustments: input.adjustments.clone(),
        bank_ebitda,
        equity_ebitda,
        audit_trail,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "EBITDA Normalization",
        &serde_json::json!({
            "base_operating_result": input.base_operating_result.to_string(),
            "adjustment_count": input.adjustments.len(),
            "tax_rate": input.tax_rate.to_string(),
            "maintenance_capex": input.maintenance_capex.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
