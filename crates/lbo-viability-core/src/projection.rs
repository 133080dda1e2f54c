//! Multi-year cash flow projection.
//!
//! Builds a year-by-year trajectory from normalized EBITDA, operating
//! assumptions, and the aggregated debt schedule. One row per year over
//! the horizon, no gaps. Inputs are never mutated; identical inputs give
//! bit-identical output.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::debt::structure::AggregateSchedule;
use crate::error::ViabilityError;
use crate::normalization::NormalizedEbitda;
use crate::types::*;
use crate::ViabilityResult;

/// Scale for derived money figures. The year-0 margin is a truncated
/// repeating decimal; products are rounded back to this scale so the
/// truncation error never reaches the money chain.
const MONEY_SCALE: u32 = 10;

/// Operating assumptions driving the projection.
///
/// Per-year vectors are indexed from year 1; when a vector is shorter
/// than the horizon the last entry is held flat for the remaining years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingAssumptions {
    /// Base-year revenue (year 0), an explicit input
    pub base_revenue: Money,
    /// Annual revenue growth rates, year 1 onward
    pub revenue_growth: Vec<Rate>,
    /// Annual EBITDA margin point changes, year 1 onward
    pub margin_delta: Vec<Rate>,
    /// Working capital as a fraction of revenue
    pub wc_fraction: Rate,
    /// Maintenance capex as a fraction of revenue
    pub capex_fraction: Rate,
    /// Extra development capex per year; zero beyond the vector's length
    #[serde(default)]
    pub development_capex: Vec<Money>,
    /// Flat cash tax rate applied to EBITDA
    pub tax_rate: Rate,
}

/// One projected year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearProjection {
    pub year: u32,
    pub revenue: Money,
    pub ebitda_margin: Rate,
    pub ebitda: Money,
    pub working_capital: Money,
    pub wc_change: Money,
    pub capex: Money,
    pub cash_tax: Money,
    pub cfads: Money,
    pub debt_service: Money,
    /// None when no debt service is due; treated as unconstrained
    pub dscr: Option<Multiple>,
    pub outstanding_debt: Money,
    pub leverage: Multiple,
    pub free_cash_flow: Money,
}

/// Ordered projection over the full horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub years: Vec<YearProjection>,
}

impl Trajectory {
    /// Minimum DSCR over the horizon; None when no year carries debt
    /// service.
    pub fn dscr_min(&self) -> Option<Multiple> {
        self.years.iter().filter_map(|y| y.dscr).min()
    }

    /// Leverage in the final projected year.
    pub fn leverage_end(&self) -> Multiple {
        self.years.last().map(|y| y.leverage).unwrap_or(Decimal::ZERO)
    }

    /// First year with non-negative free cash flow, if any.
    pub fn first_non_negative_fcf_year(&self) -> Option<u32> {
        self.years
            .iter()
            .find(|y| y.free_cash_flow >= Decimal::ZERO)
            .map(|y| y.year)
    }
}

/// Clamp-to-last lookup for per-year assumption vectors.
pub(crate) fn rate_at(values: &[Decimal], year: u32) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let idx = (year as usize - 1).min(values.len() - 1);
    values[idx]
}

/// Development capex is zero beyond the supplied years.
fn dev_capex_at(values: &[Decimal], year: u32) -> Decimal {
    values
        .get(year as usize - 1)
        .copied()
        .unwrap_or(Decimal::ZERO)
}

fn validate_assumptions(assumptions: &OperatingAssumptions) -> ViabilityResult<()> {
    if assumptions.base_revenue <= Decimal::ZERO {
        return Err(ViabilityError::Validation {
            field: "base_revenue".into(),
            reason: "Base-year revenue must be positive".into(),
        });
    }
    if assumptions.tax_rate < Decimal::ZERO || assumptions.tax_rate > Decimal::ONE {
        return Err(ViabilityError::Validation {
            field: "tax_rate".into(),
            reason: "Tax rate must be between 0 and 1".into(),
        });
    }
    if assumptions.wc_fraction < Decimal::ZERO {
        return Err(ViabilityError::Validation {
            field: "wc_fraction".into(),
            reason: "Working capital fraction must not be negative".into(),
        });
    }
    if assumptions.capex_fraction < Decimal::ZERO {
        return Err(ViabilityError::Validation {
            field: "capex_fraction".into(),
            reason: "Capex fraction must not be negative".into(),
        });
    }
    Ok(())
}

/// Project the full trajectory over the horizon.
///
/// Leverage is undefined for non-positive EBITDA; the year it happens is
/// surfaced in the error rather than silently zeroed.
pub fn project(
    normalized: &NormalizedEbitda,
    assumptions: &OperatingAssumptions,
    schedule: &AggregateSchedule,
    horizon_years: u32,
) -> ViabilityResult<ComputationOutput<Trajectory>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_assumptions(assumptions)?;
    if horizon_years == 0 {
        return Err(ViabilityError::Validation {
            field: "horizon_years".into(),
            reason: "Projection horizon must be at least 1 year".into(),
        });
    }
    if (schedule.periods.len() as u32) < horizon_years {
        return Err(ViabilityError::Validation {
            field: "schedule".into(),
            reason: format!(
                "Debt schedule covers {} years, shorter than the {}-year horizon",
                schedule.periods.len(),
                horizon_years
            ),
        });
    }

    let mut years: Vec<YearProjection> = Vec::with_capacity(horizon_years as usize);
    let mut prev_revenue = assumptions.base_revenue;
    let mut prev_margin = normalized.bank_ebitda / assumptions.base_revenue;
    let mut prev_wc = assumptions.wc_fraction * assumptions.base_revenue;

    for year in 1..=horizon_years {
        let revenue = prev_revenue * (Decimal::ONE + rate_at(&assumptions.revenue_growth, year));
        let margin = prev_margin + rate_at(&assumptions.margin_delta, year);
        let ebitda = (revenue * margin)
            .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);

        let working_capital = assumptions.wc_fraction * revenue;
        let wc_change = working_capital - prev_wc;
        let capex =
            assumptions.capex_fraction * revenue + dev_capex_at(&assumptions.development_capex, year);
        let cash_tax = ebitda * assumptions.tax_rate;
        let cfads = ebitda - cash_tax - wc_change - capex;

        let period = &schedule.periods[(year - 1) as usize];
        let debt_service = period.debt_service;
        let dscr = if debt_service > Decimal::ZERO {
            Some(cfads / debt_service)
        } else {
            None
        };

        if ebitda <= Decimal::ZERO {
            return Err(ViabilityError::Computation {
                year,
                metric: "leverage".into(),
                reason: format!("EBITDA is non-positive ({ebitda}); leverage is undefined"),
            });
        }
        let leverage = period.outstanding / ebitda;
        let free_cash_flow = cfads - debt_service;

        years.push(YearProjection {
            year,
            revenue,
            ebitda_margin: margin,
            ebitda,
            working_capital,
            wc_change,
            capex,
            cash_tax,
            cfads,
            debt_service,
            dscr,
            outstanding_debt: period.outstanding,
            leverage,
            free_cash_flow,
        });

        prev_revenue = revenue;
        prev_margin = margin;
        prev_wc = working_capital;
    }

    let trajectory = Trajectory { years };

    if let Some(dscr_min) = trajectory.dscr_min() {
        if dscr_min < Decimal::ONE {
            warnings.push(format!(
                "Minimum DSCR over the horizon is {dscr_min:.4}; cash flow does not cover \
                 debt service in at least one year"
            ));
        }
    }
    if trajectory.first_non_negative_fcf_year().is_none() {
        warnings.push("Free cash flow stays negative over the entire horizon".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Leveraged Cash Flow Projection",
        &serde_json::json!({
            "base_revenue": assumptions.base_revenue.to_string(),
            "horizon_years": horizon_years,
            "tax_rate": assumptions.tax_rate.to_string(),
            "wc_fraction": assumptions.wc_fraction.to_string(),
            "capex_fraction": assumptions.capex_fraction.to_string(),
        }),
        warnings,
        elapsed,
        trajectory,
    ))
}
