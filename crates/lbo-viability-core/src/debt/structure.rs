//! Financing structure validation and cross-tranche aggregation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use crate::debt::schedule::{self, DebtTranche, TrancheSchedule};
use crate::error::ViabilityError;
use crate::types::*;
use crate::ViabilityResult;

/// Default tolerance on sources vs. uses: one unit of currency.
const DEFAULT_BALANCE_TOLERANCE: Decimal = dec!(1);

/// Tolerance on the equity split summing to 100%.
const SPLIT_TOLERANCE: Decimal = dec!(0.01);

/// Complete financing structure for the acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingStructure {
    pub acquisition_price: Money,
    /// Debt tranches; names must be unique
    pub tranches: Vec<DebtTranche>,
    pub equity_amount: Money,
    /// Holder label to ownership fraction; must sum to 1.
    /// BTreeMap keeps holder iteration order deterministic.
    pub equity_split: BTreeMap<String, Rate>,
}

impl FinancingStructure {
    pub fn total_debt(&self) -> Money {
        self.tranches.iter().map(|t| t.principal).sum()
    }

    pub fn total_financing(&self) -> Money {
        self.total_debt() + self.equity_amount
    }
}

/// Summary produced by structure validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureSummary {
    pub acquisition_price: Money,
    pub total_debt: Money,
    pub equity_amount: Money,
    /// total financing minus acquisition price
    pub financing_gap: Money,
    /// debt / (debt + equity)
    pub debt_share: Rate,
}

/// One year of the structure-wide debt schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatePeriod {
    pub year: u32,
    pub principal: Money,
    pub interest: Money,
    pub debt_service: Money,
    pub outstanding: Money,
}

/// Per-year totals across all tranches, with the underlying schedules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateSchedule {
    pub periods: Vec<AggregatePeriod>,
    pub tranche_schedules: Vec<TrancheSchedule>,
}

/// Validate structure invariants: unique tranche names, non-negative
/// principals, debt + equity within tolerance of the acquisition price,
/// equity split summing to 1.
pub fn validate_structure(
    structure: &FinancingStructure,
    tolerance: Option<Money>,
) -> ViabilityResult<ComputationOutput<StructureSummary>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if structure.acquisition_price <= Decimal::ZERO {
        return Err(ViabilityError::Validation {
            field: "acquisition_price".into(),
            reason: "Acquisition price must be positive".into(),
        });
    }
    if structure.equity_amount < Decimal::ZERO {
        return Err(ViabilityError::Validation {
            field: "equity_amount".into(),
            reason: "Equity amount must not be negative".into(),
        });
    }

    let mut names: HashSet<&str> = HashSet::with_capacity(structure.tranches.len());
    for tranche in &structure.tranches {
        schedule::validate_tranche(tranche)?;
        if !names.insert(tranche.name.as_str()) {
            return Err(ViabilityError::Validation {
                field: "tranches".into(),
                reason: format!("Duplicate tranche name '{}'", tranche.name),
            });
        }
    }

    let tolerance = tolerance.unwrap_or(DEFAULT_BALANCE_TOLERANCE);
    let total_debt = structure.total_debt();
    let total_financing = total_debt + structure.equity_amount;
    let financing_gap = total_financing - structure.acquisition_price;
    if financing_gap.abs() > tolerance {
        return Err(ViabilityError::Validation {
            field: "acquisition_price".into(),
            reason: format!(
                "Debt ({total_debt}) plus equity ({}) differs from the acquisition \
                 price ({}) by {financing_gap}, beyond the {tolerance} tolerance",
                structure.equity_amount, structure.acquisition_price
            ),
        });
    }

    let split_total: Decimal = structure.equity_split.values().copied().sum();
    if (split_total - Decimal::ONE).abs() > SPLIT_TOLERANCE {
        return Err(ViabilityError::Validation {
            field: "equity_split".into(),
            reason: format!("Equity split must sum to 1, got {split_total}"),
        });
    }

    if structure.tranches.is_empty() {
        warnings.push("Structure carries no debt; this is an all-equity acquisition".into());
    }

    let debt_share = if total_financing.is_zero() {
        Decimal::ZERO
    } else {
        total_debt / total_financing
    };

    let summary = StructureSummary {
        acquisition_price: structure.acquisition_price,
        total_debt,
        equity_amount: structure.equity_amount,
        financing_gap,
        debt_share,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Financing Structure Validation",
        &serde_json::json!({
            "tranche_count": structure.tranches.len(),
            "tolerance": tolerance.to_string(),
        }),
        warnings,
        elapsed,
        summary,
    ))
}

/// Sum principal, interest, and outstanding balance per year across
/// tranches. Tranches are independent; no cross-tranche subordination.
pub fn aggregate_structure(
    tranches: &[DebtTranche],
    horizon_years: u32,
) -> ViabilityResult<ComputationOutput<AggregateSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if horizon_years == 0 {
        return Err(ViabilityError::Validation {
            field: "horizon_years".into(),
            reason: "Projection horizon must be at least 1 year".into(),
        });
    }

    let mut tranche_schedules: Vec<TrancheSchedule> = Vec::with_capacity(tranches.len());
    for tranche in tranches {
        let sched = schedule::schedule_tranche(tranche, horizon_years)?;
        warnings.extend(sched.warnings);
        tranche_schedules.push(sched.result);
    }

    let mut periods: Vec<AggregatePeriod> = Vec::with_capacity(horizon_years as usize);
    for year in 1..=horizon_years {
        let idx = (year - 1) as usize;
        let mut principal = Decimal::ZERO;
        let mut interest = Decimal::ZERO;
        let mut outstanding = Decimal::ZERO;
        for sched in &tranche_schedules {
            let p = &sched.periods[idx];
            principal += p.principal_due;
            interest += p.interest_due;
            outstanding += p.closing_balance;
        }
        periods.push(AggregatePeriod {
            year,
            principal,
            interest,
            debt_service: principal + interest,
            outstanding,
        });
    }

    let output = AggregateSchedule {
        periods,
        tranche_schedules,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Aggregated Debt Schedule",
        &serde_json::json!({
            "tranche_count": tranches.len(),
            "horizon_years": horizon_years,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debt::schedule::AmortizationMethod;
    use rust_decimal_macros::dec;

    fn two_tranche_structure() -> FinancingStructure {
        FinancingStructure {
            acquisition_price: dec!(4_500_000),
            tranches: vec![
                DebtTranche {
                    name: "Senior".into(),
                    principal: dec!(3_000_000),
                    rate: dec!(0.045),
                    duration_years: 7,
                    grace_years: 0,
                    method: AmortizationMethod::ConstantPayment,
                },
                DebtTranche {
                    name: "State-backed loan".into(),
                    principal: dec!(500_000),
                    rate: dec!(0.03),
                    duration_years: 8,
                    grace_years: 2,
                    method: AmortizationMethod::LinearPrincipal,
                },
            ],
            equity_amount: dec!(1_000_000),
            equity_split: BTreeMap::from([
                ("entrepreneur".to_string(), dec!(0.70)),
                ("investors".to_string(), dec!(0.30)),
            ]),
        }
    }

    #[test]
    fn test_balanced_structure_passes() {
        let result = validate_structure(&two_tranche_structure(), None).unwrap();
        let summary = &result.result;
        assert_eq!(summary.total_debt, dec!(3_500_000));
        assert_eq!(summary.financing_gap, Decimal::ZERO);
        // 3.5M / 4.5M
        assert!(summary.debt_share > dec!(0.77) && summary.debt_share < dec!(0.78));
    }

    #[test]
    fn test_unbalanced_structure_rejected() {
        let mut structure = two_tranche_structure();
        structure.equity_amount = dec!(800_000);
        let err = validate_structure(&structure, None).unwrap_err();
        assert!(matches!(err, ViabilityError::Validation { .. }));
    }

    #[test]
    fn test_custom_tolerance_accepts_small_gap() {
        let mut structure = two_tranche_structure();
        structure.equity_amount = dec!(999_500);
        assert!(validate_structure(&structure, None).is_err());
        assert!(validate_structure(&structure, Some(dec!(1_000))).is_ok());
    }

    #[test]
    fn test_duplicate_tranche_names_rejected() {
        let mut structure = two_tranche_structure();
        structure.tranches[1].name = "Senior".into();
        assert!(validate_structure(&structure, None).is_err());
    }

    #[test]
    fn test_equity_split_must_sum_to_one() {
        let mut structure = two_tranche_structure();
        structure
            .equity_split
            .insert("managers".to_string(), dec!(0.20));
        let err = validate_structure(&structure, None).unwrap_err();
        assert!(matches!(err, ViabilityError::Validation { .. }));
    }

    #[test]
    fn test_aggregate_sums_per_year() {
        let structure = two_tranche_structure();
        let result = aggregate_structure(&structure.tranches, 8).unwrap();
        let agg = &result.result;
        assert_eq!(agg.periods.len(), 8);
        assert_eq!(agg.tranche_schedules.len(), 2);

        // Year 1: senior amortizes, state loan in grace
        let y1 = &agg.periods[0];
        let senior_y1 = &agg.tranche_schedules[0].periods[0];
        let state_y1 = &agg.tranche_schedules[1].periods[0];
        assert_eq!(y1.principal, senior_y1.principal_due);
        assert_eq!(y1.interest, senior_y1.interest_due + state_y1.interest_due);
        assert_eq!(y1.debt_service, y1.principal + y1.interest);
        assert_eq!(state_y1.principal_due, Decimal::ZERO);
    }

    #[test]
    fn test_aggregate_outstanding_non_increasing() {
        let structure = two_tranche_structure();
        let result = aggregate_structure(&structure.tranches, 8).unwrap();
        let agg = &result.result;
        for w in agg.periods.windows(2) {
            assert!(
                w[1].outstanding <= w[0].outstanding,
                "Outstanding should never increase: {} then {}",
                w[0].outstanding,
                w[1].outstanding
            );
        }
        // Both tranches repaid by year 8
        assert_eq!(agg.periods[7].outstanding, Decimal::ZERO);
    }

    #[test]
    fn test_empty_tranche_list_aggregates_to_zero() {
        let result = aggregate_structure(&[], 5).unwrap();
        let agg = &result.result;
        assert_eq!(agg.periods.len(), 5);
        for p in &agg.periods {
            assert_eq!(p.debt_service, Decimal::ZERO);
            assert_eq!(p.outstanding, Decimal::ZERO);
        }
    }
}
