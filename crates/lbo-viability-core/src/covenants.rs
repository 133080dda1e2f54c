//! Covenant compliance tracking over a projected trajectory.
//!
//! Pure reporting: violations are recorded, never raised as errors. The
//! only failure mode is an unknown metric identifier, caught before any
//! covenant is evaluated.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::metrics::{MetricFn, MetricRegistry};
use crate::projection::Trajectory;
use crate::types::*;
use crate::ViabilityResult;

/// Comparison operator for a covenant test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CovenantComparison {
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
}

impl CovenantComparison {
    fn holds(&self, value: Decimal, threshold: Decimal) -> bool {
        match self {
            Self::Greater => value > threshold,
            Self::GreaterOrEqual => value >= threshold,
            Self::Less => value < threshold,
            Self::LessOrEqual => value <= threshold,
        }
    }
}

/// A single covenant: a named metric compared against a threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Covenant {
    pub name: String,
    /// Metric identifier resolved against the registry
    pub metric: String,
    pub threshold: Decimal,
    pub comparison: CovenantComparison,
    /// Years the covenant applies to; empty means every projected year
    #[serde(default)]
    pub applicable_years: Vec<u32>,
}

/// Per-year covenant check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearCheck {
    pub year: u32,
    /// None when the metric is undefined for that year
    pub value: Option<Decimal>,
    pub passed: bool,
}

/// Full result for one covenant over the trajectory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovenantResult {
    pub covenant_name: String,
    pub metric: String,
    pub threshold: Decimal,
    pub comparison: CovenantComparison,
    pub checks: Vec<YearCheck>,
    pub first_violation_year: Option<u32>,
    pub violation_count: u32,
}

impl CovenantResult {
    pub fn is_compliant(&self) -> bool {
        self.violation_count == 0
    }
}

/// The conventional lender pair: leverage at most 4.0x, DSCR at least
/// 1.25x, tested every year.
pub fn standard_covenants() -> Vec<Covenant> {
    vec![
        Covenant {
            name: "Maximum leverage".into(),
            metric: "leverage".into(),
            threshold: dec!(4.0),
            comparison: CovenantComparison::LessOrEqual,
            applicable_years: vec![],
        },
        Covenant {
            name: "Minimum DSCR".into(),
            metric: "dscr".into(),
            threshold: dec!(1.25),
            comparison: CovenantComparison::GreaterOrEqual,
            applicable_years: vec![],
        },
    ]
}

/// Evaluate every covenant against the trajectory.
///
/// An undefined metric value (DSCR with no debt service) counts as
/// unconstrained and passes.
pub fn evaluate_covenants(
    covenants: &[Covenant],
    trajectory: &Trajectory,
    registry: &MetricRegistry,
) -> ViabilityResult<ComputationOutput<Vec<CovenantResult>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // Resolve every metric up front so a bad identifier fails before
    // any covenant is evaluated
    let mut evaluators: Vec<MetricFn> = Vec::with_capacity(covenants.len());
    for covenant in covenants {
        evaluators.push(registry.resolve(&covenant.metric)?);
    }

    let mut results: Vec<CovenantResult> = Vec::with_capacity(covenants.len());
    for (covenant, evaluate) in covenants.iter().zip(evaluators) {
        let mut checks: Vec<YearCheck> = Vec::new();
        let mut first_violation_year: Option<u32> = None;
        let mut violation_count = 0u32;

        for year in &trajectory.years {
            if !covenant.applicable_years.is_empty()
                && !covenant.applicable_years.contains(&year.year)
            {
                continue;
            }
            let value = evaluate(year);
            let passed = match value {
                Some(v) => covenant.comparison.holds(v, covenant.threshold),
                None => true,
            };
            if !passed {
                violation_count += 1;
                first_violation_year.get_or_insert(year.year);
            }
            checks.push(YearCheck {
                year: year.year,
                value,
                passed,
            });
        }

        if checks.is_empty() {
            warnings.push(format!(
                "Covenant '{}' applies to no projected year",
                covenant.name
            ));
        }
        if violation_count > 0 {
            warnings.push(format!(
                "Covenant '{}' violated in {} year(s), first in year {}",
                covenant.name,
                violation_count,
                first_violation_year.unwrap_or_default()
            ));
        }

        results.push(CovenantResult {
            covenant_name: covenant.name.clone(),
            metric: covenant.metric.clone(),
            threshold: covenant.threshold,
            comparison: covenant.comparison,
            checks,
            first_violation_year,
            violation_count,
        });
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Covenant Compliance Tracking",
        &serde_json::json!({
            "covenant_count": covenants.len(),
            "horizon_years": trajectory.years.len(),
        }),
        warnings,
        elapsed,
        results,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::YearProjection;
    use rust_decimal_macros::dec;

    fn year_with(year: u32, dscr: Option<Decimal>, leverage: Decimal) -> YearProjection {
        YearProjection {
            year,
            revenue: dec!(8_500_000),
            ebitda_margin: dec!(0.12),
            ebitda: dec!(1_050_000),
            working_capital: Decimal::ZERO,
            wc_change: Decimal::ZERO,
            capex: dec!(250_000),
            cash_tax: dec!(262_500),
            cfads: dec!(537_500),
            debt_service: dec!(509_100),
            dscr,
            outstanding_debt: leverage * dec!(1_050_000),
            leverage,
            free_cash_flow: dec!(28_400),
        }
    }

    fn trajectory_with_dscrs(dscrs: &[Decimal]) -> Trajectory {
        Trajectory {
            years: dscrs
                .iter()
                .enumerate()
                .map(|(i, d)| year_with(i as u32 + 1, Some(*d), dec!(2.5)))
                .collect(),
        }
    }

    #[test]
    fn test_single_violation_in_first_year() {
        let trajectory = trajectory_with_dscrs(&[
            dec!(1.10),
            dec!(1.30),
            dec!(1.40),
            dec!(1.50),
            dec!(1.60),
        ]);
        let covenants = vec![Covenant {
            name: "Minimum DSCR".into(),
            metric: "dscr".into(),
            threshold: dec!(1.25),
            comparison: CovenantComparison::GreaterOrEqual,
            applicable_years: vec![],
        }];
        let result =
            evaluate_covenants(&covenants, &trajectory, &MetricRegistry::standard()).unwrap();
        let r = &result.result[0];
        assert_eq!(r.first_violation_year, Some(1));
        assert_eq!(r.violation_count, 1);
        assert!(!r.checks[0].passed);
        assert!(r.checks[1..].iter().all(|c| c.passed));
    }

    #[test]
    fn test_undefined_dscr_counts_as_pass() {
        let trajectory = Trajectory {
            years: vec![year_with(1, None, dec!(2.0)), year_with(2, None, dec!(1.5))],
        };
        let covenants = standard_covenants();
        let result =
            evaluate_covenants(&covenants, &trajectory, &MetricRegistry::standard()).unwrap();
        let dscr_result = &result.result[1];
        assert_eq!(dscr_result.metric, "dscr");
        assert!(dscr_result.is_compliant());
        assert!(dscr_result.checks.iter().all(|c| c.value.is_none() && c.passed));
    }

    #[test]
    fn test_applicable_years_restrict_checks() {
        let trajectory = trajectory_with_dscrs(&[dec!(1.00), dec!(1.00), dec!(1.40)]);
        let covenants = vec![Covenant {
            name: "DSCR from year 3".into(),
            metric: "dscr".into(),
            threshold: dec!(1.25),
            comparison: CovenantComparison::GreaterOrEqual,
            applicable_years: vec![3],
        }];
        let result =
            evaluate_covenants(&covenants, &trajectory, &MetricRegistry::standard()).unwrap();
        let r = &result.result[0];
        assert_eq!(r.checks.len(), 1);
        assert!(r.is_compliant());
    }

    #[test]
    fn test_unknown_metric_fails_before_evaluation() {
        let trajectory = trajectory_with_dscrs(&[dec!(1.50)]);
        let covenants = vec![
            Covenant {
                name: "Valid".into(),
                metric: "leverage".into(),
                threshold: dec!(4.0),
                comparison: CovenantComparison::LessOrEqual,
                applicable_years: vec![],
            },
            Covenant {
                name: "Broken".into(),
                metric: "ebit".into(),
                threshold: Decimal::ZERO,
                comparison: CovenantComparison::Greater,
                applicable_years: vec![],
            },
        ];
        let err = evaluate_covenants(&covenants, &trajectory, &MetricRegistry::standard())
            .unwrap_err();
        assert!(matches!(err, crate::ViabilityError::Configuration(_)));
    }

    #[test]
    fn test_standard_pair_passes_healthy_trajectory() {
        let trajectory = trajectory_with_dscrs(&[dec!(1.30), dec!(1.40), dec!(1.50)]);
        let result = evaluate_covenants(
            &standard_covenants(),
            &trajectory,
            &MetricRegistry::standard(),
        )
        .unwrap();
        assert!(result.result.iter().all(CovenantResult::is_compliant));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_violation_reported_not_raised() {
        let trajectory = trajectory_with_dscrs(&[dec!(0.80), dec!(0.90)]);
        let result = evaluate_covenants(
            &standard_covenants(),
            &trajectory,
            &MetricRegistry::standard(),
        )
        .unwrap();
        let dscr_result = &result.result[1];
        assert_eq!(dscr_result.violation_count, 2);
        assert!(!result.warnings.is_empty());
    }
}
