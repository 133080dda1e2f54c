//! Weighted scoring of a trajectory into a GO / WATCH / NO-GO decision.
//!
//! Five decisive metrics, each mapped to a 0..=100 score via monotonic
//! threshold bands, then combined as a weighted average. Bands, weights,
//! and policy boundaries are configuration, not hard-coded.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ViabilityError;
use crate::projection::Trajectory;
use crate::types::*;
use crate::ViabilityResult;

/// Score stand-in for a DSCR that is never constrained (no debt service
/// in any year).
const DSCR_UNCONSTRAINED: Decimal = dec!(999);

/// Score stand-in for free cash flow that never turns positive.
const FCF_NEVER_POSITIVE_YEAR: Decimal = dec!(99);

/// The five decisive metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMetric {
    DscrMin,
    LeverageFinal,
    EbitdaMarginYear1,
    FcfConversionYear1,
    FcfPositiveYear,
}

/// One scoring band: the score awarded when the value clears the
/// threshold in the criterion's favorable direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreBand {
    pub threshold: Decimal,
    pub score: u32,
}

/// Configuration for one decisive criterion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionSpec {
    pub name: String,
    pub metric: DecisionMetric,
    /// When true, bands are tested as value >= threshold in declining
    /// threshold order; when false, as value <= threshold in rising order
    pub higher_is_better: bool,
    pub bands: Vec<ScoreBand>,
    /// Score when no band matches
    pub fallback_score: u32,
    pub weight: Decimal,
}

/// Score boundaries for the final verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionPolicy {
    /// GO requires at least this overall score
    pub go_min_score: u32,
    /// GO also requires every criterion at or above this score
    pub go_min_criterion_score: u32,
    /// Below this overall score the verdict is NO-GO
    pub watch_min_score: u32,
    /// A criterion at or below this score is a deal breaker
    pub deal_breaker_score: u32,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            go_min_score: 90,
            go_min_criterion_score: 80,
            watch_min_score: 70,
            deal_breaker_score: 20,
        }
    }
}

/// Full decision configuration: criteria plus policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionSpec {
    pub criteria: Vec<CriterionSpec>,
    pub policy: DecisionPolicy,
}

impl Default for DecisionSpec {
    fn default() -> Self {
        Self {
            criteria: vec![
                CriterionSpec {
                    name: "DSCR minimum".into(),
                    metric: DecisionMetric::DscrMin,
                    higher_is_better: true,
                    bands: vec![
                        ScoreBand { threshold: dec!(1.5), score: 100 },
                        ScoreBand { threshold: dec!(1.25), score: 80 },
                        ScoreBand { threshold: dec!(1.0), score: 50 },
                    ],
                    fallback_score: 0,
                    weight: dec!(2.0),
                },
                CriterionSpec {
                    name: "Final-year leverage".into(),
                    metric: DecisionMetric::LeverageFinal,
                    higher_is_better: false,
                    bands: vec![
                        ScoreBand { threshold: dec!(3.5), score: 100 },
                        ScoreBand { threshold: dec!(4.0), score: 80 },
                        ScoreBand { threshold: dec!(5.0), score: 50 },
                    ],
                    fallback_score: 0,
                    weight: dec!(1.5),
                },
                CriterionSpec {
                    name: "Year-1 EBITDA margin".into(),
                    metric: DecisionMetric::EbitdaMarginYear1,
                    higher_is_better: true,
                    bands: vec![
                        ScoreBand { threshold: dec!(0.15), score: 100 },
                        ScoreBand { threshold: dec!(0.10), score: 60 },
                        ScoreBand { threshold: dec!(0.05), score: 30 },
                    ],
                    fallback_score: 0,
                    weight: Decimal::ONE,
                },
                CriterionSpec {
                    name: "Year-1 FCF conversion".into(),
                    metric: DecisionMetric::FcfConversionYear1,
                    higher_is_better: true,
                    bands: vec![
                        ScoreBand { threshold: dec!(0.40), score: 100 },
                        ScoreBand { threshold: dec!(0.30), score: 80 },
                    ],
                    fallback_score: 50,
                    weight: Decimal::ONE,
                },
                CriterionSpec {
                    name: "First positive-FCF year".into(),
                    metric: DecisionMetric::FcfPositiveYear,
                    higher_is_better: false,
                    bands: vec![
                        ScoreBand { threshold: dec!(2), score: 100 },
                        ScoreBand { threshold: dec!(3), score: 50 },
                    ],
                    fallback_score: 20,
                    weight: Decimal::ONE,
                },
            ],
            policy: DecisionPolicy::default(),
        }
    }
}

/// Scored criterion in the final decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionCriterion {
    pub name: String,
    pub metric: DecisionMetric,
    pub value: Decimal,
    pub score: u32,
    pub weight: Decimal,
}

/// The final verdict with its full scoring breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionDecision {
    pub recommendation: Recommendation,
    pub overall_score: u32,
    pub criteria: Vec<DecisionCriterion>,
    pub deal_breakers: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
    /// Optional label when deciding a named stress scenario
    pub scenario: Option<String>,
}

fn validate_spec(spec: &DecisionSpec) -> ViabilityResult<()> {
    if spec.criteria.is_empty() {
        return Err(ViabilityError::Configuration(
            "Decision spec must carry at least one criterion".into(),
        ));
    }
    let mut total_weight = Decimal::ZERO;
    for criterion in &spec.criteria {
        if criterion.bands.is_empty() {
            return Err(ViabilityError::Configuration(format!(
                "Criterion '{}' has no scoring bands",
                criterion.name
            )));
        }
        for pair in criterion.bands.windows(2) {
            let ordered = if criterion.higher_is_better {
                pair[0].threshold > pair[1].threshold
            } else {
                pair[0].threshold < pair[1].threshold
            };
            if !ordered {
                return Err(ViabilityError::Configuration(format!(
                    "Criterion '{}' bands are not monotonic",
                    criterion.name
                )));
            }
        }
        if criterion.weight <= Decimal::ZERO {
            return Err(ViabilityError::Configuration(format!(
                "Criterion '{}' weight must be positive",
                criterion.name
            )));
        }
        total_weight += criterion.weight;
    }
    if total_weight.is_zero() {
        return Err(ViabilityError::Configuration(
            "Total criterion weight must be positive".into(),
        ));
    }
    Ok(())
}

fn metric_value(metric: DecisionMetric, trajectory: &Trajectory) -> Decimal {
    match metric {
        DecisionMetric::DscrMin => trajectory.dscr_min().unwrap_or(DSCR_UNCONSTRAINED),
        DecisionMetric::LeverageFinal => trajectory.leverage_end(),
        DecisionMetric::EbitdaMarginYear1 => trajectory.years[0].ebitda_margin,
        DecisionMetric::FcfConversionYear1 => {
            let y1 = &trajectory.years[0];
            y1.free_cash_flow / y1.ebitda
        }
        DecisionMetric::FcfPositiveYear => trajectory
            .first_non_negative_fcf_year()
            .map(Decimal::from)
            .unwrap_or(FCF_NEVER_POSITIVE_YEAR),
    }
}

fn score_value(criterion: &CriterionSpec, value: Decimal) -> u32 {
    for band in &criterion.bands {
        let cleared = if criterion.higher_is_better {
            value >= band.threshold
        } else {
            value <= band.threshold
        };
        if cleared {
            return band.score;
        }
    }
    criterion.fallback_score
}

fn weak_metric_recommendation(metric: DecisionMetric) -> &'static str {
    match metric {
        DecisionMetric::DscrMin => {
            "Debt service coverage is thin; consider longer maturities, a grace period, or less senior debt"
        }
        DecisionMetric::LeverageFinal => {
            "Leverage stays high at the end of the horizon; increase equity or reduce the acquisition price"
        }
        DecisionMetric::EbitdaMarginYear1 => {
            "Margins are weak; negotiate price or improve the margin mix"
        }
        DecisionMetric::FcfConversionYear1 => {
            "Little EBITDA converts to free cash flow; review capex and working capital needs"
        }
        DecisionMetric::FcfPositiveYear => {
            "Free cash flow turns positive late; build a cash buffer for the early years"
        }
    }
}

/// Score the trajectory against the spec and render the verdict.
///
/// Pure in its scoring: identical trajectory and spec always give the
/// same scores, verdict, and message lists. Only the timestamp varies.
pub fn decide(
    trajectory: &Trajectory,
    spec: &DecisionSpec,
    scenario: Option<&str>,
) -> ViabilityResult<ComputationOutput<AcquisitionDecision>> {
    let start = Instant::now();
    let envelope_warnings: Vec<String> = Vec::new();

    validate_spec(spec)?;
    if trajectory.years.is_empty() {
        return Err(ViabilityError::Validation {
            field: "trajectory".into(),
            reason: "Trajectory must carry at least one projected year".into(),
        });
    }

    let mut criteria: Vec<DecisionCriterion> = Vec::with_capacity(spec.criteria.len());
    let mut weighted_sum = Decimal::ZERO;
    let mut total_weight = Decimal::ZERO;

    for criterion in &spec.criteria {
        let value = metric_value(criterion.metric, trajectory);
        let score = score_value(criterion, value);
        weighted_sum += Decimal::from(score) * criterion.weight;
        total_weight += criterion.weight;
        criteria.push(DecisionCriterion {
            name: criterion.name.clone(),
            metric: criterion.metric,
            value,
            score,
            weight: criterion.weight,
        });
    }

    let overall_score = (weighted_sum / total_weight)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0);

    let policy = &spec.policy;
    let mut deal_breakers: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut recommendations: Vec<String> = Vec::new();

    for criterion in &criteria {
        if criterion.score <= policy.deal_breaker_score {
            deal_breakers.push(format!(
                "{} scores {} (value {}); this alone blocks the deal",
                criterion.name, criterion.score, criterion.value
            ));
        } else if criterion.score < policy.go_min_criterion_score {
            warnings.push(format!(
                "{} scores {} (value {}), below the comfort threshold",
                criterion.name, criterion.score, criterion.value
            ));
        }
        if criterion.score < policy.go_min_criterion_score {
            recommendations.push(weak_metric_recommendation(criterion.metric).to_string());
        }
    }

    let all_criteria_green = criteria
        .iter()
        .all(|c| c.score >= policy.go_min_criterion_score);
    let recommendation = if !deal_breakers.is_empty() || overall_score < policy.watch_min_score {
        Recommendation::NoGo
    } else if overall_score >= policy.go_min_score && all_criteria_green {
        Recommendation::Go
    } else {
        Recommendation::Watch
    };

    if recommendation == Recommendation::Go {
        recommendations.insert(0, "All decisive criteria are green.".to_string());
    }

    let decision = AcquisitionDecision {
        recommendation,
        overall_score,
        criteria,
        deal_breakers,
        warnings,
        recommendations,
        timestamp: Utc::now(),
        scenario: scenario.map(str::to_string),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Weighted Multi-Criteria Decision",
        &serde_json::json!({
            "criterion_count": spec.criteria.len(),
            "go_min_score": policy.go_min_score,
            "watch_min_score": policy.watch_min_score,
            "scenario": scenario,
        }),
        envelope_warnings,
        elapsed,
        decision,
    ))
}
