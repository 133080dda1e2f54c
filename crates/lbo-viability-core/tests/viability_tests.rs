//! End-to-end screening of a reference acquisition case.

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

use lbo_viability_core::covenants::{evaluate_covenants, standard_covenants};
use lbo_viability_core::debt::schedule::AmortizationMethod;
use lbo_viability_core::debt::structure::{aggregate_structure, FinancingStructure};
use lbo_viability_core::debt::DebtTranche;
use lbo_viability_core::decision::DecisionSpec;
use lbo_viability_core::evaluate::{run_evaluation, EvaluationInput};
use lbo_viability_core::metrics::MetricRegistry;
use lbo_viability_core::normalization::{
    normalize, AdjustmentCategory, AdjustmentEntry, NormalizationInput,
};
use lbo_viability_core::projection::{project, OperatingAssumptions};
use lbo_viability_core::stress::{run_stress_suite, StressScenario};
use lbo_viability_core::{Recommendation, ViabilityError};

/// A 8.5M-revenue target bought for 4.5M with a 3M senior tranche.
fn reference_case() -> EvaluationInput {
    EvaluationInput {
        normalization: NormalizationInput {
            base_operating_result: dec!(900_000),
            adjustments: vec![
                AdjustmentEntry {
                    name: "Owner compensation restatement".into(),
                    amount: dec!(120_000),
                    category: AdjustmentCategory::Personnel,
                    rationale: "Salary above market for a replacement manager".into(),
                },
                AdjustmentEntry {
                    name: "Finance lease rents".into(),
                    amount: dec!(30_000),
                    category: AdjustmentCategory::Rent,
                    rationale: String::new(),
                },
            ],
            tax_rate: dec!(0.25),
            maintenance_capex: dec!(250_000),
        },
        structure: FinancingStructure {
            acquisition_price: dec!(4_500_000),
            tranches: vec![DebtTranche {
                name: "Senior".into(),
                principal: dec!(3_000_000),
                rate: dec!(0.045),
                duration_years: 7,
                grace_years: 0,
                method: AmortizationMethod::ConstantPayment,
            }],
            equity_amount: dec!(1_500_000),
            equity_split: BTreeMap::from([
                ("entrepreneur".to_string(), dec!(0.70)),
                ("investors".to_string(), dec!(0.30)),
            ]),
        },
        assumptions: OperatingAssumptions {
            base_revenue: dec!(8_500_000),
            revenue_growth: vec![Decimal::ZERO],
            margin_delta: vec![Decimal::ZERO],
            wc_fraction: Decimal::ZERO,
            capex_fraction: Decimal::ZERO,
            development_capex: vec![dec!(250_000); 7],
            tax_rate: dec!(0.25),
        },
        horizon_years: 7,
        covenants: None,
        scenarios: None,
        decision: None,
        balance_tolerance: None,
    }
}

#[test]
fn full_pipeline_reaches_watch_verdict() {
    let input = reference_case();
    let output = run_evaluation(&input).unwrap();
    let result = &output.result;

    assert_eq!(result.normalized.bank_ebitda, dec!(1_050_000));
    assert_eq!(result.normalized.equity_ebitda, dec!(537_500));

    // Thin DSCR and fallback FCF conversion hold the score at 71
    assert_eq!(result.decision.overall_score, 71);
    assert_eq!(result.decision.recommendation, Recommendation::Watch);
    assert!(result.decision.deal_breakers.is_empty());
}

#[test]
fn full_pipeline_covenant_report() {
    let output = run_evaluation(&reference_case()).unwrap();
    let covenants = &output.result.covenants;
    assert_eq!(covenants.len(), 2);

    let leverage = &covenants[0];
    assert_eq!(leverage.metric, "leverage");
    assert!(leverage.is_compliant());

    // DSCR stays around 1.06, below the 1.25 floor in every year
    let dscr = &covenants[1];
    assert_eq!(dscr.metric, "dscr");
    assert_eq!(dscr.first_violation_year, Some(1));
    assert_eq!(dscr.violation_count, 7);
}

#[test]
fn full_pipeline_stress_suite_runs_all_predefined() {
    let output = run_evaluation(&reference_case()).unwrap();
    let stress = &output.result.stress;
    assert_eq!(stress.len(), 7);
    assert!(stress.iter().all(|r| r.outcome.is_some()));

    let nominal = stress[0].outcome.as_ref().unwrap();
    assert_eq!(nominal.classification, Recommendation::Watch);

    // A 20% revenue drop pushes DSCR below 1.0
    let deep = stress[2].outcome.as_ref().unwrap();
    assert_eq!(deep.classification, Recommendation::NoGo);
    assert!(deep.dscr_min.unwrap() < Decimal::ONE);
}

#[test]
fn senior_annuity_debt_service() {
    let input = reference_case();
    let schedule = aggregate_structure(&input.structure.tranches, 7).unwrap().result;
    let service_y1 = schedule.periods[0].debt_service;
    assert!(
        service_y1 > dec!(509_000) && service_y1 < dec!(510_000),
        "Expected the 3M/4.5%/7y annuity near 509,100, got {service_y1}"
    );
    assert_eq!(schedule.periods[6].outstanding, Decimal::ZERO);
}

#[test]
fn projection_is_idempotent() {
    let input = reference_case();
    let normalized = normalize(&input.normalization).unwrap().result;
    let schedule = aggregate_structure(&input.structure.tranches, 7).unwrap().result;
    let a = project(&normalized, &input.assumptions, &schedule, 7).unwrap();
    let b = project(&normalized, &input.assumptions, &schedule, 7).unwrap();
    assert_eq!(a.result, b.result);
}

#[test]
fn grace_period_defers_principal_not_interest() {
    let mut input = reference_case();
    input.structure.tranches[0].grace_years = 2;
    let schedule = aggregate_structure(&input.structure.tranches, 7).unwrap().result;
    assert_eq!(schedule.periods[0].principal, Decimal::ZERO);
    assert_eq!(schedule.periods[0].interest, dec!(135_000));
    assert_eq!(schedule.periods[1].outstanding, dec!(3_000_000));
    assert_eq!(schedule.periods[6].outstanding, Decimal::ZERO);
}

#[test]
fn failing_scenario_does_not_abort_the_suite() {
    let input = reference_case();
    let normalized = normalize(&input.normalization).unwrap().result;
    let lethal = StressScenario {
        name: "Margin collapse".into(),
        margin_shift: dec!(-0.20),
        ..StressScenario::nominal()
    };
    let output = run_stress_suite(
        &[lethal],
        &input.assumptions,
        &input.structure,
        &normalized,
        7,
    )
    .unwrap();
    let runs = &output.result;
    assert_eq!(runs.len(), 8);
    let failed = runs.iter().find(|r| r.name == "Margin collapse").unwrap();
    assert!(failed.outcome.is_none());
    assert!(failed.error.is_some());
    assert_eq!(runs.iter().filter(|r| r.outcome.is_some()).count(), 7);
}

#[test]
fn unknown_covenant_metric_fails_before_evaluation() {
    let input = reference_case();
    let normalized = normalize(&input.normalization).unwrap().result;
    let schedule = aggregate_structure(&input.structure.tranches, 7).unwrap().result;
    let trajectory = project(&normalized, &input.assumptions, &schedule, 7)
        .unwrap()
        .result;

    let mut covenants = standard_covenants();
    covenants[0].metric = "net_debt_to_equity".into();
    let err = evaluate_covenants(&covenants, &trajectory, &MetricRegistry::standard())
        .unwrap_err();
    assert!(matches!(err, ViabilityError::Configuration(_)));
}

#[test]
fn unbalanced_structure_rejected_up_front() {
    let mut input = reference_case();
    input.structure.equity_amount = dec!(500_000);
    let err = run_evaluation(&input).unwrap_err();
    assert!(matches!(err, ViabilityError::Validation { .. }));
}

#[test]
fn custom_decision_spec_flows_through() {
    let mut input = reference_case();
    let mut spec = DecisionSpec::default();
    // Lower the WATCH floor so the same case becomes a NO-GO boundary test
    spec.policy.watch_min_score = 75;
    input.decision = Some(spec);
    let output = run_evaluation(&input).unwrap();
    assert_eq!(output.result.decision.recommendation, Recommendation::NoGo);
}
