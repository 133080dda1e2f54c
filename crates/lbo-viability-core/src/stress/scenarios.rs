//! Scenario definitions and outcome classification.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Multiple, Rate, Recommendation};

/// Deltas applied on top of the base case.
///
/// Revenue and margin shifts land on the year-1 growth and margin-delta
/// entries, so they act as a one-off level shock that persists over the
/// horizon. Rate shift applies to every tranche; the working capital
/// shift to the WC fraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressScenario {
    pub name: String,
    #[serde(default)]
    pub revenue_shift: Rate,
    #[serde(default)]
    pub margin_shift: Rate,
    #[serde(default)]
    pub rate_shift: Rate,
    #[serde(default)]
    pub wc_shift: Rate,
}

impl StressScenario {
    pub fn nominal() -> Self {
        Self {
            name: "Nominal".into(),
            revenue_shift: Decimal::ZERO,
            margin_shift: Decimal::ZERO,
            rate_shift: Decimal::ZERO,
            wc_shift: Decimal::ZERO,
        }
    }
}

/// The predefined suite, in fixed order.
pub fn predefined_scenarios() -> Vec<StressScenario> {
    vec![
        StressScenario::nominal(),
        StressScenario {
            name: "Revenue -10%".into(),
            revenue_shift: dec!(-0.10),
            ..StressScenario::nominal()
        },
        StressScenario {
            name: "Revenue -20%".into(),
            revenue_shift: dec!(-0.20),
            ..StressScenario::nominal()
        },
        StressScenario {
            name: "Margin -2pts".into(),
            margin_shift: dec!(-0.02),
            ..StressScenario::nominal()
        },
        StressScenario {
            name: "Rate +200bps".into(),
            rate_shift: dec!(0.02),
            ..StressScenario::nominal()
        },
        StressScenario {
            name: "Working capital +5pts".into(),
            wc_shift: dec!(0.05),
            ..StressScenario::nominal()
        },
        StressScenario {
            name: "Combined".into(),
            revenue_shift: dec!(-0.15),
            margin_shift: dec!(-0.01),
            rate_shift: dec!(0.01),
            wc_shift: Decimal::ZERO,
        },
    ]
}

/// Classify a scenario outcome from its minimum DSCR and final leverage.
///
/// An undefined DSCR (no debt service in any year) is unconstrained and
/// never blocks a GO. Monotone in both inputs: improving either can
/// never worsen the classification.
pub fn classify(dscr_min: Option<Multiple>, leverage_end: Multiple) -> Recommendation {
    let dscr_ok = dscr_min.map_or(true, |d| d >= dec!(1.25));
    let dscr_broken = dscr_min.map_or(false, |d| d < dec!(1.0));

    if dscr_broken || leverage_end > dec!(5.0) {
        Recommendation::NoGo
    } else if dscr_ok && leverage_end <= dec!(4.0) {
        Recommendation::Go
    } else {
        Recommendation::Watch
    }
}
