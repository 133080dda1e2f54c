//! Named per-year metric evaluators for covenant testing.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::error::ViabilityError;
use crate::projection::YearProjection;
use crate::ViabilityResult;

/// Pure per-year metric evaluator. Returns None when the metric is
/// undefined for that year (e.g. DSCR with no debt service).
pub type MetricFn = fn(&YearProjection) -> Option<Decimal>;

/// Registry mapping metric identifiers to evaluators.
///
/// Built once and passed by reference; there is no process-wide
/// singleton. BTreeMap keeps `names()` output deterministic.
#[derive(Debug, Clone)]
pub struct MetricRegistry {
    metrics: BTreeMap<String, MetricFn>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            metrics: BTreeMap::new(),
        }
    }

    /// Registry covering every column of a year projection.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("revenue", |y| Some(y.revenue));
        registry.register("ebitda", |y| Some(y.ebitda));
        registry.register("ebitda_margin", |y| Some(y.ebitda_margin));
        registry.register("working_capital", |y| Some(y.working_capital));
        registry.register("wc_change", |y| Some(y.wc_change));
        registry.register("capex", |y| Some(y.capex));
        registry.register("cash_tax", |y| Some(y.cash_tax));
        registry.register("cfads", |y| Some(y.cfads));
        registry.register("debt_service", |y| Some(y.debt_service));
        registry.register("dscr", |y| y.dscr);
        registry.register("outstanding_debt", |y| Some(y.outstanding_debt));
        registry.register("leverage", |y| Some(y.leverage));
        registry.register("free_cash_flow", |y| Some(y.free_cash_flow));
        registry
    }

    pub fn register(&mut self, name: &str, f: MetricFn) {
        self.metrics.insert(name.to_string(), f);
    }

    /// Look up an evaluator, failing fast on unknown identifiers.
    pub fn resolve(&self, name: &str) -> ViabilityResult<MetricFn> {
        self.metrics.get(name).copied().ok_or_else(|| {
            ViabilityError::Configuration(format!(
                "Unknown metric '{}'; known metrics: {}",
                name,
                self.names().join(", ")
            ))
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.metrics.keys().map(String::as_str).collect()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_year() -> YearProjection {
        YearProjection {
            year: 1,
            revenue: dec!(8_500_000),
            ebitda_margin: dec!(0.12),
            ebitda: dec!(1_020_000),
            working_capital: dec!(850_000),
            wc_change: dec!(25_000),
            capex: dec!(250_000),
            cash_tax: dec!(255_000),
            cfads: dec!(490_000),
            debt_service: dec!(509_100),
            dscr: None,
            outstanding_debt: dec!(2_625_900),
            leverage: dec!(2.57),
            free_cash_flow: dec!(-19_100),
        }
    }

    #[test]
    fn test_standard_registry_resolves_all_columns() {
        let registry = MetricRegistry::standard();
        let year = sample_year();
        for name in registry.names() {
            let f = registry.resolve(name).unwrap();
            // Every metric except DSCR is defined for this row
            if name != "dscr" {
                assert!(f(&year).is_some(), "metric '{name}' returned None");
            }
        }
    }

    #[test]
    fn test_dscr_metric_passes_through_sentinel() {
        let registry = MetricRegistry::standard();
        let f = registry.resolve("dscr").unwrap();
        let mut year = sample_year();
        assert_eq!(f(&year), None);
        year.dscr = Some(dec!(1.10));
        assert_eq!(f(&year), Some(dec!(1.10)));
    }

    #[test]
    fn test_unknown_metric_is_configuration_error() {
        let registry = MetricRegistry::standard();
        let err = registry.resolve("net_income").unwrap_err();
        assert!(matches!(err, ViabilityError::Configuration(_)));
    }

    #[test]
    fn test_custom_metric_registration() {
        let mut registry = MetricRegistry::standard();
        registry.register("cfads_after_capex", |y| Some(y.cfads - y.capex));
        let f = registry.resolve("cfads_after_capex").unwrap();
        assert_eq!(f(&sample_year()), Some(dec!(240_000)));
    }
}
