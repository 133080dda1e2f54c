pub mod schedule;
pub mod structure;

pub use schedule::{AmortizationMethod, DebtPeriod, DebtTranche, TrancheSchedule};
pub use structure::{AggregatePeriod, AggregateSchedule, FinancingStructure};
