pub mod covenants;
pub mod debt;
pub mod decision;
pub mod evaluate;
pub mod normalize;
pub mod projection;
pub mod stress;
