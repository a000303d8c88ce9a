//! Aggregations over loaded tables.

pub mod confusion;
pub mod correlation;
pub mod tally;
pub mod trend;
