//! Data layer of a review-sentiment dashboard: load delimited tables from
//! files or URLs, aggregate sentiment, correlate numeric columns, parse
//! top-feature reports and export CSV.

pub mod backend;
pub mod config;
pub mod data;
pub mod error;
pub mod jobs;
pub mod state;
pub mod stats;
pub mod text;

pub use data::loader::{load, LoadOptions, Source};
pub use data::model::{Row, Table, Value};
pub use error::LoadError;
