//! Training backend: shared HTTP plumbing, the JSON client and run
//! parameter normalisation.

pub mod client;
pub mod http;
pub mod params;
