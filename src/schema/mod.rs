//! Schema module - Configuration, genome and result types for WMR evolution.

mod config;
mod evolution;
mod fitness;
mod genome;

pub use config::*;
pub use evolution::*;
pub use fitness::*;
pub use genome::*;
