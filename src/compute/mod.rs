//! Compute module - Trial simulation and evolutionary search.

mod rover;
mod trial;

pub mod evolution;

pub use rover::*;
pub use trial::*;
