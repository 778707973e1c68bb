//! WMR Evolution - Evolutionary design of a simulated wheeled mobile robot.
//!
//! This crate searches jointly over the physical design and the speed
//! controller of a two-wheeled robot. Candidates are encoded as normalized
//! genomes, screened by a structural feasibility check, simulated for a
//! fixed-duration trial and ranked lexicographically by
//! `(feasibility, objective)`.
//!
//! # Architecture
//!
//! - `schema`: Configuration, genome codec and result types
//! - `compute`: Trial simulation boundary, bundled rover model and the
//!   evolutionary search
//! - `recording`: Binary recording and playback of trials
//!
//! # Example
//!
//! ```rust,no_run
//! use wmr_evolution::{
//!     compute::{RoverSimulator, evolution::EvolutionEngine},
//!     schema::EvolutionConfig,
//! };
//!
//! let config = EvolutionConfig::default();
//! let mut engine = EvolutionEngine::new(config, RoverSimulator::default())?;
//! let result = engine.run()?;
//!
//! println!("Best fitness: {:?}", result.best.fitness);
//! println!("Stopped after {} generations", result.stats.generations);
//! # Ok::<(), wmr_evolution::compute::evolution::EvolutionError>(())
//! ```

pub mod compute;
pub mod recording;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EvolutionEngine, EvolutionError, FitnessEvaluator};
pub use compute::{RoverSimulator, SimulationAdapter, SimulationError, TrialTrace};
pub use schema::{EvolutionConfig, Fitness, Genome, ParameterSpec, RobotParameters};
