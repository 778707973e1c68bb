//! Evolutionary search over wheeled-robot designs.
//!
//! # Overview
//!
//! - **Genome Operations** (`genome`): Seeded random generation and Gaussian mutation
//! - **Fitness** (`fitness`): Feasibility gate, trial simulation and objective scoring
//! - **Population** (`population`): Statistics and elitist replacement
//! - **Selection** (`selection`): Tournament selection and mutation of the pool
//! - **Search** (`search`): Generational loop with stagnation stopping
//!
//! # Example
//!
//! ```rust,no_run
//! use wmr_evolution::compute::RoverSimulator;
//! use wmr_evolution::compute::evolution::EvolutionEngine;
//! use wmr_evolution::schema::EvolutionConfig;
//!
//! let mut engine = EvolutionEngine::new(EvolutionConfig::default(), RoverSimulator::default())?;
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: best = {:?}", progress.generation, progress.best_fitness);
//! })?;
//!
//! println!("Best design: {:?}", result.best.parameters);
//! # Ok::<(), wmr_evolution::compute::evolution::EvolutionError>(())
//! ```

mod fitness;
mod genome;
mod population;
mod search;
mod selection;

pub use fitness::{Evaluation, FitnessEvaluator, index_at_rest, score_trace};
pub use genome::GenomeRng;
pub use population::{Individual, Population};
pub use search::{EvolutionEngine, EvolutionError, StagnationTracker};
pub use selection::{mutate_selected, tournament, tournament_select};
