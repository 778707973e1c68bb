//! Generational evolution loop with elitism and stagnation stopping.

use std::time::Instant;

use rayon::prelude::*;

use crate::compute::{SimulationAdapter, SimulationError};
use crate::schema::{
    CandidateReport, EvolutionConfig, EvolutionConfigError, EvolutionHistory, EvolutionPhase,
    EvolutionProgress, EvolutionResult, EvolutionStats, Fitness, GenerationStats, StopReason,
};

use super::fitness::FitnessEvaluator;
use super::genome::GenomeRng;
use super::population::{Individual, Population};
use super::selection::{mutate_selected, tournament_select};

/// Errors that abort an evolution run.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Invalid evolution config: {0}")]
    Config(#[from] EvolutionConfigError),
    #[error("Trial failed: {0}")]
    Simulation(#[from] SimulationError),
    #[error("Population is empty")]
    EmptyPopulation,
}

/// Best fitness seen so far and how many checks it has gone unimproved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagnationTracker {
    pub best_seen: Fitness,
    pub stall_count: usize,
}

impl Default for StagnationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StagnationTracker {
    pub const fn new() -> Self {
        Self {
            best_seen: Fitness::UNEVALUATED,
            stall_count: 0,
        }
    }

    /// Fold in the current population's best fitness.
    ///
    /// Returns the updated tracker and whether the stall count has reached
    /// `limit`.
    #[must_use]
    pub fn observe(self, best: Fitness, limit: usize) -> (Self, bool) {
        let next = if best > self.best_seen {
            Self {
                best_seen: best,
                stall_count: 0,
            }
        } else {
            Self {
                best_seen: self.best_seen,
                stall_count: self.stall_count + 1,
            }
        };
        (next, next.stall_count >= limit)
    }
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine<A> {
    config: EvolutionConfig,
    rng: GenomeRng,
    evaluator: FitnessEvaluator<A>,
    population: Population,
    history: EvolutionHistory,
    generation: usize,
    best_ever: Fitness,
    stagnation: StagnationTracker,
    evaluations: u64,
    phase: EvolutionPhase,
}

impl<A: SimulationAdapter> EvolutionEngine<A> {
    /// Create a new evolution engine. The config is validated up front.
    pub fn new(config: EvolutionConfig, adapter: A) -> Result<Self, EvolutionError> {
        config.validate()?;

        let rng = GenomeRng::new(config.random_seed);
        let evaluator = FitnessEvaluator::from_config(adapter, &config);

        Ok(Self {
            config,
            rng,
            evaluator,
            population: Population::default(),
            history: EvolutionHistory::default(),
            generation: 0,
            best_ever: Fitness::UNEVALUATED,
            stagnation: StagnationTracker::new(),
            evaluations: 0,
            phase: EvolutionPhase::Initializing,
        })
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &FitnessEvaluator<A> {
        &self.evaluator
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn phase(&self) -> EvolutionPhase {
        self.phase
    }

    /// Initialize the population: random genomes with the baseline design
    /// in slot 0.
    pub fn initialize(&mut self) {
        self.phase = EvolutionPhase::Initializing;
        self.generation = 0;
        self.evaluations = 0;
        self.best_ever = Fitness::UNEVALUATED;
        self.stagnation = StagnationTracker::new();
        self.history = EvolutionHistory::default();
        self.rng = GenomeRng::new(self.config.random_seed);

        let genome_len = self.config.parameters.len();
        self.population =
            Population::initialize(self.config.population.size, genome_len, &mut self.rng);

        let seed = self.config.parameters.encode(&self.config.baseline);
        self.population.replace(0, seed);
    }

    /// Evaluate every individual of `population`.
    fn evaluate(&mut self, population: &mut Population) -> Result<(), EvolutionError> {
        self.phase = EvolutionPhase::Evaluating;
        evaluate_individuals(
            &self.evaluator,
            population.individuals_mut(),
            self.config.evaluation.parallel,
        )?;
        self.evaluations += population.len() as u64;
        Ok(())
    }

    /// Run a single generation step.
    fn step_generation(&mut self) -> Result<(), EvolutionError> {
        let algorithm = &self.config.algorithm;
        let rate = algorithm.effective_mutation_rate(self.config.parameters.len());
        let scale = algorithm.mutation_scale;

        self.phase = EvolutionPhase::Selecting;
        let selected = tournament_select(&self.population, algorithm.tournament_size, &mut self.rng);

        self.phase = EvolutionPhase::Mutating;
        let mut children = mutate_selected(&selected, rate, scale, &mut self.rng);

        self.evaluate(&mut children)?;

        self.phase = EvolutionPhase::Combining;
        self.population = Population::combine(&self.population, children);
        self.generation += 1;
        Ok(())
    }

    /// Append the current population's statistics to the history.
    fn record(&mut self) -> GenerationStats {
        self.phase = EvolutionPhase::Recording;
        let statistics = self.population.statistics();
        self.best_ever = self.best_ever.max(statistics.best);

        let stats = GenerationStats {
            generation: self.generation,
            worst: statistics.worst,
            average: statistics.average,
            best: statistics.best,
            best_ever: self.best_ever,
        };
        self.history.push(stats.clone());
        stats
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        EvolutionProgress {
            generation: self.generation,
            total_generations: self.config.population.max_generations,
            statistics: self.population.statistics(),
            best_fitness: self.best_ever,
            stagnation_count: self.stagnation.stall_count,
            evaluations: self.evaluations,
            phase: self.phase,
        }
    }

    /// Check if evolution should stop.
    fn should_stop(&mut self) -> Option<StopReason> {
        let best = self
            .population
            .best()
            .map_or(Fitness::UNEVALUATED, |ind| ind.fitness);
        let (tracker, stalled) = self
            .stagnation
            .observe(best, self.config.population.stagnation_limit);
        self.stagnation = tracker;

        if stalled {
            return Some(StopReason::Stagnation);
        }

        if self.generation >= self.config.population.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        None
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<EvolutionResult, EvolutionError>
    where
        F: FnMut(&EvolutionProgress),
    {
        let start_time = Instant::now();
        log::info!(
            "Starting evolution: population {}, up to {} generations, seed {}",
            self.config.population.size,
            self.config.population.max_generations,
            self.config.random_seed
        );

        self.initialize();
        let mut population = std::mem::take(&mut self.population);
        self.evaluate(&mut population)?;
        self.population = population;

        let initial = self.record();
        log::debug!(
            "Generation 0: best {:?}, worst {:?}",
            initial.best,
            initial.worst
        );
        callback(&self.progress());

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            self.step_generation()?;

            let stats = self.record();
            log::debug!(
                "Generation {}: best {:?}, average {:?}, stalled {}",
                stats.generation,
                stats.best,
                stats.average,
                self.stagnation.stall_count
            );
            callback(&self.progress());
        };

        self.phase = EvolutionPhase::Stopped;
        let elapsed = start_time.elapsed().as_secs_f64();
        log::info!(
            "Evolution stopped after {} generations ({:?}), {} evaluations in {:.2}s",
            self.generation,
            stop_reason,
            self.evaluations,
            elapsed
        );

        let population = self.report_population()?;
        let best_index = self
            .population
            .best_index()
            .ok_or(EvolutionError::EmptyPopulation)?;
        let best = population
            .get(best_index)
            .cloned()
            .ok_or(EvolutionError::EmptyPopulation)?;

        Ok(EvolutionResult {
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                best_fitness: best.fitness,
                elapsed_seconds: elapsed,
                stop_reason,
            },
            best,
            population,
            history: self.history.clone(),
        })
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<EvolutionResult, EvolutionError> {
        self.run_with_callback(|_| {})
    }

    /// Detailed reports for the current population, in population order.
    fn report_population(&self) -> Result<Vec<CandidateReport>, EvolutionError> {
        let evaluator = &self.evaluator;
        let report = |ind: &Individual| -> Result<CandidateReport, SimulationError> {
            Ok(evaluator
                .evaluate_detailed(&ind.genome, false)?
                .into_report(ind.genome.clone()))
        };

        let reports = if self.config.evaluation.parallel {
            self.population
                .individuals()
                .par_iter()
                .map(report)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            self.population
                .iter()
                .map(report)
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(reports)
    }
}

/// Evaluate individuals in place, on the rayon pool when `parallel` is set.
///
/// Evaluation draws no randomness, so the result does not depend on
/// scheduling.
fn evaluate_individuals<A: SimulationAdapter>(
    evaluator: &FitnessEvaluator<A>,
    individuals: &mut [Individual],
    parallel: bool,
) -> Result<(), SimulationError> {
    let evaluate_one = |ind: &mut Individual| -> Result<(), SimulationError> {
        ind.fitness = evaluator.evaluate(&ind.genome)?;
        Ok(())
    };

    if parallel {
        individuals.par_iter_mut().try_for_each(evaluate_one)
    } else {
        individuals.iter_mut().try_for_each(evaluate_one)
    }
}
