//! Evolution configuration, progress and result types.
//!
//! These types describe one optimization run: how the population is sized
//! and varied, how each robot design is simulated and scored, and what the
//! run reports back.

use serde::{Deserialize, Serialize};

use super::{
    ConfigError, Fitness, Genome, ObjectiveBreakdown, ObjectiveConfig, PARAMETER_COUNT,
    PARAMETER_NAMES, ParameterSpec, RobotParameters, SimulationSettings,
};

/// Top-level configuration for an evolutionary run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Selection and mutation settings.
    #[serde(default)]
    pub algorithm: GeneticAlgorithmConfig,
    /// Evaluation settings.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Parameter ranges defining the genome decoding.
    #[serde(default)]
    pub parameters: ParameterSpec,
    /// Known-good design seeded into slot 0 of the initial population.
    #[serde(default)]
    pub baseline: RobotParameters,
    /// Trial settings shared by every evaluation.
    #[serde(default)]
    pub simulation: SimulationSettings,
    /// Objective geometry and weights.
    #[serde(default)]
    pub objective: ObjectiveConfig,
    /// Random seed; fixing it makes the whole run reproducible.
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            algorithm: GeneticAlgorithmConfig::default(),
            evaluation: EvaluationConfig::default(),
            parameters: ParameterSpec::default(),
            baseline: RobotParameters::default(),
            simulation: SimulationSettings::default(),
            objective: ObjectiveConfig::default(),
            random_seed: default_random_seed(),
        }
    }
}

fn default_random_seed() -> u64 {
    47
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in the population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Generation budget.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Stop after this many consecutive generations without improvement.
    #[serde(default = "default_stagnation_limit")]
    pub stagnation_limit: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            stagnation_limit: default_stagnation_limit(),
        }
    }
}

fn default_population_size() -> usize {
    100
}
fn default_max_generations() -> usize {
    100
}
fn default_stagnation_limit() -> usize {
    100
}

/// Tournament selection and Gaussian mutation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticAlgorithmConfig {
    /// Individuals sampled per tournament.
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// Per-gene mutation probability. Defaults to `1 / genome length`.
    #[serde(default)]
    pub mutation_rate: Option<f64>,
    /// Standard deviation of the Gaussian gene perturbation.
    #[serde(default = "default_mutation_scale")]
    pub mutation_scale: f64,
}

impl Default for GeneticAlgorithmConfig {
    fn default() -> Self {
        Self {
            tournament_size: default_tournament_size(),
            mutation_rate: None,
            mutation_scale: default_mutation_scale(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}
fn default_mutation_scale() -> f64 {
    0.08
}

impl GeneticAlgorithmConfig {
    /// Effective per-gene mutation probability for a genome of `genome_len`.
    pub fn effective_mutation_rate(&self, genome_len: usize) -> f64 {
        self.mutation_rate
            .unwrap_or_else(|| 1.0 / genome_len.max(1) as f64)
    }
}

/// Evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Evaluate individuals of a generation on the rayon thread pool.
    /// Off by default; results are identical either way.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
        }
    }
}

fn default_parallel() -> bool {
    false
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Worst, average and best fitness of one population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationStatistics {
    pub worst: Fitness,
    /// Componentwise mean; descriptive only.
    pub average: Fitness,
    pub best: Fitness,
}

/// One row of the per-generation statistics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub worst: Fitness,
    pub average: Fitness,
    pub best: Fitness,
    /// Best fitness seen in the run up to and including this generation.
    pub best_ever: Fitness,
}

/// Per-generation statistics for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionHistory {
    pub generations: Vec<GenerationStats>,
}

impl EvolutionHistory {
    pub fn push(&mut self, stats: GenerationStats) {
        self.generations.push(stats);
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn last(&self) -> Option<&GenerationStats> {
        self.generations.last()
    }
}

/// Progress update emitted once per recorded generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Generation just recorded (0 = initial population).
    pub generation: usize,
    /// Generation budget.
    pub total_generations: usize,
    /// Statistics of the current population.
    pub statistics: PopulationStatistics,
    /// Best fitness seen so far.
    pub best_fitness: Fitness,
    /// Generations since the best fitness last improved.
    pub stagnation_count: usize,
    /// Evaluations performed so far.
    pub evaluations: u64,
    /// Current engine phase.
    pub phase: EvolutionPhase,
}

/// Phase of the evolution loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EvolutionPhase {
    #[default]
    Initializing,
    Evaluating,
    Selecting,
    Mutating,
    Combining,
    Recording,
    Stopped,
}

/// Report of one individual: genes, decoded values and scoring details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateReport {
    pub genome: Genome,
    pub parameters: RobotParameters,
    pub fitness: Fitness,
    /// Present only for feasible designs.
    pub breakdown: Option<ObjectiveBreakdown>,
}

/// Final result of an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Best individual of the final population.
    pub best: CandidateReport,
    /// Every individual of the final population.
    pub population: Vec<CandidateReport>,
    /// Per-generation statistics.
    pub history: EvolutionHistory,
    /// Run summary.
    pub stats: EvolutionStats,
}

/// Summary statistics of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations run after the initial population.
    pub generations: usize,
    /// Fitness evaluations performed (feasible or not).
    pub total_evaluations: u64,
    /// Best fitness achieved.
    pub best_fitness: Fitness,
    /// Wall-clock time in seconds.
    pub elapsed_seconds: f64,
    /// Reason the run stopped.
    pub stop_reason: StopReason,
}

/// Reason evolution stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Generation budget exhausted.
    MaxGenerations,
    /// Best fitness did not improve for the stagnation limit.
    Stagnation,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 2 (got {0})")]
    PopulationTooSmall(usize),
    #[error("Tournament size must be between 1 and the population size {population} (got {tournament})")]
    InvalidTournamentSize { tournament: usize, population: usize },
    #[error("Mutation rate must lie in [0, 1] (got {0})")]
    InvalidMutationRate(f64),
    #[error("Mutation scale must be finite and non-negative (got {0})")]
    InvalidMutationScale(f64),
    #[error("Parameter spec must define at least one parameter")]
    EmptyParameterSpec,
    #[error("Invalid range for {name}: [{low}, {high}]")]
    InvalidRange { name: String, low: f64, high: f64 },
    #[error("Baseline {name} = {value} lies outside [{low}, {high}]")]
    BaselineOutOfRange {
        name: String,
        value: f64,
        low: f64,
        high: f64,
    },
    #[error("Simulation/objective config invalid: {0}")]
    Config(#[from] ConfigError),
}

impl EvolutionConfig {
    /// Validate the run configuration before any simulation work starts.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.simulation.validate()?;
        self.objective.validate()?;

        if self.parameters.is_empty() {
            return Err(EvolutionConfigError::EmptyParameterSpec);
        }

        let size = self.population.size;
        if size < 2 {
            return Err(EvolutionConfigError::PopulationTooSmall(size));
        }

        let tournament = self.algorithm.tournament_size;
        if tournament == 0 || tournament > size {
            return Err(EvolutionConfigError::InvalidTournamentSize {
                tournament,
                population: size,
            });
        }

        let rate = self.algorithm.effective_mutation_rate(self.parameters.len());
        if !(0.0..=1.0).contains(&rate) {
            return Err(EvolutionConfigError::InvalidMutationRate(rate));
        }

        let scale = self.algorithm.mutation_scale;
        if !(scale.is_finite() && scale >= 0.0) {
            return Err(EvolutionConfigError::InvalidMutationScale(scale));
        }

        let ranges = self.parameters.ranges();
        let baseline = self.baseline.to_array();
        for i in 0..PARAMETER_COUNT {
            let range = ranges[i];
            let name = PARAMETER_NAMES[i].to_string();
            if !range.is_valid() {
                return Err(EvolutionConfigError::InvalidRange {
                    name,
                    low: range.low,
                    high: range.high,
                });
            }
            if !range.contains(baseline[i]) {
                return Err(EvolutionConfigError::BaselineOutOfRange {
                    name,
                    value: baseline[i],
                    low: range.low,
                    high: range.high,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParameterRange;

    #[test]
    fn test_default_config_valid() {
        let config = EvolutionConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_mutation_rate_is_inverse_length() {
        let config = GeneticAlgorithmConfig::default();
        assert!((config.effective_mutation_rate(8) - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_small_population() {
        let mut config = EvolutionConfig::default();
        config.population.size = 1;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::PopulationTooSmall(1))
        ));
    }

    #[test]
    fn test_rejects_oversized_tournament() {
        let mut config = EvolutionConfig::default();
        config.population.size = 4;
        config.algorithm.tournament_size = 5;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::InvalidTournamentSize { .. })
        ));
    }

    #[test]
    fn test_rejects_inverted_range() {
        let mut config = EvolutionConfig::default();
        config.parameters.sensor_limit = ParameterRange::new(15.0, 1.0);
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_rejects_baseline_outside_range() {
        let mut config = EvolutionConfig::default();
        config.baseline.speed_intercept = -25.0;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::BaselineOutOfRange { .. })
        ));
    }

    #[test]
    fn test_serialization() {
        let config = EvolutionConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EvolutionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.population.size, config.population.size);
        assert_eq!(parsed.parameters, config.parameters);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let parsed: EvolutionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.random_seed, 47);
        assert_eq!(parsed.algorithm.tournament_size, 3);
        assert!(parsed.validate().is_ok());
    }
}
