//! Constrained fitness evaluation for robot designs.
//!
//! A genome is decoded, checked against the structural constraint, and only
//! then simulated. Infeasible designs never reach the simulator.

use crate::compute::{SimulationAdapter, SimulationError, TrialTrace};
use crate::schema::{
    CandidateReport, EvolutionConfig, Fitness, Genome, ObjectiveBreakdown, ObjectiveConfig,
    ObjectiveTerms, ParameterSpec, RobotParameters, SimulationSettings,
};

/// Evaluates a genome and returns its constrained fitness.
pub struct FitnessEvaluator<A> {
    adapter: A,
    parameters: ParameterSpec,
    simulation: SimulationSettings,
    objective: ObjectiveConfig,
}

/// Everything learned from one evaluation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub parameters: RobotParameters,
    pub fitness: Fitness,
    /// Present only for feasible designs.
    pub breakdown: Option<ObjectiveBreakdown>,
    /// Present only when recording was requested and the design was simulated.
    pub trace: Option<TrialTrace>,
}

impl Evaluation {
    pub fn into_report(self, genome: Genome) -> CandidateReport {
        CandidateReport {
            genome,
            parameters: self.parameters,
            fitness: self.fitness,
            breakdown: self.breakdown,
        }
    }
}

impl<A: SimulationAdapter> FitnessEvaluator<A> {
    /// Create a new fitness evaluator.
    pub fn new(
        adapter: A,
        parameters: ParameterSpec,
        simulation: SimulationSettings,
        objective: ObjectiveConfig,
    ) -> Self {
        Self {
            adapter,
            parameters,
            simulation,
            objective,
        }
    }

    /// Evaluator using the codec, trial and objective settings of a run.
    pub fn from_config(adapter: A, config: &EvolutionConfig) -> Self {
        Self::new(
            adapter,
            config.parameters.clone(),
            config.simulation.clone(),
            config.objective.clone(),
        )
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn parameter_spec(&self) -> &ParameterSpec {
        &self.parameters
    }

    /// Fitness of a genome.
    pub fn evaluate(&self, genome: &Genome) -> Result<Fitness, SimulationError> {
        Ok(self.evaluate_detailed(genome, false)?.fitness)
    }

    /// Fitness of a genome together with its decoded values, objective
    /// breakdown and (when `record` is set) the playback trace.
    pub fn evaluate_detailed(
        &self,
        genome: &Genome,
        record: bool,
    ) -> Result<Evaluation, SimulationError> {
        let parameters = self.parameters.decode(genome);

        let overlap = parameters.wheel_overlap();
        if overlap < 0.0 {
            return Ok(Evaluation {
                parameters,
                fitness: Fitness::infeasible(overlap),
                breakdown: None,
                trace: None,
            });
        }

        let trace = self
            .adapter
            .run_trial(&parameters, &self.simulation, record)?;
        let breakdown = score_trace(
            &trace,
            genome,
            &parameters,
            &self.parameters,
            &self.objective,
        )?;

        Ok(Evaluation {
            parameters,
            fitness: Fitness::feasible(breakdown.terms.total()),
            breakdown: Some(breakdown),
            trace: record.then_some(trace),
        })
    }
}

/// Score a trial trace of a feasible design.
pub fn score_trace(
    trace: &TrialTrace,
    genome: &Genome,
    parameters: &RobotParameters,
    spec: &ParameterSpec,
    objective: &ObjectiveConfig,
) -> Result<ObjectiveBreakdown, SimulationError> {
    let last = trace.final_sample().ok_or(SimulationError::EmptyTrace)?;
    let weights = &objective.weights;

    let final_distance = last.chassis_x - objective.target_location;
    let final_speed = last.angular_velocity;
    let hit_wall = trace.any_contact();
    let speeds: Vec<f64> = trace.speeds().collect();
    let sample_count = speeds.len();
    let index_at_rest = index_at_rest(&speeds, objective.speed_tolerance);

    let speed_limit = spec.speed_max.high.abs();
    // A zero speed range earns no credit.
    let speed_score = if speed_limit > 0.0 {
        1.0 - final_speed.abs() / speed_limit
    } else {
        0.0
    };

    let terms = ObjectiveTerms {
        final_distance: weights.final_distance
            * (1.0 - final_distance.abs() / objective.initial_target_distance),
        final_speed: weights.final_speed * speed_score,
        wall_avoidance: weights.wall_avoidance * if hit_wall { 0.0 } else { 1.0 },
        wheel_size: weights.wheel_size * (1.0 - genome.gene(0)),
        time_at_rest: weights.time_at_rest * (1.0 - index_at_rest as f64 / sample_count as f64),
    };

    Ok(ObjectiveBreakdown {
        final_distance,
        final_speed,
        hit_wall,
        wheel_radius: parameters.wheel_radius,
        index_at_rest,
        sample_count,
        terms,
    })
}

/// Start index of the trailing run of settled speeds.
///
/// A sample is settled when `|speed| < tolerance`. If the trace ends settled
/// after having been unsettled somewhere, the index of the first sample of
/// the final settled run is returned. Otherwise (never unsettled, or not
/// settled at the end) the trace length is returned.
pub fn index_at_rest(speeds: &[f64], tolerance: f64) -> usize {
    let n = speeds.len();
    let settled_tail = speeds
        .iter()
        .rev()
        .take_while(|s| s.abs() < tolerance)
        .count();

    if settled_tail == 0 || settled_tail == n {
        n
    } else {
        n - settled_tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{RoverSimulator, TrialSample};
    use crate::schema::ParameterRange;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed trace and counts how often it was asked for one.
    struct FixedTrace {
        samples: Vec<TrialSample>,
        calls: AtomicUsize,
    }

    impl FixedTrace {
        fn new(samples: Vec<TrialSample>) -> Self {
            Self {
                samples,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SimulationAdapter for FixedTrace {
        fn run_trial(
            &self,
            _params: &RobotParameters,
            _settings: &SimulationSettings,
            _record: bool,
        ) -> Result<TrialTrace, SimulationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TrialTrace {
                samples: self.samples.clone(),
                frames: Vec::new(),
            })
        }
    }

    fn sample(chassis_x: f64, angular_velocity: f64, wall_contact: bool) -> TrialSample {
        TrialSample {
            time: 0.0,
            sensor_distance: 0.0,
            angular_velocity,
            wall_contact,
            chassis_x,
        }
    }

    fn evaluator(adapter: FixedTrace) -> FitnessEvaluator<FixedTrace> {
        FitnessEvaluator::new(
            adapter,
            ParameterSpec::default(),
            SimulationSettings::default(),
            ObjectiveConfig::default(),
        )
    }

    #[test]
    fn test_index_at_rest_trailing_run() {
        assert_eq!(index_at_rest(&[1.0, 0.5, 0.01, 0.0], 0.05), 2);
    }

    #[test]
    fn test_index_at_rest_never_settles() {
        assert_eq!(index_at_rest(&[1.0, 0.01, 1.0], 0.05), 3);
    }

    #[test]
    fn test_index_at_rest_always_settled() {
        assert_eq!(index_at_rest(&[0.0, 0.0, 0.0], 0.05), 3);
    }

    #[test]
    fn test_infeasible_design_skips_simulation() {
        let eval = evaluator(FixedTrace::new(vec![sample(20.0, 0.0, false)]));
        // wheel_radius = 1.5, chassis_length = 1.0 -> overlap = 0.5 - 1.5 = -1.0
        let mut genes = vec![0.5; 8];
        genes[0] = 1.0;
        genes[1] = 0.0;

        let fitness = eval.evaluate(&Genome::new(genes)).unwrap();
        assert!((fitness.feasibility + 1.0).abs() < 1e-12);
        assert_eq!(fitness.objective, 0.0);
        assert_eq!(eval.adapter().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_perfect_trial_scores_terms() {
        // Ends on target, stopped, never touched the wall, after moving.
        let samples = vec![
            sample(3.0, 3.0, false),
            sample(10.0, 1.0, false),
            sample(20.0, 0.0, false),
            sample(20.0, 0.0, false),
        ];
        let eval = evaluator(FixedTrace::new(samples));
        let mut genes = vec![0.5; 8];
        genes[0] = 0.0;
        genes[1] = 1.0;

        let detailed = eval.evaluate_detailed(&Genome::new(genes), false).unwrap();
        let breakdown = detailed.breakdown.unwrap();
        assert_eq!(breakdown.index_at_rest, 2);
        assert!(!breakdown.hit_wall);
        assert!((breakdown.terms.final_distance - 2.0).abs() < 1e-12);
        assert!((breakdown.terms.final_speed - 1.0).abs() < 1e-12);
        assert!((breakdown.terms.wall_avoidance - 0.5).abs() < 1e-12);
        assert!((breakdown.terms.wheel_size - 0.25).abs() < 1e-12);
        assert!((breakdown.terms.time_at_rest - 0.125).abs() < 1e-12);
        assert!((detailed.fitness.objective - 3.875).abs() < 1e-12);
        assert!(detailed.fitness.is_feasible());
        assert!(detailed.trace.is_none());
    }

    #[test]
    fn test_zero_speed_range_earns_no_speed_credit() {
        let trace = TrialTrace {
            samples: vec![sample(3.0, 1.0, false), sample(20.0, 0.0, false)],
            frames: Vec::new(),
        };
        let mut spec = ParameterSpec::default();
        spec.speed_max = ParameterRange::new(0.0, 0.0);
        let genome = Genome::new(vec![0.5; spec.len()]);
        let parameters = spec.decode(&genome);

        let breakdown = score_trace(
            &trace,
            &genome,
            &parameters,
            &spec,
            &ObjectiveConfig::default(),
        )
        .unwrap();
        assert_eq!(breakdown.terms.final_speed, 0.0);
        assert!(breakdown.terms.final_distance > 0.0);
    }

    #[test]
    fn test_wall_contact_drops_term() {
        let eval = evaluator(FixedTrace::new(vec![
            sample(20.0, 1.0, true),
            sample(20.0, 1.0, false),
        ]));
        let breakdown = eval
            .evaluate_detailed(&Genome::new(vec![0.2, 0.9, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5]), false)
            .unwrap()
            .breakdown
            .unwrap();
        assert!(breakdown.hit_wall);
        assert_eq!(breakdown.terms.wall_avoidance, 0.0);
    }

    #[test]
    fn test_empty_trace_is_error() {
        let eval = evaluator(FixedTrace::new(Vec::new()));
        let genome = Genome::new(vec![0.2, 0.9, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5]);
        assert!(matches!(
            eval.evaluate(&genome),
            Err(SimulationError::EmptyTrace)
        ));
    }

    #[test]
    fn test_recorded_evaluation_keeps_trace() {
        let config = EvolutionConfig {
            simulation: SimulationSettings {
                duration: 2.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let eval = FitnessEvaluator::from_config(RoverSimulator::default(), &config);
        let genome = config.parameters.encode(&config.baseline);

        let detailed = eval.evaluate_detailed(&genome, true).unwrap();
        assert!(detailed.fitness.is_feasible());
        let trace = detailed.trace.unwrap();
        assert_eq!(trace.len(), config.simulation.sample_count());
        assert!(!trace.frames.is_empty());
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let config = EvolutionConfig {
            simulation: SimulationSettings {
                duration: 3.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let eval = FitnessEvaluator::from_config(RoverSimulator::default(), &config);
        let genome = config.parameters.encode(&config.baseline);
        assert_eq!(eval.evaluate(&genome).unwrap(), eval.evaluate(&genome).unwrap());
    }
}
