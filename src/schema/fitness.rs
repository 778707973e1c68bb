//! Constrained fitness value and objective breakdown types.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Ranking value of an individual: feasibility first, then objective.
///
/// `feasibility` is 0 for valid designs and negative (by the size of the
/// violation) otherwise. `objective` only carries meaning when feasible.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fitness {
    pub feasibility: f64,
    pub objective: f64,
}

impl Fitness {
    /// Fitness of an individual that has not been evaluated yet.
    /// Sorts below every real fitness.
    pub const UNEVALUATED: Fitness = Fitness {
        feasibility: f64::NEG_INFINITY,
        objective: f64::NEG_INFINITY,
    };

    pub const fn new(feasibility: f64, objective: f64) -> Self {
        Self {
            feasibility,
            objective,
        }
    }

    /// Feasible design with the given objective.
    pub const fn feasible(objective: f64) -> Self {
        Self::new(0.0, objective)
    }

    /// Structurally invalid design; `margin` is the (negative) violation.
    pub const fn infeasible(margin: f64) -> Self {
        Self::new(margin, 0.0)
    }

    pub fn is_feasible(&self) -> bool {
        self.feasibility >= 0.0
    }

    pub fn is_evaluated(&self) -> bool {
        self.feasibility != f64::NEG_INFINITY
    }
}

impl Default for Fitness {
    fn default() -> Self {
        Self::UNEVALUATED
    }
}

/// Total order on fitness values: compare feasibility, break ties on
/// objective.
pub fn compare_fitness(a: &Fitness, b: &Fitness) -> Ordering {
    a.feasibility
        .total_cmp(&b.feasibility)
        .then_with(|| a.objective.total_cmp(&b.objective))
}

impl PartialEq for Fitness {
    fn eq(&self, other: &Self) -> bool {
        compare_fitness(self, other) == Ordering::Equal
    }
}

impl Eq for Fitness {}

impl PartialOrd for Fitness {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fitness {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_fitness(self, other)
    }
}

/// Weighted contribution of each objective term.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectiveTerms {
    pub final_distance: f64,
    pub final_speed: f64,
    pub wall_avoidance: f64,
    pub wheel_size: f64,
    pub time_at_rest: f64,
}

impl ObjectiveTerms {
    pub fn total(&self) -> f64 {
        self.final_distance + self.final_speed + self.wall_avoidance + self.wheel_size
            + self.time_at_rest
    }
}

/// Raw measurements behind a feasible objective value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectiveBreakdown {
    /// Signed offset of the final chassis position from the target.
    pub final_distance: f64,
    /// Final commanded wheel angular velocity.
    pub final_speed: f64,
    /// Whether the wall contact flag was ever raised.
    pub hit_wall: bool,
    /// Decoded wheel radius.
    pub wheel_radius: f64,
    /// Index of the first sample of the final settled run (or the trace
    /// length when there is none).
    pub index_at_rest: usize,
    /// Number of samples in the trace.
    pub sample_count: usize,
    /// Weighted term values.
    pub terms: ObjectiveTerms,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feasible_beats_infeasible() {
        let feasible = Fitness::feasible(-100.0);
        let infeasible = Fitness::infeasible(-0.001);
        assert!(feasible > infeasible);
    }

    #[test]
    fn test_objective_breaks_ties() {
        assert!(Fitness::feasible(2.0) > Fitness::feasible(1.0));
        assert!(Fitness::infeasible(-0.5) > Fitness::infeasible(-1.0));
    }

    #[test]
    fn test_unevaluated_sorts_lowest() {
        let mut values = vec![
            Fitness::feasible(0.5),
            Fitness::UNEVALUATED,
            Fitness::infeasible(-1e9),
        ];
        values.sort();
        assert!(!values[0].is_evaluated());
        assert_eq!(values[2], Fitness::feasible(0.5));
    }

    #[test]
    fn test_comparator_is_explicit_lexicographic() {
        let a = Fitness::new(0.0, 1.0);
        let b = Fitness::new(-0.1, 5.0);
        assert_eq!(compare_fitness(&a, &b), Ordering::Greater);
        assert_eq!(compare_fitness(&a, &a), Ordering::Equal);
    }
}
