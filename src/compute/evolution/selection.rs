//! Tournament selection and mutation of the selected pool.

use super::genome::GenomeRng;
use super::population::{Individual, Population};

/// Run one tournament: sample `size` distinct members and return the fittest.
///
/// Ties go to the contestant drawn first. Returns `None` only for an empty
/// population.
pub fn tournament<'a>(
    population: &'a Population,
    size: usize,
    rng: &mut GenomeRng,
) -> Option<&'a Individual> {
    let contestants = rng.sample_indices(population.len(), size.max(1));
    let mut winner: Option<&Individual> = None;
    for index in contestants {
        let Some(candidate) = population.get(index) else {
            continue;
        };
        match winner {
            Some(w) if w.fitness >= candidate.fitness => {}
            _ => winner = Some(candidate),
        }
    }
    winner
}

/// Fill a pool the size of `population` by repeated tournaments.
pub fn tournament_select(
    population: &Population,
    size: usize,
    rng: &mut GenomeRng,
) -> Vec<Individual> {
    (0..population.len())
        .filter_map(|_| tournament(population, size, rng).cloned())
        .collect()
}

/// Mutate every selected individual into an unevaluated child.
pub fn mutate_selected(
    selected: &[Individual],
    rate: f64,
    scale: f64,
    rng: &mut GenomeRng,
) -> Population {
    Population::from_individuals(
        selected
            .iter()
            .map(|parent| Individual::new(rng.mutate(&parent.genome, rate, scale)))
            .collect(),
    )
}
