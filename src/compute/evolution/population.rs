//! Population container: initialization, statistics and elitist replacement.

use crate::schema::{Fitness, Genome, PopulationStatistics};

use super::genome::GenomeRng;

/// One member of the population.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    pub genome: Genome,
    /// [`Fitness::UNEVALUATED`] until evaluated.
    pub fitness: Fitness,
}

impl Individual {
    pub fn new(genome: Genome) -> Self {
        Self {
            genome,
            fitness: Fitness::UNEVALUATED,
        }
    }

    pub fn with_fitness(genome: Genome, fitness: Fitness) -> Self {
        Self { genome, fitness }
    }
}

/// Ordered collection of individuals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    /// `size` random unevaluated individuals with `genome_len` genes each.
    pub fn initialize(size: usize, genome_len: usize, rng: &mut GenomeRng) -> Self {
        let individuals = (0..size)
            .map(|_| Individual::new(rng.random_genome(genome_len)))
            .collect();
        Self { individuals }
    }

    pub fn from_individuals(individuals: Vec<Individual>) -> Self {
        Self { individuals }
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn individuals_mut(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    pub fn iter(&self) -> impl Iterator<Item = &Individual> {
        self.individuals.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Individual> {
        self.individuals.get(index)
    }

    /// Overwrite the genome at `index`, marking it unevaluated.
    /// Returns false if the index is out of bounds.
    pub fn replace(&mut self, index: usize, genome: Genome) -> bool {
        match self.individuals.get_mut(index) {
            Some(slot) => {
                *slot = Individual::new(genome);
                true
            }
            None => false,
        }
    }

    /// Index of the first individual holding the maximal fitness.
    pub fn best_index(&self) -> Option<usize> {
        self.individuals
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, &Individual)>, (i, ind)| match best {
                Some((_, b)) if b.fitness >= ind.fitness => best,
                _ => Some((i, ind)),
            })
            .map(|(i, _)| i)
    }

    /// First individual holding the maximal fitness.
    pub fn best(&self) -> Option<&Individual> {
        self.best_index().and_then(|i| self.individuals.get(i))
    }

    /// First individual holding the minimal fitness.
    pub fn worst(&self) -> Option<&Individual> {
        self.individuals.iter().fold(None, |worst, ind| match worst {
            Some(w) if w.fitness <= ind.fitness => Some(w),
            _ => Some(ind),
        })
    }

    /// Worst, componentwise mean and best fitness.
    ///
    /// An empty population reports [`Fitness::UNEVALUATED`] throughout.
    pub fn statistics(&self) -> PopulationStatistics {
        let (Some(worst), Some(best)) = (self.worst(), self.best()) else {
            return PopulationStatistics {
                worst: Fitness::UNEVALUATED,
                average: Fitness::UNEVALUATED,
                best: Fitness::UNEVALUATED,
            };
        };

        let n = self.len() as f64;
        let (feasibility, objective) = self.iter().fold((0.0, 0.0), |(f, o), ind| {
            (f + ind.fitness.feasibility, o + ind.fitness.objective)
        });

        PopulationStatistics {
            worst: worst.fitness,
            average: Fitness::new(feasibility / n, objective / n),
            best: best.fitness,
        }
    }

    /// Elitist replacement: the best parent in slot 0 followed by the first
    /// `parents.len() - 1` children. Population size is preserved.
    pub fn combine(parents: &Population, children: Population) -> Population {
        let Some(elite) = parents.best() else {
            return children;
        };

        let mut individuals = Vec::with_capacity(parents.len());
        individuals.push(elite.clone());
        individuals.extend(
            children
                .individuals
                .into_iter()
                .take(parents.len().saturating_sub(1)),
        );
        Population { individuals }
    }
}
