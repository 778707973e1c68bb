//! Genome manipulation utilities for evolutionary search.
//!
//! Provides random generation and mutation operations. All randomness in a
//! run flows through one [`GenomeRng`], so a fixed seed reproduces the run.

use rand::prelude::*;
use rand::seq::index;

use crate::schema::Genome;

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate a uniform random genome in `[0, 1]^len`.
    pub fn random_genome(&mut self, len: usize) -> Genome {
        Genome::new((0..len).map(|_| self.rng.r#gen::<f64>()).collect())
    }

    /// Pick the gene indices to perturb.
    ///
    /// Each index is included with probability `rate`; if none is, exactly
    /// one uniformly chosen index is forced in.
    pub fn mutation_indices(&mut self, len: usize, rate: f64) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..len)
            .filter(|_| self.rng.r#gen::<f64>() < rate)
            .collect();
        if indices.is_empty() && len > 0 {
            indices.push(self.rng.gen_range(0..len));
        }
        indices
    }

    /// Gaussian mutation: add zero-mean noise and clamp back into `[0, 1]`.
    pub fn gaussian_mutate(&mut self, gene: f64, scale: f64) -> f64 {
        let noise: f64 = self.rng.sample(rand_distr::StandardNormal);
        (gene + noise * scale).clamp(0.0, 1.0)
    }

    /// Produce a mutated copy of `genome`.
    pub fn mutate(&mut self, genome: &Genome, rate: f64, scale: f64) -> Genome {
        let indices = self.mutation_indices(genome.len(), rate);
        let mut child = genome.clone();
        for i in indices {
            let gene = child.genes()[i];
            child.genes_mut()[i] = self.gaussian_mutate(gene, scale);
        }
        child
    }

    /// Sample `amount` distinct indices from `0..len`, in draw order.
    pub fn sample_indices(&mut self, len: usize, amount: usize) -> Vec<usize> {
        index::sample(&mut self.rng, len, amount.min(len)).into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_random_genome() {
        let mut rng = GenomeRng::new(42);
        let genome = rng.random_genome(8);
        assert_eq!(genome.len(), 8);
        assert!(genome.is_normalized());
    }

    #[test]
    fn test_same_seed_same_genomes() {
        let mut a = GenomeRng::new(7);
        let mut b = GenomeRng::new(7);
        assert_eq!(a.random_genome(8), b.random_genome(8));
        let parent = Genome::new(vec![0.5; 8]);
        assert_eq!(a.mutate(&parent, 0.2, 0.08), b.mutate(&parent, 0.2, 0.08));
    }

    #[test]
    fn test_zero_rate_mutates_exactly_one_gene() {
        let mut rng = GenomeRng::new(42);
        let parent = Genome::new(vec![0.5; 8]);

        for _ in 0..50 {
            let child = rng.mutate(&parent, 0.0, 0.08);
            let changed = parent
                .genes()
                .iter()
                .zip(child.genes())
                .filter(|(a, b)| a != b)
                .count();
            assert_eq!(changed, 1);
        }
    }

    #[test]
    fn test_full_rate_selects_every_index() {
        let mut rng = GenomeRng::new(3);
        assert_eq!(rng.mutation_indices(5, 1.0), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_sample_indices_distinct() {
        let mut rng = GenomeRng::new(11);
        let mut picked = rng.sample_indices(10, 4);
        assert_eq!(picked.len(), 4);
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), 4);
        assert!(picked.iter().all(|&i| i < 10));
    }

    proptest! {
        #[test]
        fn prop_mutation_stays_normalized(
            seed in any::<u64>(),
            genes in proptest::collection::vec(0.0f64..=1.0, 1..16),
            rate in 0.0f64..=1.0,
            scale in 0.0f64..2.0,
        ) {
            let mut rng = GenomeRng::new(seed);
            let child = rng.mutate(&Genome::new(genes.clone()), rate, scale);
            prop_assert_eq!(child.len(), genes.len());
            prop_assert!(child.is_normalized());
        }
    }
}
