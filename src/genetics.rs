//! Evolutionary optimization over network genomes.
//!
//! Genomes of networks with the same topology line up value for value, so
//! they can be recombined and perturbed without knowing anything about the
//! layers behind them.

use crate::error::{Error, Result};
use crate::genome::Genome;
use crate::network::Network;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};

/// Parameters of `Network::mutate_with`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Probability that each genome value is perturbed.
    pub mutation_rate: f64,
    /// Largest perturbation applied to a mutated value.
    pub mutation_magnitude: f64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        EvolutionConfig {
            mutation_rate: 0.05,
            mutation_magnitude: 1.5,
        }
    }
}

/// Uniform crossover: each value of the offspring is taken from either
/// parent with equal probability.
pub fn crossover<R: Rng + ?Sized>(a: &[f64], b: &[f64], rng: &mut R) -> Result<Genome> {
    if a.len() != b.len() {
        return Err(Error::GenomeMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a
        .iter()
        .zip(b)
        .map(|(&x, &y)| if rng.gen_bool(0.5) { x } else { y })
        .collect())
}

/// Perturbs each value with probability `rate` by a uniform amount in
/// `[-magnitude, magnitude)`. Values that are not selected pass through
/// unchanged.
///
/// The genome is returned untouched unless `rate` is positive and
/// `magnitude` is positive with a finite range `2 * magnitude`.
pub fn mutate<R: Rng + ?Sized>(mut genome: Genome, rate: f64, magnitude: f64, rng: &mut R) -> Genome {
    if !(rate > 0.0 && magnitude > 0.0 && (2.0 * magnitude).is_finite()) {
        return genome;
    }
    for value in &mut genome {
        if rng.gen::<f64>() < rate {
            *value += rng.gen_range(-magnitude..magnitude);
        }
    }
    genome
}

impl Network {
    /// Breeds a new generation of `size` networks from `winners` using the
    /// default `EvolutionConfig`.
    pub fn mutate(winners: &[Network], size: usize) -> Result<Vec<Network>> {
        Network::mutate_with(winners, size, &EvolutionConfig::default(), &mut rand::thread_rng())
    }

    /// Breeds a new generation of `size` networks from `winners`.
    ///
    /// Each offspring picks two parents uniformly at random (possibly the
    /// same one twice), crosses and mutates their genomes, and installs the
    /// result in a copy of the first parent. The winners are left untouched.
    pub fn mutate_with<R: Rng + ?Sized>(
        winners: &[Network],
        size: usize,
        config: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<Vec<Network>> {
        if winners.is_empty() {
            return Err(Error::EmptyPopulation);
        }
        debug!(
            "Breeding {} networks from {} winners",
            size,
            winners.len()
        );
        let mut generation = Vec::with_capacity(size);
        for _ in 0..size {
            let (first, second) = match (winners.choose(rng), winners.choose(rng)) {
                (Some(first), Some(second)) => (first, second),
                _ => return Err(Error::EmptyPopulation),
            };
            let genome = mutate(
                crossover(&first.get_genome(), &second.get_genome(), rng)?,
                config.mutation_rate,
                config.mutation_magnitude,
                rng,
            );
            let mut offspring = first.get_copy()?;
            offspring.set_genome(&genome)?;
            generation.push(offspring);
        }
        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn crossover_of_identical_genomes_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let genome = vec![0.5, -1.0, 2.0, 3.5];
        assert_eq!(crossover(&genome, &genome, &mut rng).unwrap(), genome);
    }

    #[test]
    fn crossover_takes_each_value_from_a_parent() {
        let mut rng = StdRng::seed_from_u64(2);
        let a = vec![0.0; 64];
        let b = vec![1.0; 64];
        let child = crossover(&a, &b, &mut rng).unwrap();
        assert!(child.iter().all(|&v| v == 0.0 || v == 1.0));
        assert!(child.contains(&0.0));
        assert!(child.contains(&1.0));
    }

    #[test]
    fn crossover_rejects_mismatched_lengths() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            crossover(&[1.0], &[1.0, 2.0], &mut rng),
            Err(Error::GenomeMismatch { left: 1, right: 2 })
        ));
    }

    #[test]
    fn mutate_respects_rate_and_magnitude() {
        let mut rng = StdRng::seed_from_u64(4);
        let genome: Genome = (0..100).map(|v| v as f64).collect();

        assert_eq!(mutate(genome.clone(), 0.0, 1.5, &mut rng), genome);

        let mutated = mutate(genome.clone(), 1.0, 1.5, &mut rng);
        for (before, after) in genome.iter().zip(&mutated) {
            assert_ne!(before, after);
            assert!((before - after).abs() <= 1.5);
        }

        assert_eq!(mutate(genome.clone(), 1.0, 0.0, &mut rng), genome);
    }

    #[test]
    fn mutate_passes_through_unusable_settings() {
        let mut rng = StdRng::seed_from_u64(5);
        let genome = vec![1.0, 2.0];
        for &magnitude in &[f64::NAN, f64::INFINITY, f64::NEG_INFINITY, f64::MAX, -1.0] {
            assert_eq!(mutate(genome.clone(), 1.0, magnitude, &mut rng), genome);
        }
        for &rate in &[f64::NAN, -0.5] {
            assert_eq!(mutate(genome.clone(), rate, 1.5, &mut rng), genome);
        }
    }

    #[test]
    fn breeding_with_a_non_finite_magnitude_copies_parents() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut network = Network::default();
        network.add_input_layer(2).unwrap();
        network
            .add_fully_connected_layer(1, crate::activator::Activator::Sigmoid, true)
            .unwrap();
        let config = EvolutionConfig {
            mutation_rate: 1.0,
            mutation_magnitude: f64::NAN,
        };
        let winners = vec![network];
        for offspring in Network::mutate_with(&winners, 3, &config, &mut rng).unwrap() {
            assert_eq!(offspring.get_genome(), winners[0].get_genome());
        }
    }

    #[test]
    fn empty_population_is_an_error() {
        assert!(matches!(
            Network::mutate(&[], 3),
            Err(Error::EmptyPopulation)
        ));
    }
}
