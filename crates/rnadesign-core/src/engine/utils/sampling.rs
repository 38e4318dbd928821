use crate::core::models::{Base, ConservationProfile};
use crate::engine::config::MutationStrategy;
use rand::{distributions::WeightedIndex, prelude::*};
use thiserror::Error;
use tracing::instrument;

/// Bounds applied to per-position tolerance before it is mixed into sampling weights.
const MIN_TOLERANCE_WEIGHT: f64 = 0.1;
const MAX_TOLERANCE_WEIGHT: f64 = 1.0;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Weight list is empty, cannot perform sampling")]
    EmptyWeights,
    #[error("All weights are zero, cannot perform sampling")]
    ZeroTotalWeight,
    #[error("Failed to create weighted distribution: {source}")]
    DistributionError {
        #[from]
        source: rand::distributions::WeightedError,
    },
}

/// Normalised probability of choosing each position for mutation.
///
/// `weight(p) = bias·clamp(1 − conservation(p), 0.1, 1) + (1 − bias)`, renormalised to
/// sum to 1. Without a profile matching `length`, the weights are uniform.
pub fn position_weights(
    length: usize,
    profile: Option<&ConservationProfile>,
    bias: f64,
) -> Vec<f64> {
    if length == 0 {
        return Vec::new();
    }
    let raw: Vec<f64> = match profile.filter(|p| p.len() == length) {
        Some(profile) => profile
            .scores
            .iter()
            .map(|score| {
                let tolerance = (1.0 - score).clamp(MIN_TOLERANCE_WEIGHT, MAX_TOLERANCE_WEIGHT);
                bias * tolerance + (1.0 - bias)
            })
            .collect(),
        None => vec![1.0; length],
    };
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// Draws `count` distinct indices, each proportional to its weight among those remaining.
///
/// Asking for more indices than there are positive weights returns every positive index.
#[instrument(level = "trace", skip_all, fields(count))]
pub fn sample_distinct_weighted(
    weights: &[f64],
    count: usize,
    rng: &mut impl Rng,
) -> Result<Vec<usize>, SamplingError> {
    if weights.is_empty() {
        return Err(SamplingError::EmptyWeights);
    }
    let mut remaining = weights.to_vec();
    let available = remaining.iter().filter(|w| **w > 0.0).count();
    if available == 0 {
        return Err(SamplingError::ZeroTotalWeight);
    }

    let mut chosen = Vec::with_capacity(count.min(available));
    for _ in 0..count.min(available) {
        let dist = WeightedIndex::new(&remaining)?;
        let index = dist.sample(rng);
        remaining[index] = 0.0;
        chosen.push(index);
    }
    Ok(chosen)
}

/// Upper bound on substitutions per trial for a target of `length` bases.
pub fn max_mutations(length: usize) -> usize {
    if length == 0 {
        return 0;
    }
    let cap = if length <= 30 { length / 3 } else { length / 4 };
    cap.max(1)
}

/// Number of positions one mutation trial will change.
pub fn mutation_count(
    strategy: MutationStrategy,
    fixed_count: usize,
    weights: &[f64; 3],
    length: usize,
    rng: &mut impl Rng,
) -> usize {
    let requested = match strategy {
        MutationStrategy::Fixed => fixed_count,
        MutationStrategy::Random => match WeightedIndex::new(weights) {
            Ok(dist) => dist.sample(rng) + 1,
            Err(_) => 1,
        },
    };
    requested.clamp(1, max_mutations(length).max(1)).min(length)
}

/// Picks a replacement for `current`, preferring G/C when `current` is A or U.
pub fn substitute_base(current: Base, rng: &mut impl Rng) -> Base {
    let alternatives = current.alternatives();
    let weights: [u32; 3] = if current.is_strong() {
        [1, 1, 1]
    } else {
        alternatives.map(|b| if b.is_strong() { 2 } else { 1 })
    };
    let total: u32 = weights.iter().sum();
    let mut roll = rng.gen_range(0..total);
    for (base, weight) in alternatives.iter().zip(weights) {
        if roll < weight {
            return *base;
        }
        roll -= weight;
    }
    alternatives[2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Sequence, SiteCounts};
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn weights_are_uniform_without_profile() {
        let w = position_weights(4, None, 0.7);
        assert_eq!(w, vec![0.25; 4]);
    }

    #[test]
    fn weights_favour_tolerant_positions() {
        let reference: Sequence = "ACG".parse().unwrap();
        let mut profile = ConservationProfile::from_sites(
            reference.clone(),
            reference.bases().iter().map(|&b| SiteCounts::empty(b)).collect(),
        );
        profile.scores = vec![0.0, 1.0, 0.5];
        let w = position_weights(3, Some(&profile), 1.0);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(w[0] > w[2] && w[2] > w[1]);
        assert!(w[1] > 0.0);
    }

    #[test]
    fn mismatched_profile_is_ignored() {
        let reference: Sequence = "AC".parse().unwrap();
        let profile = ConservationProfile::from_sites(
            reference.clone(),
            reference.bases().iter().map(|&b| SiteCounts::empty(b)).collect(),
        );
        assert_eq!(position_weights(4, Some(&profile), 1.0), vec![0.25; 4]);
    }

    #[test]
    fn distinct_sampling_never_repeats() {
        let mut rng = rng();
        for _ in 0..50 {
            let picked = sample_distinct_weighted(&[0.1, 0.2, 0.3, 0.4], 3, &mut rng).unwrap();
            let mut sorted = picked.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), 3);
        }
    }

    #[test]
    fn distinct_sampling_skips_zero_weights() {
        let picked = sample_distinct_weighted(&[0.0, 1.0, 0.0], 3, &mut rng()).unwrap();
        assert_eq!(picked, vec![1]);
        assert!(matches!(
            sample_distinct_weighted(&[], 1, &mut rng()),
            Err(SamplingError::EmptyWeights)
        ));
    }

    #[test]
    fn mutation_count_is_capped_by_length() {
        assert_eq!(max_mutations(28), 9);
        assert_eq!(max_mutations(40), 10);
        assert_eq!(max_mutations(2), 1);
        let mut rng = rng();
        assert_eq!(
            mutation_count(MutationStrategy::Fixed, 20, &[1.0, 1.0, 1.0], 28, &mut rng),
            9
        );
        for _ in 0..20 {
            let n = mutation_count(MutationStrategy::Random, 20, &[70.0, 25.0, 5.0], 28, &mut rng);
            assert!((1..=3).contains(&n));
        }
    }

    #[test]
    fn substitution_always_changes_base_and_prefers_gc() {
        let mut rng = rng();
        let mut strong = 0;
        for _ in 0..1000 {
            let b = substitute_base(Base::A, &mut rng);
            assert_ne!(b, Base::A);
            if b.is_strong() {
                strong += 1;
            }
        }
        assert!(strong > 700, "expected ~80% G/C, got {strong}/1000");
        for _ in 0..100 {
            assert_ne!(substitute_base(Base::G, &mut rng), Base::G);
        }
    }
}
