use crate::core::models::{Group, Sequence};
use crate::core::utils::matrix::DistanceMatrix;
use crate::core::utils::metrics::hamming_distance;
use crate::engine::utils::clustering::{MAX_NGRAM, kmeans, ngram_vector};
use rand::Rng;
use tracing::{debug, info, instrument, warn};

/// Index of the largest value, ties going to the lowest index.
fn first_argmax(values: impl IntoIterator<Item = usize>) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, v) in values.into_iter().enumerate() {
        if best.is_none_or(|(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

/// Greedy max-min expansion: repeatedly moves the available index whose minimum
/// distance to `selected` is largest, until `size` is reached or `available` is empty.
fn grow(matrix: &DistanceMatrix, selected: &mut Vec<usize>, available: &mut Vec<usize>, size: usize) {
    while selected.len() < size && !available.is_empty() {
        let scores = available.iter().map(|&candidate| {
            selected
                .iter()
                .map(|&s| matrix.get(candidate, s))
                .min()
                .unwrap_or(usize::MAX)
        });
        let Some(position) = first_argmax(scores) else {
            break;
        };
        selected.push(available.remove(position));
    }
}

/// Farthest-point selection over a precomputed matrix.
///
/// Seeds with the index whose total distance to all others is maximal.
pub fn farthest_point_indices(matrix: &DistanceMatrix, n: usize) -> Vec<usize> {
    let size = matrix.len();
    if n == 0 || size == 0 {
        return Vec::new();
    }
    let Some(seed) = first_argmax((0..size).map(|i| matrix.row_sum(i))) else {
        return Vec::new();
    };
    let mut selected = vec![seed];
    let mut available: Vec<usize> = (0..size).filter(|&i| i != seed).collect();
    grow(matrix, &mut selected, &mut available, n);
    selected
}

/// Picks up to `n` mutually dissimilar sequences from `pool`.
///
/// Pools smaller than `cluster_threshold` use farthest-point selection and return
/// exactly `min(n, |pool|)` sequences. Larger pools are clustered on 1-3-mer counts and
/// the member nearest each centroid is returned, which may yield fewer than `n`.
#[instrument(skip_all, name = "selection_task", fields(pool = pool.len(), n))]
pub fn select_diverse_subset(
    pool: &[Sequence],
    n: usize,
    cluster_threshold: usize,
    rng: &mut impl Rng,
) -> Vec<Sequence> {
    if n == 0 {
        return Vec::new();
    }
    if pool.len() <= n {
        return pool.to_vec();
    }

    let indices = if pool.len() < cluster_threshold {
        let matrix = DistanceMatrix::hamming(pool);
        farthest_point_indices(&matrix, n)
    } else {
        let vectors: Vec<Vec<f64>> = pool.iter().map(|s| ngram_vector(s, MAX_NGRAM)).collect();
        let clusters = kmeans(&vectors, n, rng);
        let representatives = clusters.representatives(&vectors);
        if representatives.len() < n {
            debug!(
                requested = n,
                representatives = representatives.len(),
                "Some clusters were empty."
            );
        }
        representatives
    };

    info!(selected = indices.len(), "Diverse subset selected.");
    indices.into_iter().map(|i| pool[i].clone()).collect()
}

/// Partitions part of `pool` into up to `group_count` disjoint groups of at most
/// `group_size` members, each grown by greedy max-min expansion.
///
/// The first group is seeded with the sequence farthest from `reference`; later groups
/// start from a uniformly random remaining sequence.
#[instrument(skip_all, name = "grouping_task", fields(pool = pool.len(), group_size, group_count))]
pub fn form_groups(
    pool: &[Sequence],
    group_size: usize,
    group_count: usize,
    reference: &Sequence,
    rng: &mut impl Rng,
) -> Vec<Group> {
    if group_size == 0 || group_count == 0 || pool.is_empty() {
        return Vec::new();
    }

    let matrix = DistanceMatrix::hamming(pool);
    let mut available: Vec<usize> = (0..pool.len()).collect();
    let mut groups: Vec<Group> = Vec::with_capacity(group_count);

    while groups.len() < group_count && !available.is_empty() {
        let seed_position = if groups.is_empty() {
            first_argmax(available.iter().map(|&i| hamming_distance(&pool[i], reference)))
                .unwrap_or(0)
        } else {
            rng.gen_range(0..available.len())
        };
        let mut selected = vec![available.remove(seed_position)];
        grow(&matrix, &mut selected, &mut available, group_size);
        groups.push(selected.into_iter().map(|i| pool[i].clone()).collect());
    }

    if groups.len() < group_count {
        warn!(
            requested = group_count,
            formed = groups.len(),
            "Variant pool exhausted before all groups were formed."
        );
    }
    if groups.last().is_some_and(|g| g.len() < group_size) {
        warn!(group_size, "Last group is smaller than requested.");
    }
    info!(groups = groups.len(), "Diverse groups formed.");
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn seqs(items: &[&str]) -> Vec<Sequence> {
        items.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(5)
    }

    fn random_pool(size: usize, length: usize, seed: u64) -> Vec<Sequence> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut seen = HashSet::new();
        let mut pool = Vec::new();
        while pool.len() < size {
            let s = Sequence::random(length, &mut rng);
            if seen.insert(s.clone()) {
                pool.push(s);
            }
        }
        pool
    }

    #[test]
    fn empty_pool_or_zero_request_gives_empty() {
        assert!(select_diverse_subset(&[], 5, 100, &mut rng()).is_empty());
        assert!(select_diverse_subset(&seqs(&["ACGU"]), 0, 100, &mut rng()).is_empty());
    }

    #[test]
    fn small_pool_is_returned_unchanged() {
        let pool = seqs(&["AAAA", "CCCC", "GGGG"]);
        assert_eq!(select_diverse_subset(&pool, 5, 100, &mut rng()), pool);
    }

    #[test]
    fn farthest_point_seeds_with_largest_total_distance() {
        let pool = seqs(&["AAAA", "AAAU", "UUUU", "AAUU"]);
        let picked = select_diverse_subset(&pool, 2, 100, &mut rng());
        assert_eq!(picked, seqs(&["UUUU", "AAAA"]));
    }

    #[test]
    fn farthest_point_returns_exactly_n_distinct() {
        let pool = random_pool(40, 12, 1);
        let picked = select_diverse_subset(&pool, 15, 100, &mut rng());
        assert_eq!(picked.len(), 15);
        assert_eq!(picked.iter().collect::<HashSet<_>>().len(), 15);
    }

    #[test]
    fn farthest_point_ties_go_to_lowest_index() {
        let matrix = DistanceMatrix::hamming(&seqs(&["AC", "CA", "GU", "UG"]));
        assert_eq!(farthest_point_indices(&matrix, 1), vec![0]);
    }

    #[test]
    fn clustering_path_returns_at_most_n_from_pool() {
        let pool = random_pool(60, 16, 2);
        let picked = select_diverse_subset(&pool, 8, 50, &mut rng());
        assert!(!picked.is_empty());
        assert!(picked.len() <= 8);
        let members: HashSet<_> = pool.iter().collect();
        assert!(picked.iter().all(|s| members.contains(s)));
        assert_eq!(picked.iter().collect::<HashSet<_>>().len(), picked.len());
    }

    #[test]
    fn groups_are_disjoint_and_bounded() {
        let pool = random_pool(30, 12, 3);
        let reference: Sequence = "ACGUACGUACGU".parse().unwrap();
        let groups = form_groups(&pool, 4, 5, &reference, &mut rng());
        assert_eq!(groups.len(), 5);
        let mut seen = HashSet::new();
        for group in &groups {
            assert!(group.len() <= 4);
            for s in group {
                assert!(seen.insert(s.clone()), "sequence appears in two groups");
            }
        }
        assert!(seen.len() <= 20);
    }

    #[test]
    fn first_group_starts_farthest_from_reference() {
        let pool = seqs(&["AAAA", "UUUU", "AAAU"]);
        let reference: Sequence = "AAAA".parse().unwrap();
        let groups = form_groups(&pool, 2, 1, &reference, &mut rng());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0][0].to_string(), "UUUU");
        assert_eq!(groups[0][1].to_string(), "AAAA");
    }

    #[test]
    fn grouping_stops_when_pool_is_exhausted() {
        let pool = seqs(&["AAAA", "CCCC", "GGGG", "UUUU", "ACGU"]);
        let reference: Sequence = "AAAA".parse().unwrap();
        let groups = form_groups(&pool, 2, 4, &reference, &mut rng());
        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn zero_size_or_count_gives_no_groups() {
        let pool = seqs(&["AAAA", "CCCC"]);
        let reference: Sequence = "AAAA".parse().unwrap();
        assert!(form_groups(&pool, 0, 2, &reference, &mut rng()).is_empty());
        assert!(form_groups(&pool, 2, 0, &reference, &mut rng()).is_empty());
    }
}
