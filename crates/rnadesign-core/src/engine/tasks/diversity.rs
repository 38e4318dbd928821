use crate::core::models::{Group, Sequence};
use crate::core::utils::metrics::{hamming_distance, longest_common_substring};
use itertools::Itertools;
use serde::Serialize;
use tracing::info;

/// Mean pairwise Hamming distance within and across groups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupDiversity {
    pub intra_group_mean: f64,
    pub inter_group_mean: f64,
}

/// Shared-substring statistics of a grouped variant set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LmaxAnalysis {
    pub intra_group_mean: f64,
    pub inter_group_mean: f64,
    /// For each variant of the flattened groups, its largest Lmax against any other.
    pub per_variant_max: Vec<usize>,
}

fn mean(values: impl Iterator<Item = usize>) -> f64 {
    let (sum, count) = values.fold((0usize, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum as f64 / count as f64 }
}

fn intra_pairs(groups: &[Group]) -> impl Iterator<Item = (&Sequence, &Sequence)> {
    groups
        .iter()
        .flat_map(|group| group.iter().tuple_combinations::<(_, _)>())
}

fn inter_pairs(groups: &[Group]) -> impl Iterator<Item = (&Sequence, &Sequence)> {
    groups
        .iter()
        .tuple_combinations::<(_, _)>()
        .flat_map(|(a, b)| a.iter().cartesian_product(b.iter()))
}

pub fn group_diversity(groups: &[Group]) -> GroupDiversity {
    let result = GroupDiversity {
        intra_group_mean: mean(intra_pairs(groups).map(|(a, b)| hamming_distance(a, b))),
        inter_group_mean: mean(inter_pairs(groups).map(|(a, b)| hamming_distance(a, b))),
    };
    info!(
        intra = result.intra_group_mean,
        inter = result.inter_group_mean,
        "Group Hamming diversity."
    );
    result
}

pub fn lmax_analysis(groups: &[Group]) -> LmaxAnalysis {
    let flat: Vec<&Sequence> = groups.iter().flatten().collect();
    let per_variant_max = (0..flat.len())
        .map(|i| {
            (0..flat.len())
                .filter(|&j| j != i)
                .map(|j| longest_common_substring(flat[i], flat[j]))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let result = LmaxAnalysis {
        intra_group_mean: mean(intra_pairs(groups).map(|(a, b)| longest_common_substring(a, b))),
        inter_group_mean: mean(inter_pairs(groups).map(|(a, b)| longest_common_substring(a, b))),
        per_variant_max,
    };
    info!(
        intra = result.intra_group_mean,
        inter = result.inter_group_mean,
        "Group Lmax statistics."
    );
    result
}
