use super::metrics::{hamming_distance, longest_common_substring};
use crate::core::models::Sequence;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    Hamming,
    Lmax,
}

impl DistanceMetric {
    fn apply(self, a: &Sequence, b: &Sequence) -> usize {
        match self {
            DistanceMetric::Hamming => hamming_distance(a, b),
            DistanceMetric::Lmax => longest_common_substring(a, b),
        }
    }
}

/// Symmetric n×n matrix over a fixed list of sequences.
///
/// Built once per list; there is no incremental update. The diagonal is always zero,
/// including for the Lmax metric where it would otherwise be the sequence length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceMatrix {
    size: usize,
    data: Vec<usize>,
}

impl DistanceMatrix {
    pub fn build(sequences: &[Sequence], metric: DistanceMetric) -> Self {
        let n = sequences.len();
        let row = |i: usize| -> Vec<usize> {
            (0..n)
                .map(|j| {
                    if i < j {
                        metric.apply(&sequences[i], &sequences[j])
                    } else {
                        0
                    }
                })
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let upper: Vec<Vec<usize>> = (0..n).map(row).collect();

        #[cfg(feature = "parallel")]
        let upper: Vec<Vec<usize>> = (0..n).into_par_iter().map(row).collect();

        let mut data = vec![0; n * n];
        for (i, values) in upper.into_iter().enumerate() {
            for (j, value) in values.into_iter().enumerate().skip(i + 1) {
                data[i * n + j] = value;
                data[j * n + i] = value;
            }
        }
        Self { size: n, data }
    }

    pub fn hamming(sequences: &[Sequence]) -> Self {
        Self::build(sequences, DistanceMetric::Hamming)
    }

    pub fn lmax(sequences: &[Sequence]) -> Self {
        Self::build(sequences, DistanceMetric::Lmax)
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> usize {
        self.data[i * self.size + j]
    }

    pub fn row(&self, i: usize) -> &[usize] {
        &self.data[i * self.size..(i + 1) * self.size]
    }

    pub fn row_sum(&self, i: usize) -> usize {
        self.row(i).iter().sum()
    }

    pub fn row_max(&self, i: usize) -> usize {
        self.row(i).iter().copied().max().unwrap_or(0)
    }
}
