//! Character n-gram vectorisation and seeded k-means.

use crate::core::models::{Base, Sequence};
use rand::Rng;
use tracing::{debug, instrument};

pub const MAX_NGRAM: usize = 3;
pub const MAX_KMEANS_ITERATIONS: usize = 300;

fn base_index(base: Base) -> usize {
    match base {
        Base::A => 0,
        Base::C => 1,
        Base::G => 2,
        Base::U => 3,
    }
}

/// Dimension of the 1..=`max_n` k-mer count space over the 4-letter alphabet.
pub fn ngram_dimension(max_n: usize) -> usize {
    (1..=max_n).map(|k| 4usize.pow(k as u32)).sum()
}

/// Counts every k-mer for k in 1..=`max_n`. Dimensions are fixed by the alphabet,
/// so vectors of different sequences are directly comparable.
pub fn ngram_vector(sequence: &Sequence, max_n: usize) -> Vec<f64> {
    let mut vector = vec![0.0; ngram_dimension(max_n)];
    let bases = sequence.bases();
    let mut offset = 0;
    for k in 1..=max_n {
        for window in bases.windows(k) {
            let code = window.iter().fold(0, |acc, &b| acc * 4 + base_index(b));
            vector[offset + code] += 1.0;
        }
        offset += 4usize.pow(k as u32);
    }
    vector
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeans {
    pub centroids: Vec<Vec<f64>>,
    pub assignments: Vec<usize>,
    pub iterations: usize,
}

impl KMeans {
    /// Member closest to each non-empty cluster's centroid, in cluster-id order.
    pub fn representatives(&self, points: &[Vec<f64>]) -> Vec<usize> {
        let mut best: Vec<Option<(usize, f64)>> = vec![None; self.centroids.len()];
        for (i, &cluster) in self.assignments.iter().enumerate() {
            let d = squared_distance(&points[i], &self.centroids[cluster]);
            match best[cluster] {
                Some((_, current)) if current <= d => {}
                _ => best[cluster] = Some((i, d)),
            }
        }
        best.into_iter().flatten().map(|(i, _)| i).collect()
    }
}

fn plus_plus_init(points: &[Vec<f64>], k: usize, rng: &mut impl Rng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())].clone());
    while centroids.len() < k {
        let d2: Vec<f64> = points.iter().map(|p| nearest(p, &centroids).1).collect();
        let total: f64 = d2.iter().sum();
        let next = if total > 0.0 {
            let mut roll = rng.gen_range(0.0..total);
            let mut pick = d2.len() - 1;
            for (i, d) in d2.iter().enumerate() {
                if roll < *d {
                    pick = i;
                    break;
                }
                roll -= d;
            }
            pick
        } else {
            rng.gen_range(0..points.len())
        };
        centroids.push(points[next].clone());
    }
    centroids
}

/// Partitions `points` into `k` clusters with k-means++ seeding and Lloyd iterations.
///
/// Iterates until assignments stop changing or [`MAX_KMEANS_ITERATIONS`] is reached. A
/// cluster that loses all members keeps its previous centroid.
#[instrument(level = "debug", skip_all, fields(points = points.len(), k))]
pub fn kmeans(points: &[Vec<f64>], k: usize, rng: &mut impl Rng) -> KMeans {
    if points.is_empty() || k == 0 {
        return KMeans {
            centroids: Vec::new(),
            assignments: vec![0; points.len()],
            iterations: 0,
        };
    }
    let k = k.min(points.len());
    let mut centroids = plus_plus_init(points, k, rng);
    let mut assignments: Vec<usize> = points.iter().map(|p| nearest(p, &centroids).0).collect();
    let dim = points[0].len();

    let mut iterations = 0;
    while iterations < MAX_KMEANS_ITERATIONS {
        iterations += 1;

        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (point, &cluster) in points.iter().zip(&assignments) {
            counts[cluster] += 1;
            for (s, x) in sums[cluster].iter_mut().zip(point) {
                *s += x;
            }
        }
        for (c, sum) in sums.into_iter().enumerate() {
            if counts[c] > 0 {
                centroids[c] = sum.into_iter().map(|s| s / counts[c] as f64).collect();
            }
        }

        let next: Vec<usize> = points.iter().map(|p| nearest(p, &centroids).0).collect();
        if next == assignments {
            break;
        }
        assignments = next;
    }

    debug!(iterations, "k-means finished.");
    KMeans {
        centroids,
        assignments,
        iterations,
    }
}
