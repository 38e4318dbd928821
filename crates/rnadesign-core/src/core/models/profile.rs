use super::sequence::{Base, Sequence};
use serde::{Deserialize, Serialize};

/// Raw trial counts for the three substitutions at one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteCounts {
    pub alternatives: [Base; 3],
    pub attempts: [u32; 3],
    pub accepts: [u32; 3],
}

impl SiteCounts {
    pub fn empty(reference_base: Base) -> Self {
        Self {
            alternatives: reference_base.alternatives(),
            attempts: [0; 3],
            accepts: [0; 3],
        }
    }

    /// accepted / attempted for each alternative, 0 where nothing was attempted.
    pub fn tolerance(&self) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (i, slot) in out.iter_mut().enumerate() {
            if self.attempts[i] > 0 {
                *slot = f64::from(self.accepts[i]) / f64::from(self.attempts[i]);
            }
        }
        out
    }

    /// `1 - mean(tolerance)`, always within `[0, 1]`.
    pub fn conservation(&self) -> f64 {
        let tolerance = self.tolerance();
        let mean = tolerance.iter().sum::<f64>() / tolerance.len() as f64;
        (1.0 - mean).clamp(0.0, 1.0)
    }
}

/// Per-position mutation tolerance of one reference sequence.
///
/// A score of 1 means no substitution was tolerated; 0 means every substitution was
/// tolerated in every trial. The profile is only meaningful for the exact `reference`
/// it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConservationProfile {
    pub reference: Sequence,
    pub scores: Vec<f64>,
    pub sites: Vec<SiteCounts>,
}

impl ConservationProfile {
    pub fn from_sites(reference: Sequence, sites: Vec<SiteCounts>) -> Self {
        let scores = sites.iter().map(SiteCounts::conservation).collect();
        Self {
            reference,
            scores,
            sites,
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn score(&self, position: usize) -> Option<f64> {
        self.scores.get(position).copied()
    }

    pub fn tolerance_matrix(&self) -> Vec<[f64; 3]> {
        self.sites.iter().map(SiteCounts::tolerance).collect()
    }

    pub fn matches(&self, reference: &Sequence) -> bool {
        &self.reference == reference
    }
}
