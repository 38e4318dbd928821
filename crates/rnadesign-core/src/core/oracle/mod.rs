//! # Folding Oracle
//!
//! The structure prediction and inverse folding engine is an external collaborator. This
//! module fixes the contract every other component relies on, and provides:
//!
//! - [`cache`]: an exact-key memoization layer ([`OracleCache`], [`CachedOracle`]) whose
//!   lifecycle is owned by the caller rather than hidden in process-wide state.
//! - [`vienna`]: an adapter driving the ViennaRNA command-line programs.
//!
//! Oracle calls are synchronous and potentially slow. Results are deterministic per call
//! but are not guaranteed to be reproducible across process runs.

pub mod cache;
pub mod vienna;

#[cfg(test)]
pub(crate) mod testing;

use crate::core::models::{Sequence, SequenceError, Structure, StructureError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub use cache::{CacheError, CacheStats, CachedOracle, OracleCache};
pub use vienna::ViennaOracle;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Failed to launch '{program}': {source}", program = program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}", program = program.display())]
    ExitStatus {
        program: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Unexpected output from '{program}': {message}", program = program.display())]
    Parse { program: PathBuf, message: String },

    #[error("Oracle returned an invalid sequence: {0}")]
    InvalidSequence(#[from] SequenceError),

    #[error("Oracle returned an invalid structure: {0}")]
    InvalidStructure(#[from] StructureError),

    #[error("Inverse folding did not converge (residual distance {distance})")]
    NotConverged { distance: usize },

    #[error("Oracle rejected input: {0}")]
    Rejected(String),
}

/// Minimum free energy prediction for one sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub structure: Structure,
    pub mfe: f64,
}

/// Partition-function metrics of one sequence relative to a target structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureConfidence {
    /// Equilibrium probability of the exact target structure.
    pub probability: f64,
    /// Mean base-pair distance over the structure ensemble.
    pub diversity: f64,
}

pub trait FoldingOracle: Send + Sync {
    fn fold(&self, sequence: &Sequence) -> Result<FoldResult, OracleError>;

    /// Attempts to find a sequence folding into `target`, starting from `seed`.
    ///
    /// Failure to converge is reported as an error; callers retry with a fresh seed.
    fn inverse_fold(&self, target: &Structure, seed: &Sequence) -> Result<Sequence, OracleError>;

    fn structure_confidence(
        &self,
        sequence: &Sequence,
        target: &Structure,
    ) -> Result<StructureConfidence, OracleError>;
}

impl<O: FoldingOracle + ?Sized> FoldingOracle for &O {
    fn fold(&self, sequence: &Sequence) -> Result<FoldResult, OracleError> {
        (**self).fold(sequence)
    }

    fn inverse_fold(&self, target: &Structure, seed: &Sequence) -> Result<Sequence, OracleError> {
        (**self).inverse_fold(target, seed)
    }

    fn structure_confidence(
        &self,
        sequence: &Sequence,
        target: &Structure,
    ) -> Result<StructureConfidence, OracleError> {
        (**self).structure_confidence(sequence, target)
    }
}
