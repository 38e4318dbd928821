//! Deterministic oracles for unit tests.

use super::{FoldResult, FoldingOracle, OracleError, StructureConfidence};
use crate::core::models::{Sequence, Structure};
use crate::core::utils::metrics::gc_content;
use std::sync::atomic::{AtomicUsize, Ordering};

type Predicate = Box<dyn Fn(&Sequence) -> bool + Send + Sync>;
type Confidence = Box<dyn Fn(&Sequence) -> StructureConfidence + Send + Sync>;

/// Folds every accepted sequence into `target` and everything else into an open chain.
///
/// MFE is derived from GC content so that ranking by energy is observable. Inverse
/// folding echoes the seed back unless configured to fail.
pub(crate) struct MockOracle {
    target: Structure,
    folds_to_target: Predicate,
    confidence: Confidence,
    constant_mfe: Option<f64>,
    inverse_fails: bool,
    fold_calls: AtomicUsize,
    inverse_calls: AtomicUsize,
}

impl MockOracle {
    pub fn always(target: Structure) -> Self {
        Self {
            target,
            folds_to_target: Box::new(|_| true),
            confidence: Box::new(|_| StructureConfidence {
                probability: 0.9,
                diversity: 2.0,
            }),
            constant_mfe: None,
            inverse_fails: false,
            fold_calls: AtomicUsize::new(0),
            inverse_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_fold_predicate(
        mut self,
        predicate: impl Fn(&Sequence) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.folds_to_target = Box::new(predicate);
        self
    }

    pub fn with_confidence(
        mut self,
        confidence: impl Fn(&Sequence) -> StructureConfidence + Send + Sync + 'static,
    ) -> Self {
        self.confidence = Box::new(confidence);
        self
    }

    pub fn with_constant_mfe(mut self, mfe: f64) -> Self {
        self.constant_mfe = Some(mfe);
        self
    }

    pub fn with_failing_inverse(mut self) -> Self {
        self.inverse_fails = true;
        self
    }

    pub fn fold_calls(&self) -> usize {
        self.fold_calls.load(Ordering::SeqCst)
    }

    pub fn inverse_calls(&self) -> usize {
        self.inverse_calls.load(Ordering::SeqCst)
    }
}

impl FoldingOracle for MockOracle {
    fn fold(&self, sequence: &Sequence) -> Result<FoldResult, OracleError> {
        self.fold_calls.fetch_add(1, Ordering::SeqCst);
        let structure = if sequence.len() == self.target.len() && (self.folds_to_target)(sequence)
        {
            self.target.clone()
        } else {
            ".".repeat(sequence.len()).parse()?
        };
        let mfe = self
            .constant_mfe
            .unwrap_or_else(|| -gc_content(sequence) / 10.0);
        Ok(FoldResult { structure, mfe })
    }

    fn inverse_fold(&self, _target: &Structure, seed: &Sequence) -> Result<Sequence, OracleError> {
        self.inverse_calls.fetch_add(1, Ordering::SeqCst);
        if self.inverse_fails {
            return Err(OracleError::NotConverged { distance: 3 });
        }
        Ok(seed.clone())
    }

    fn structure_confidence(
        &self,
        sequence: &Sequence,
        _target: &Structure,
    ) -> Result<StructureConfidence, OracleError> {
        Ok((self.confidence)(sequence))
    }
}

/// Every call fails, as if the folding engine were unavailable.
pub(crate) struct BrokenOracle;

impl FoldingOracle for BrokenOracle {
    fn fold(&self, _sequence: &Sequence) -> Result<FoldResult, OracleError> {
        Err(OracleError::Rejected("engine offline".to_string()))
    }

    fn inverse_fold(&self, _target: &Structure, _seed: &Sequence) -> Result<Sequence, OracleError> {
        Err(OracleError::Rejected("engine offline".to_string()))
    }

    fn structure_confidence(
        &self,
        _sequence: &Sequence,
        _target: &Structure,
    ) -> Result<StructureConfidence, OracleError> {
        Err(OracleError::Rejected("engine offline".to_string()))
    }
}
