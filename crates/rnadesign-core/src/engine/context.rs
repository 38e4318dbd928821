use super::pool::TaskPool;
use super::progress::ProgressReporter;
use crate::core::models::{Sequence, Structure};
use crate::core::oracle::FoldingOracle;

/// The reference sequence together with its oracle-predicted fold.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignTarget {
    pub reference: Sequence,
    pub structure: Structure,
    pub mfe: f64,
}

impl DesignTarget {
    pub fn len(&self) -> usize {
        self.reference.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }
}

/// Shared, read-only collaborators handed to every task.
pub struct TaskContext<'a, O: FoldingOracle + ?Sized> {
    pub oracle: &'a O,
    pub pool: &'a TaskPool,
    pub reporter: &'a ProgressReporter<'a>,
}

impl<'a, O: FoldingOracle + ?Sized> TaskContext<'a, O> {
    pub fn new(oracle: &'a O, pool: &'a TaskPool, reporter: &'a ProgressReporter<'a>) -> Self {
        Self {
            oracle,
            pool,
            reporter,
        }
    }
}

impl<O: FoldingOracle + ?Sized> Clone for TaskContext<'_, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O: FoldingOracle + ?Sized> Copy for TaskContext<'_, O> {}
