//! Utility functions for the engine module.
//!
//! Sampling helpers for mutation position and base selection, and the n-gram k-means
//! clustering used by diverse subset selection.

pub mod clustering;
pub mod sampling;
