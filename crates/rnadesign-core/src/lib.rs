//! # rnadesign
//!
//! A library for designing short RNA scaffold variants that fold into a prescribed
//! secondary structure, satisfy composition constraints, and stay maximally dissimilar
//! from each other and from a reference sequence.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Sequence`, `Structure`,
//!   `ConservationProfile`), pure distance metrics, the folding-oracle contract with its
//!   memoizing cache, and output formats.
//!
//! - **[`engine`]: The Logic Core.** Configuration, the scatter/gather task pool, sampling
//!   and clustering utilities, and the individual pipeline tasks: conservation profiling,
//!   candidate generation, variant filtering, diverse selection and diversity analysis.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures tying `engine` and `core`
//!   together: multi-run scaffold design and standalone conservation profiling.
//!
//! Every stochastic step takes an explicit random generator, so a run is reproducible
//! given its seed up to the oracle's own nondeterminism.

pub mod core;
pub mod engine;
pub mod workflows;
