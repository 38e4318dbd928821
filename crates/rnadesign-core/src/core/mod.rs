//! # Core Module
//!
//! Stateless building blocks shared by the design engine.
//!
//! ## Architecture
//!
//! - **Data Model** ([`models`]) - RNA bases, sequences, dot-bracket structures and
//!   conservation profiles
//! - **Structure Prediction** ([`oracle`]) - The folding-oracle contract, its exact-key
//!   memoization cache, and a ViennaRNA command-line adapter
//! - **Metrics** ([`utils`]) - Hamming distance, longest common substring, GC content,
//!   homopolymer detection and pairwise distance matrices
//! - **File I/O** ([`io`]) - FASTA, CSV report and profile store formats
//!
//! Nothing in this layer holds state across calls except the oracle cache, whose
//! lifetime is owned by the caller.

pub mod io;
pub mod models;
pub mod oracle;
pub mod utils;
