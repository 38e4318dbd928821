//! # Workflows Module
//!
//! Top-level entry points of the library. Each workflow builds its task pool, threads
//! an explicit seeded random generator through every stochastic step, reports phase
//! progress, and returns plain in-memory results for the caller to render or persist.
//!
//! - **Scaffold Design** ([`design`]) - multi-run generation, filtering, diverse
//!   selection and grouping
//! - **Conservation Profiling** ([`profile`]) - per-position mutation tolerance of the
//!   reference, with an optional on-disk profile store

pub mod design;
pub mod profile;
