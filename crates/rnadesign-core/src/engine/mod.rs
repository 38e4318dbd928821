//! # Engine Module
//!
//! The stateful logic of the design pipeline, built on the [`core`](crate::core) layer.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Typed parameters and the validating builder
//! - **Execution** ([`pool`], [`context`]) - Scatter/gather task pool with sequential
//!   fallback, and the collaborators shared by every task
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-level error types
//! - **Tasks** ([`tasks`]) - Conservation profiling, candidate generation, variant
//!   filtering, diverse selection and diversity analysis
//! - **Utilities** ([`utils`]) - Weighted sampling and n-gram k-means clustering

pub mod config;
pub mod context;
pub mod error;
pub mod pool;
pub mod progress;
pub mod tasks;
pub mod utils;
