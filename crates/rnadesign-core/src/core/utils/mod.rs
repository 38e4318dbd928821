//! Pure distance and composition functions reused by every higher component.

pub mod matrix;
pub mod metrics;
