//! Tasks making up the design pipeline.
//!
//! Each task is a pure function of its inputs plus oracle calls. Parallel work is
//! dispatched through the shared [`TaskPool`](crate::engine::pool::TaskPool) and
//! gathered back in input order.

pub mod conservation;
pub mod diversity;
pub mod filtering;
pub mod generation;
pub mod selection;
