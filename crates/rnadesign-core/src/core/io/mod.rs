//! Output formats for variant lists, groups, matrices and conservation profiles.

pub mod fasta;
pub mod profile_store;
pub mod report;
pub mod traits;
