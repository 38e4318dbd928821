//! Sequence, structure and profile value types shared by every component.

pub mod profile;
pub mod sequence;
pub mod structure;

pub use profile::{ConservationProfile, SiteCounts};
pub use sequence::{Base, Sequence, SequenceError};
pub use structure::{Structure, StructureError};

/// An ordered, bounded set of variants. Groups formed in one call are disjoint.
pub type Group = Vec<Sequence>;
