use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::profile_store::ProfileStoreError;
use crate::core::oracle::OracleError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fold reference sequence: {source}")]
    ReferenceFold {
        #[source]
        source: OracleError,
    },

    #[error("Conservation profile store error: {0}")]
    ProfileStore(#[from] ProfileStoreError),

    #[error("Phase '{phase}' failed: {reason}")]
    PhaseFailed { phase: &'static str, reason: String },
}
