pub mod design;
pub mod profile;

use crate::config::OracleSettings;
use crate::error::{CliError, Result};
use rnadesign::core::io::traits::OutputFile;
use rnadesign::core::oracle::{OracleCache, ViennaOracle};
use std::path::Path;
use tracing::{info, warn};

/// The folding engine plus the cache that lives for one command invocation.
pub struct OracleSession {
    pub oracle: ViennaOracle,
    pub cache: OracleCache,
    settings: OracleSettings,
}

impl OracleSession {
    pub fn open(settings: &OracleSettings) -> Self {
        let mut oracle = ViennaOracle::new();
        if let Some(dir) = &settings.bin_dir {
            oracle = oracle.with_bin_dir(dir);
        }
        if let Some(celsius) = settings.temperature {
            oracle = oracle.with_temperature(celsius);
        }
        let cache = OracleCache::load(&settings.cache_dir);
        Self {
            oracle,
            cache,
            settings: settings.clone(),
        }
    }

    /// Flushes the cache to disk. Failure is reported but never fails the command.
    pub fn close(self) {
        let stats = self.cache.stats();
        info!(
            hits = stats.hits,
            misses = stats.misses,
            entries = self.cache.len(),
            "Oracle cache usage."
        );
        if let Err(e) = self.cache.save(&self.settings.cache_dir) {
            warn!(error = %e, "Could not persist oracle cache.");
        }
    }
}

pub(crate) fn write_output<F: OutputFile>(content: &F::Content, path: &Path) -> Result<()>
where
    F::Error: Send + Sync + 'static,
{
    F::write_to_path(content, path).map_err(|e| CliError::Output {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    info!(path = %path.display(), "Wrote output file.");
    Ok(())
}
