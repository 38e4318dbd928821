use crate::core::io::profile_store::{load_profile, save_profile};
use crate::core::models::{ConservationProfile, Sequence};
use crate::core::oracle::{FoldingOracle, OracleError};
use crate::engine::config::{ConservationConfig, DesignConfig};
use crate::engine::context::{DesignTarget, TaskContext};
use crate::engine::error::EngineError;
use crate::engine::pool::TaskPool;
use crate::engine::progress::ProgressReporter;
use crate::engine::tasks;
use std::path::Path;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct ProfileOutcome {
    pub target: DesignTarget,
    pub profile: ConservationProfile,
    /// True when the profile came from the store instead of being recomputed.
    pub reused: bool,
}

/// Folds the reference once to obtain the target structure and its MFE.
pub fn fold_reference<O: FoldingOracle + ?Sized>(
    oracle: &O,
    reference: &Sequence,
) -> Result<DesignTarget, OracleError> {
    let fold = oracle.fold(reference)?;
    Ok(DesignTarget {
        reference: reference.clone(),
        structure: fold.structure,
        mfe: fold.mfe,
    })
}

/// Returns a stored profile for `target.reference` if one exists, otherwise computes one.
pub(crate) fn load_or_compute<O: FoldingOracle + ?Sized>(
    context: TaskContext<'_, O>,
    target: &DesignTarget,
    config: &ConservationConfig,
    store: Option<&Path>,
) -> (ConservationProfile, bool) {
    if let Some(profile) = store.and_then(|path| load_profile(path, &target.reference)) {
        info!("Using stored conservation profile.");
        return (profile, true);
    }
    (tasks::conservation::run(context, target, config), false)
}

/// Profiles per-position mutation tolerance of the configured reference.
///
/// With a `store` path, a profile previously computed for the same reference is reused,
/// and a freshly computed one is written back.
#[instrument(skip_all, name = "profile_workflow")]
pub fn run<O: FoldingOracle + ?Sized>(
    oracle: &O,
    config: &DesignConfig,
    store: Option<&Path>,
    reporter: &ProgressReporter,
) -> Result<ProfileOutcome, EngineError> {
    let pool = TaskPool::new(config.threads);
    let context = TaskContext::new(oracle, &pool, reporter);

    let target = reporter.phase("Folding Reference", || {
        fold_reference(oracle, &config.reference)
    });
    let target = target.map_err(|source| EngineError::ReferenceFold { source })?;
    info!(structure = %target.structure, mfe = target.mfe, "Reference folded.");

    let (profile, reused) = reporter.phase("Conservation Profiling", || {
        load_or_compute(context, &target, &config.conservation, store)
    });

    if let (Some(path), false) = (store, reused) {
        save_profile(path, &profile)?;
        info!(path = %path.display(), "Conservation profile stored.");
    }

    Ok(ProfileOutcome {
        target,
        profile,
        reused,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oracle::testing::{BrokenOracle, MockOracle};
    use crate::engine::config::DesignConfigBuilder;
    use tempfile::tempdir;

    fn config() -> DesignConfig {
        DesignConfigBuilder::new()
            .reference("ACGUACGUAC".parse().unwrap())
            .conservation_trials(2)
            .mfe_tolerance(0.0)
            .conservation_gc_band(0.0, 100.0)
            .threads(2)
            .build()
            .unwrap()
    }

    #[test]
    fn constant_oracle_yields_zero_conservation() {
        let oracle = MockOracle::always("((....))..".parse().unwrap()).with_constant_mfe(-2.5);
        let outcome = run(&oracle, &config(), None, &ProgressReporter::new()).unwrap();
        assert!(!outcome.reused);
        assert_eq!(outcome.profile.len(), 10);
        assert!(outcome.profile.scores.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn stored_profile_is_reused_for_same_reference() {
        let dir = tempdir().unwrap();
        let store = dir.path().join("profile.toml");
        let oracle = MockOracle::always("((....))..".parse().unwrap()).with_constant_mfe(-2.5);

        let first = run(&oracle, &config(), Some(&store), &ProgressReporter::new()).unwrap();
        assert!(store.exists());
        let calls_after_first = oracle.fold_calls();

        let second = run(&oracle, &config(), Some(&store), &ProgressReporter::new()).unwrap();
        assert!(second.reused);
        assert_eq!(second.profile, first.profile);
        // Only the reference fold happens on reuse.
        assert_eq!(oracle.fold_calls(), calls_after_first + 1);
    }

    #[test]
    fn unfoldable_reference_is_an_error() {
        let err = run(&BrokenOracle, &config(), None, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, EngineError::ReferenceFold { .. }));
    }
}
