use crate::core::models::{ConservationProfile, Sequence, SiteCounts};
use crate::core::oracle::FoldingOracle;
use crate::core::utils::metrics::{gc_content, has_homopolymer};
use crate::engine::config::ConservationConfig;
use crate::engine::context::{DesignTarget, TaskContext};
use crate::engine::progress::Progress;
use tracing::{info, instrument, trace};

/// Whether a single-point mutant is indistinguishable from the reference fold.
fn accepts_mutant<O: FoldingOracle + ?Sized>(
    oracle: &O,
    mutant: &Sequence,
    target: &DesignTarget,
    config: &ConservationConfig,
) -> bool {
    if !config.gc_band.contains(gc_content(mutant)) {
        return false;
    }
    if has_homopolymer(mutant, config.max_homopolymer_run) {
        return false;
    }
    match oracle.fold(mutant) {
        Ok(fold) => {
            fold.structure == target.structure
                && (fold.mfe - target.mfe).abs() <= config.mfe_tolerance
        }
        Err(e) => {
            trace!(error = %e, "Mutant fold failed; counted as rejection.");
            false
        }
    }
}

fn profile_position<O: FoldingOracle + ?Sized>(
    oracle: &O,
    target: &DesignTarget,
    position: usize,
    config: &ConservationConfig,
) -> SiteCounts {
    let reference = &target.reference;
    let mut site = SiteCounts::empty(reference.bases()[position]);
    let alternatives = site.alternatives;

    for (k, &alternative) in alternatives.iter().enumerate() {
        let mutant = reference.with_substitution(position, alternative);
        for _ in 0..config.trials {
            site.attempts[k] += 1;
            if accepts_mutant(oracle, &mutant, target, config) {
                site.accepts[k] += 1;
            }
        }
    }
    site
}

/// Estimates per-position substitution tolerance of the reference.
///
/// Each position is an independent unit of work scattered over the task pool; results
/// are gathered back in position order.
#[instrument(skip_all, name = "conservation_task", fields(length = target.len(), trials = config.trials))]
pub fn run<O: FoldingOracle + ?Sized>(
    context: TaskContext<'_, O>,
    target: &DesignTarget,
    config: &ConservationConfig,
) -> ConservationProfile {
    info!("Profiling per-position mutation tolerance.");
    let positions: Vec<usize> = (0..target.len()).collect();
    context.reporter.report(Progress::TaskStart {
        total_steps: positions.len() as u64,
    });

    let sites = context.pool.map(&positions, |&position| {
        let site = profile_position(context.oracle, target, position, config);
        context.reporter.report(Progress::TaskIncrement);
        site
    });

    context.reporter.report(Progress::TaskFinish);
    let profile = ConservationProfile::from_sites(target.reference.clone(), sites);

    let mean = if profile.is_empty() {
        0.0
    } else {
        profile.scores.iter().sum::<f64>() / profile.len() as f64
    };
    info!(mean_conservation = mean, "Conservation profile complete.");
    profile
}
