use super::profile::{fold_reference, load_or_compute};
use crate::core::io::profile_store::save_profile;
use crate::core::models::{ConservationProfile, Group, Sequence};
use crate::core::oracle::FoldingOracle;
use crate::engine::config::{DesignConfig, GenerationMode};
use crate::engine::context::{DesignTarget, TaskContext};
use crate::engine::pool::TaskPool;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tasks::diversity::{GroupDiversity, LmaxAnalysis, group_diversity, lmax_analysis};
use crate::engine::tasks::filtering::{enforce_lmax_filter, filter_variants};
use crate::engine::tasks::generation::{self, resolve_mode};
use crate::engine::tasks::selection::{form_groups, select_diverse_subset};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, instrument, warn};

/// What one generate → filter → Lmax pass produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run: usize,
    pub candidates: usize,
    pub filtered: usize,
    pub kept: usize,
    /// Variants from this run not already contributed by an earlier run.
    pub new_unique: usize,
}

#[derive(Debug, Clone)]
pub struct DesignOutcome {
    /// The folded reference of the last run that could fold it.
    pub target: Option<DesignTarget>,
    pub conservation: Option<ConservationProfile>,
    pub runs: Vec<RunSummary>,
    pub variants: Vec<Sequence>,
    pub groups: Vec<Group>,
    pub group_diversity: GroupDiversity,
    pub lmax: LmaxAnalysis,
}

/// Runs the full design pipeline.
///
/// Performs `config.runs` independent generate → filter → Lmax passes, merges their
/// variants, re-applies the Lmax filter across the merged list, then selects a diverse
/// subset and partitions it into groups. No stage aborts the workflow: shortfalls are
/// logged and the largest feasible result is returned.
#[instrument(skip_all, name = "design_workflow", fields(runs = config.runs, seed = config.seed))]
pub fn run<O: FoldingOracle + ?Sized>(
    oracle: &O,
    config: &DesignConfig,
    profile_store: Option<&Path>,
    reporter: &ProgressReporter,
) -> DesignOutcome {
    let pool = TaskPool::new(config.threads);
    let context = TaskContext::new(oracle, &pool, reporter);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let reference = &config.reference;
    let target_count = config.filter.target_count;
    let pool_size = target_count.saturating_mul(config.generation.candidate_multiplier);

    info!(
        reference = %reference,
        target_count,
        pool_size,
        "Starting scaffold design."
    );

    let mut target: Option<DesignTarget> = None;
    let mut conservation: Option<ConservationProfile> = None;
    let mut profiled = false;
    let mut summaries = Vec::with_capacity(config.runs);
    let mut seen: HashSet<Sequence> = HashSet::new();
    let mut merged: Vec<Sequence> = Vec::new();

    for run in 0..config.runs {
        let mut run_rng = StdRng::seed_from_u64(rng.next_u64());
        reporter.report(Progress::Message(format!("Run {}/{}", run + 1, config.runs)));

        let run_target = match fold_reference(oracle, reference) {
            Ok(t) => t,
            Err(e) => {
                warn!(run, error = %e, "Reference fold failed; skipping run.");
                continue;
            }
        };

        if !profiled && needs_profile(config, &run_target) {
            profiled = true;
            let (profile, reused) = reporter.phase("Conservation Profiling", || {
                load_or_compute(context, &run_target, &config.conservation, profile_store)
            });
            if let (Some(path), false) = (profile_store, reused) {
                if let Err(e) = save_profile(path, &profile) {
                    warn!(error = %e, "Could not store conservation profile.");
                }
            }
            conservation = Some(profile);
        }

        let candidates = reporter.phase("Generating Candidates", || {
            generation::run(
                context,
                &run_target,
                &config.generation,
                conservation.as_ref(),
                pool_size,
                &mut run_rng,
            )
        });
        let filtered = reporter.phase("Filtering Variants", || {
            filter_variants(context, &run_target, &candidates, &config.filter)
        });
        let kept = enforce_lmax_filter(&filtered, reference, config.filter.lmax_threshold);

        let mut new_unique = 0;
        for variant in kept.iter().take(target_count) {
            if seen.insert(variant.clone()) {
                merged.push(variant.clone());
                new_unique += 1;
            }
        }
        let summary = RunSummary {
            run,
            candidates: candidates.len(),
            filtered: filtered.len(),
            kept: kept.len(),
            new_unique,
        };
        info!(
            run,
            candidates = summary.candidates,
            filtered = summary.filtered,
            kept = summary.kept,
            new_unique,
            "Run complete."
        );
        summaries.push(summary);
        target = Some(run_target);
    }

    reporter.report(Progress::Message(format!(
        "Merging {} variant(s) from {} run(s)",
        merged.len(),
        summaries.len()
    )));
    let unique = enforce_lmax_filter(&merged, reference, config.filter.lmax_threshold);
    if unique.len() < merged.len() {
        info!(
            removed = merged.len() - unique.len(),
            "Cross-run Lmax filter removed variants."
        );
    }
    if unique.len() < target_count {
        warn!(
            requested = target_count,
            available = unique.len(),
            "Fewer unique variants than requested."
        );
    }

    let variants = reporter.phase("Selecting Diverse Subset", || {
        select_diverse_subset(
            &unique,
            target_count.min(unique.len()),
            config.selection.cluster_threshold,
            &mut rng,
        )
    });
    let groups = reporter.phase("Forming Groups", || {
        form_groups(
            &variants,
            config.selection.group_size,
            config.selection.group_count,
            reference,
            &mut rng,
        )
    });

    let group_diversity = group_diversity(&groups);
    let lmax = lmax_analysis(&groups);

    info!(
        variants = variants.len(),
        groups = groups.len(),
        "Scaffold design complete."
    );
    DesignOutcome {
        target,
        conservation,
        runs: summaries,
        variants,
        groups,
        group_diversity,
        lmax,
    }
}

/// The profile only feeds conservation-guided mutation.
fn needs_profile(config: &DesignConfig, target: &DesignTarget) -> bool {
    config.conservation.enabled
        && resolve_mode(
            config.generation.mode,
            target.structure.len(),
            config.generation.auto_switch_length,
        ) == GenerationMode::Conservation
}
