use crate::core::models::{ConservationProfile, Sequence, Structure};
use crate::core::oracle::FoldingOracle;
use crate::engine::config::{GenerationConfig, GenerationMode};
use crate::engine::context::{DesignTarget, TaskContext};
use crate::engine::progress::Progress;
use crate::engine::utils::sampling::{
    mutation_count, position_weights, sample_distinct_weighted, substitute_base,
};
use itertools::Itertools;
use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};
use std::collections::HashSet;
use tracing::{debug, info, instrument, trace, warn};

/// Minimum number of mutation trials regardless of the requested count.
const MIN_MUTATION_POOL: usize = 5000;
/// Mutation trials scheduled per requested candidate.
const TRIALS_PER_CANDIDATE: usize = 50;

/// `Auto` becomes inverse folding for targets longer than `auto_switch_length`.
pub fn resolve_mode(
    mode: GenerationMode,
    target_length: usize,
    auto_switch_length: usize,
) -> GenerationMode {
    match mode {
        GenerationMode::Auto if target_length > auto_switch_length => GenerationMode::Inverse,
        GenerationMode::Auto => GenerationMode::Conservation,
        forced => forced,
    }
}

pub fn mutation_pool_size(count: usize, ceiling: usize) -> usize {
    count
        .saturating_mul(TRIALS_PER_CANDIDATE)
        .max(MIN_MUTATION_POOL)
        .min(ceiling)
}

/// Produces up to `count` distinct sequences predicted to fold into the target structure.
///
/// Never fails: a shortfall is logged and whatever was found is returned.
#[instrument(skip_all, name = "generation_task", fields(count))]
pub fn run<O: FoldingOracle + ?Sized>(
    context: TaskContext<'_, O>,
    target: &DesignTarget,
    config: &GenerationConfig,
    profile: Option<&ConservationProfile>,
    count: usize,
    rng: &mut impl Rng,
) -> Vec<Sequence> {
    if count == 0 {
        return Vec::new();
    }
    let mode = resolve_mode(config.mode, target.structure.len(), config.auto_switch_length);
    info!(%mode, "Generating candidates.");

    let candidates = match mode {
        GenerationMode::Inverse => inverse_fold_candidates(
            context,
            &target.structure,
            count,
            config.inverse_attempt_ceiling,
            rng,
        ),
        _ => mutation_candidates(context, target, config, profile, count, rng),
    };

    if candidates.len() < count {
        warn!(
            requested = count,
            produced = candidates.len(),
            "Candidate generation fell short of the requested count."
        );
    } else {
        info!(produced = candidates.len(), "Candidate generation complete.");
    }
    candidates
}

/// Repeated inverse folding from fresh random seeds until `count` distinct sequences
/// are found or `attempt_ceiling` calls have been made.
pub fn inverse_fold_candidates<O: FoldingOracle + ?Sized>(
    context: TaskContext<'_, O>,
    structure: &Structure,
    count: usize,
    attempt_ceiling: usize,
    rng: &mut impl Rng,
) -> Vec<Sequence> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    let mut attempts = 0;

    context.reporter.report(Progress::TaskStart {
        total_steps: count as u64,
    });
    while found.len() < count && attempts < attempt_ceiling {
        attempts += 1;
        let seed = Sequence::random(structure.len(), rng);
        match context.oracle.inverse_fold(structure, &seed) {
            Ok(sequence) if sequence.len() == structure.len() => {
                if seen.insert(sequence.clone()) {
                    found.push(sequence);
                    context.reporter.report(Progress::TaskIncrement);
                }
            }
            Ok(sequence) => {
                trace!(length = sequence.len(), "Inverse fold returned wrong length.");
            }
            Err(e) => trace!(error = %e, "Inverse fold attempt failed."),
        }
    }
    context.reporter.report(Progress::TaskFinish);
    debug!(attempts, found = found.len(), "Inverse folding finished.");
    found
}

/// One sequence realizing `structure`, retried up to `attempt_ceiling` times.
pub fn find_seed_sequence<O: FoldingOracle + ?Sized>(
    oracle: &O,
    structure: &Structure,
    attempt_ceiling: usize,
    rng: &mut impl Rng,
) -> Option<Sequence> {
    (0..attempt_ceiling).find_map(|attempt| {
        let seed = Sequence::random(structure.len(), rng);
        match oracle.inverse_fold(structure, &seed) {
            Ok(sequence) if sequence.len() == structure.len() => Some(sequence),
            Ok(_) => None,
            Err(e) => {
                trace!(attempt, error = %e, "Seed inverse fold failed.");
                None
            }
        }
    })
}

fn mutation_trial<O: FoldingOracle + ?Sized>(
    oracle: &O,
    seed: &Sequence,
    structure: &Structure,
    weights: &[f64],
    config: &GenerationConfig,
    trial_seed: u64,
) -> Option<Sequence> {
    let mut rng = StdRng::seed_from_u64(trial_seed);
    let count = mutation_count(
        config.strategy,
        config.mutation_count,
        &config.mutation_weights,
        seed.len(),
        &mut rng,
    );
    let positions = sample_distinct_weighted(weights, count, &mut rng).ok()?;

    let mut bases = seed.bases().to_vec();
    for position in positions {
        bases[position] = substitute_base(bases[position], &mut rng);
    }
    let mutant = Sequence::new(bases);

    match oracle.fold(&mutant) {
        Ok(fold) if fold.structure == *structure => Some(mutant),
        Ok(_) => None,
        Err(e) => {
            trace!(error = %e, "Mutant fold failed; trial rejected.");
            None
        }
    }
}

/// Conservation-guided local search around one inverse-folded seed.
pub fn mutation_candidates<O: FoldingOracle + ?Sized>(
    context: TaskContext<'_, O>,
    target: &DesignTarget,
    config: &GenerationConfig,
    profile: Option<&ConservationProfile>,
    count: usize,
    rng: &mut impl Rng,
) -> Vec<Sequence> {
    let structure = &target.structure;
    let Some(seed) =
        find_seed_sequence(context.oracle, structure, config.inverse_attempt_ceiling, rng)
    else {
        warn!(
            attempts = config.inverse_attempt_ceiling,
            "No seed sequence converged for the target structure."
        );
        return Vec::new();
    };

    let weights = position_weights(seed.len(), profile, config.conservation_bias);
    let pool_size = mutation_pool_size(count, config.mutation_attempt_ceiling);
    let trial_seeds: Vec<u64> = (0..pool_size).map(|_| rng.next_u64()).collect();
    debug!(
        pool_size,
        profiled = profile.is_some(),
        "Scheduling mutation trials."
    );

    context.reporter.report(Progress::TaskStart {
        total_steps: pool_size as u64,
    });
    let results = context.pool.map(&trial_seeds, |&trial_seed| {
        let outcome = mutation_trial(
            context.oracle,
            &seed,
            structure,
            &weights,
            config,
            trial_seed,
        );
        context.reporter.report(Progress::TaskIncrement);
        outcome
    });
    context.reporter.report(Progress::TaskFinish);

    let accepted: Vec<Sequence> = results.into_iter().flatten().unique().collect();
    debug!(
        trials = pool_size,
        accepted = accepted.len(),
        "Mutation trials finished."
    );
    accepted.into_iter().take(count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oracle::testing::MockOracle;
    use crate::engine::config::{DesignConfigBuilder, MutationStrategy};
    use crate::engine::pool::TaskPool;
    use crate::engine::progress::ProgressReporter;

    const STRUCTURE: &str = "((((....))))";

    fn target() -> DesignTarget {
        DesignTarget {
            reference: "GGGAAAACCCUC".parse().unwrap(),
            structure: STRUCTURE.parse().unwrap(),
            mfe: -4.0,
        }
    }

    fn config(mode: GenerationMode) -> GenerationConfig {
        DesignConfigBuilder::new()
            .mode(mode)
            .mutation_attempt_ceiling(400)
            .inverse_attempt_ceiling(50)
            .build()
            .unwrap()
            .generation
    }

    #[test]
    fn auto_mode_switches_on_length() {
        assert_eq!(
            resolve_mode(GenerationMode::Auto, 31, 30),
            GenerationMode::Inverse
        );
        assert_eq!(
            resolve_mode(GenerationMode::Auto, 30, 30),
            GenerationMode::Conservation
        );
        assert_eq!(
            resolve_mode(GenerationMode::Inverse, 5, 30),
            GenerationMode::Inverse
        );
    }

    #[test]
    fn pool_size_respects_floor_and_ceiling() {
        assert_eq!(mutation_pool_size(10, 1_000_000), 5000);
        assert_eq!(mutation_pool_size(500, 1_000_000), 25_000);
        assert_eq!(mutation_pool_size(500, 1000), 1000);
    }

    #[test]
    fn inverse_mode_collects_distinct_sequences() {
        let oracle = MockOracle::always(STRUCTURE.parse().unwrap());
        let pool = TaskPool::sequential();
        let reporter = ProgressReporter::new();
        let ctx = TaskContext::new(&oracle, &pool, &reporter);
        let mut rng = StdRng::seed_from_u64(1);

        let out = run(ctx, &target(), &config(GenerationMode::Inverse), None, 8, &mut rng);
        assert_eq!(out.len(), 8);
        assert_eq!(out.iter().unique().count(), 8);
        assert!(out.iter().all(|s| s.len() == STRUCTURE.len()));
    }

    #[test]
    fn inverse_mode_stops_at_attempt_ceiling() {
        let oracle = MockOracle::always(STRUCTURE.parse().unwrap()).with_failing_inverse();
        let pool = TaskPool::sequential();
        let reporter = ProgressReporter::new();
        let ctx = TaskContext::new(&oracle, &pool, &reporter);
        let mut rng = StdRng::seed_from_u64(1);

        let out = run(ctx, &target(), &config(GenerationMode::Inverse), None, 5, &mut rng);
        assert!(out.is_empty());
        assert_eq!(oracle.inverse_calls(), 50);
    }

    #[test]
    fn mutation_mode_runs_bounded_trials_and_truncates() {
        let oracle = MockOracle::always(STRUCTURE.parse().unwrap());
        let pool = TaskPool::new(Some(2));
        let reporter = ProgressReporter::new();
        let ctx = TaskContext::new(&oracle, &pool, &reporter);
        let mut rng = StdRng::seed_from_u64(9);

        let out = run(
            ctx,
            &target(),
            &config(GenerationMode::Conservation),
            None,
            20,
            &mut rng,
        );
        assert_eq!(out.len(), 20);
        assert_eq!(out.iter().unique().count(), 20);
        assert_eq!(oracle.fold_calls(), 400);
        assert_eq!(oracle.inverse_calls(), 1);
    }

    #[test]
    fn mutation_mode_rejects_structure_changes() {
        let oracle = MockOracle::always(STRUCTURE.parse().unwrap()).with_fold_predicate(|_| false);
        let pool = TaskPool::sequential();
        let reporter = ProgressReporter::new();
        let ctx = TaskContext::new(&oracle, &pool, &reporter);
        let mut rng = StdRng::seed_from_u64(9);

        let out = run(
            ctx,
            &target(),
            &config(GenerationMode::Conservation),
            None,
            5,
            &mut rng,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn mutation_mode_without_seed_returns_empty() {
        let oracle = MockOracle::always(STRUCTURE.parse().unwrap()).with_failing_inverse();
        let pool = TaskPool::sequential();
        let reporter = ProgressReporter::new();
        let ctx = TaskContext::new(&oracle, &pool, &reporter);
        let mut rng = StdRng::seed_from_u64(9);

        let out = run(
            ctx,
            &target(),
            &config(GenerationMode::Conservation),
            None,
            5,
            &mut rng,
        );
        assert!(out.is_empty());
        assert_eq!(oracle.fold_calls(), 0);
    }

    #[test]
    fn mutation_results_do_not_depend_on_scheduling() {
        let oracle = MockOracle::always(STRUCTURE.parse().unwrap());
        let reporter = ProgressReporter::new();
        let mut cfg = config(GenerationMode::Conservation);
        cfg.strategy = MutationStrategy::Random;

        let sequential = TaskPool::sequential();
        let parallel = TaskPool::new(Some(3));
        let a = run(
            TaskContext::new(&oracle, &sequential, &reporter),
            &target(),
            &cfg,
            None,
            15,
            &mut StdRng::seed_from_u64(4),
        );
        let b = run(
            TaskContext::new(&oracle, &parallel, &reporter),
            &target(),
            &cfg,
            None,
            15,
            &mut StdRng::seed_from_u64(4),
        );
        assert_eq!(a, b);
    }
}
