use crate::core::models::{Sequence, Structure};
use crate::core::oracle::FoldingOracle;
use crate::core::utils::metrics::{gc_content, has_homopolymer, longest_common_substring};
use crate::engine::config::FilterConfig;
use crate::engine::context::{DesignTarget, TaskContext};
use crate::engine::progress::Progress;
use itertools::Itertools;
use tracing::{debug, info, instrument, trace, warn};

/// A sequence under evaluation together with what the oracle predicted for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub sequence: Sequence,
    pub structure: Structure,
    pub mfe: f64,
    pub probability: Option<f64>,
    pub diversity: Option<f64>,
}

/// Applies the acceptance criteria in order, stopping at the first failure.
fn evaluate<O: FoldingOracle + ?Sized>(
    oracle: &O,
    sequence: &Sequence,
    target: &DesignTarget,
    config: &FilterConfig,
) -> Option<Candidate> {
    let fold = match oracle.fold(sequence) {
        Ok(fold) => fold,
        Err(e) => {
            trace!(error = %e, "Candidate fold failed.");
            return None;
        }
    };
    if fold.structure != target.structure {
        return None;
    }
    if !config.gc_band.contains(gc_content(sequence)) {
        return None;
    }
    if has_homopolymer(sequence, config.max_homopolymer_run) {
        return None;
    }

    let confidence = match oracle.structure_confidence(sequence, &target.structure) {
        Ok(confidence) => confidence,
        Err(e) => {
            trace!(error = %e, "Structure confidence failed.");
            return None;
        }
    };
    if confidence.probability < config.min_probability {
        return None;
    }
    if confidence.diversity > config.max_diversity {
        return None;
    }

    Some(Candidate {
        sequence: sequence.clone(),
        structure: fold.structure,
        mfe: fold.mfe,
        probability: Some(confidence.probability),
        diversity: Some(confidence.diversity),
    })
}

/// Reduces a candidate pool to accepted variants ranked by structure probability
/// (descending), then MFE (ascending), truncated to the target count.
#[instrument(skip_all, name = "filter_task", fields(candidates = candidates.len()))]
pub fn filter_variants<O: FoldingOracle + ?Sized>(
    context: TaskContext<'_, O>,
    target: &DesignTarget,
    candidates: &[Sequence],
    config: &FilterConfig,
) -> Vec<Sequence> {
    let unique: Vec<&Sequence> = candidates.iter().unique().collect();
    let (pool, wrong_length): (Vec<&Sequence>, Vec<&Sequence>) = unique
        .into_iter()
        .partition(|s| s.len() == target.reference.len());
    if !wrong_length.is_empty() {
        warn!(
            skipped = wrong_length.len(),
            expected = target.reference.len(),
            "Skipping candidates whose length differs from the reference."
        );
    }

    context.reporter.report(Progress::TaskStart {
        total_steps: pool.len() as u64,
    });
    let evaluated = context.pool.map(&pool, |sequence| {
        let outcome = evaluate(context.oracle, sequence, target, config);
        context.reporter.report(Progress::TaskIncrement);
        outcome
    });
    context.reporter.report(Progress::TaskFinish);

    let mut accepted: Vec<Candidate> = evaluated.into_iter().flatten().collect();
    let passed = accepted.len();
    accepted.sort_by(|a, b| {
        let pa = a.probability.unwrap_or(0.0);
        let pb = b.probability.unwrap_or(0.0);
        pb.total_cmp(&pa).then_with(|| a.mfe.total_cmp(&b.mfe))
    });
    accepted.truncate(config.target_count);

    info!(
        evaluated = pool.len(),
        passed,
        kept = accepted.len(),
        "Variant filtering complete."
    );
    accepted.into_iter().map(|c| c.sequence).collect()
}

/// Greedy exclusion keeping each candidate only if its longest common substring with
/// the reference and every previously kept variant is at most `threshold`.
///
/// Order-dependent: candidates are visited in the given order.
pub fn enforce_lmax_filter(
    candidates: &[Sequence],
    reference: &Sequence,
    threshold: usize,
) -> Vec<Sequence> {
    let mut kept: Vec<Sequence> = Vec::new();
    for candidate in candidates {
        let violates = std::iter::once(reference)
            .chain(kept.iter())
            .any(|other| longest_common_substring(candidate, other) > threshold);
        if violates {
            trace!(%candidate, "Rejected by Lmax filter.");
        } else {
            kept.push(candidate.clone());
        }
    }
    debug!(
        input = candidates.len(),
        kept = kept.len(),
        threshold,
        "Lmax filter applied."
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oracle::StructureConfidence;
    use crate::core::oracle::testing::MockOracle;
    use crate::engine::config::{DesignConfigBuilder, GcBand};
    use crate::engine::pool::TaskPool;
    use crate::engine::progress::ProgressReporter;

    fn seq(s: &str) -> Sequence {
        s.parse().unwrap()
    }

    fn target() -> DesignTarget {
        DesignTarget {
            reference: seq("GGGAAACCCA"),
            structure: "(((...))).".parse().unwrap(),
            mfe: -3.0,
        }
    }

    fn config(target_count: usize) -> FilterConfig {
        let mut c = DesignConfigBuilder::new()
            .target_count(target_count)
            .build()
            .unwrap()
            .filter;
        c.gc_band = GcBand::new(40.0, 60.0);
        c
    }

    fn run_filter(oracle: &MockOracle, candidates: &[Sequence], target_count: usize) -> Vec<Sequence> {
        let pool = TaskPool::new(Some(2));
        let reporter = ProgressReporter::new();
        filter_variants(
            TaskContext::new(oracle, &pool, &reporter),
            &target(),
            candidates,
            &config(target_count),
        )
    }

    #[test]
    fn rejects_gc_homopolymer_and_structure_failures() {
        let oracle = MockOracle::always(target().structure)
            .with_fold_predicate(|s| s.to_string() != "GCAUGCAUGA");
        let candidates = vec![
            seq("GCAUGCAUGC"), // passes, 60% GC
            seq("GCAUGCAUGA"), // folds elsewhere
            seq("GGGGAUAUAU"), // homopolymer of 4
            seq("AUAUAUAUAU"), // GC 0%
            seq("GCAUGC"),     // wrong length
        ];
        let out = run_filter(&oracle, &candidates, 10);
        assert_eq!(out, vec![seq("GCAUGCAUGC")]);
    }

    #[test]
    fn ranks_by_probability_then_mfe_and_truncates() {
        let oracle = MockOracle::always(target().structure).with_confidence(|s| {
            let probability = if s.to_string().starts_with("CA") { 0.95 } else { 0.8 };
            StructureConfidence {
                probability,
                diversity: 1.0,
            }
        });
        // MFE from the mock is -GC%/10, so higher GC ranks first among equal probability.
        let candidates = vec![
            seq("ACGUACGUAC"), // 50% GC, p 0.8
            seq("GCAUGCAUGC"), // 60% GC, p 0.8
            seq("CAUGCAUAGU"), // 40% GC, p 0.95
        ];
        let out = run_filter(&oracle, &candidates, 2);
        assert_eq!(out, vec![seq("CAUGCAUAGU"), seq("GCAUGCAUGC")]);
    }

    #[test]
    fn low_probability_and_high_diversity_are_rejected() {
        let oracle = MockOracle::always(target().structure).with_confidence(|s| {
            if s.to_string() == "ACGUACGUAC" {
                StructureConfidence {
                    probability: 0.1,
                    diversity: 1.0,
                }
            } else {
                StructureConfidence {
                    probability: 0.99,
                    diversity: 50.0,
                }
            }
        });
        let out = run_filter(&oracle, &[seq("ACGUACGUAC"), seq("GCAUGCAUGC")], 10);
        assert!(out.is_empty());
    }

    #[test]
    fn duplicate_candidates_are_evaluated_once() {
        let oracle = MockOracle::always(target().structure);
        let candidates = vec![seq("GCAUGCAUGC"), seq("GCAUGCAUGC")];
        let out = run_filter(&oracle, &candidates, 10);
        assert_eq!(out.len(), 1);
        assert_eq!(oracle.fold_calls(), 1);
    }

    #[test]
    fn output_never_exceeds_target_or_pool() {
        let oracle = MockOracle::always(target().structure);
        let candidates = vec![seq("GCAUGCAUGC"), seq("ACGUACGUAC"), seq("CAUGCAUAGU")];
        assert!(run_filter(&oracle, &candidates, 2).len() <= 2);
        assert!(run_filter(&oracle, &candidates, 10).len() <= 3);
        assert!(run_filter(&oracle, &[], 10).is_empty());
    }

    #[test]
    fn lmax_filter_is_greedy_and_includes_reference() {
        let reference = seq("AAAACCCCGGGG");
        let candidates = vec![
            seq("AAAACCCUUUUU"), // shares AAAACCC (7) with reference
            seq("UUUGGUUUGGUU"), // shares GG only
            seq("UUUGGUUUGGAA"), // shares UUUGGUUUGG (10) with previous
        ];
        let out = enforce_lmax_filter(&candidates, &reference, 5);
        assert_eq!(out, vec![seq("UUUGGUUUGGUU")]);

        for (i, a) in out.iter().enumerate() {
            assert!(longest_common_substring(a, &reference) <= 5);
            for b in &out[i + 1..] {
                assert!(longest_common_substring(a, b) <= 5);
            }
        }
    }

    #[test]
    fn lmax_filter_depends_on_order() {
        let reference = seq("CCCCCCCC");
        let a = seq("AAAAUUUU");
        let b = seq("AAAAGGGG");
        assert_eq!(
            enforce_lmax_filter(&[a.clone(), b.clone()], &reference, 3),
            vec![a.clone()]
        );
        assert_eq!(enforce_lmax_filter(&[b.clone(), a], &reference, 3), vec![b]);
    }
}
