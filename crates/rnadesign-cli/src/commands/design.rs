use super::profile::CONSERVATION_FILE;
use super::{OracleSession, write_output};
use crate::cli::DesignArgs;
use crate::config::PartialDesignConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use rnadesign::core::io::fasta::{GroupFasta, VariantFasta};
use rnadesign::core::io::report::{ConservationCsv, MatrixCsv};
use rnadesign::core::oracle::CachedOracle;
use rnadesign::core::utils::matrix::DistanceMatrix;
use rnadesign::engine::progress::ProgressReporter;
use rnadesign::workflows;
use rnadesign::workflows::design::DesignOutcome;
use std::path::Path;
use tracing::{debug, info, warn};

const VARIANTS_FILE: &str = "variants.fasta";
const GROUPS_FILE: &str = "groups.fasta";
const HAMMING_FILE: &str = "hamming.csv";
const LMAX_FILE: &str = "lmax.csv";

pub fn run(args: DesignArgs, threads: Option<usize>, quiet: bool) -> Result<()> {
    let config = PartialDesignConfig::load(&args.shared)?.merge_design_args(&args, threads)?;
    std::fs::create_dir_all(&config.output_dir)?;

    let session = OracleSession::open(&config.oracle);
    let oracle = CachedOracle::new(&session.oracle, &session.cache);

    let progress = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress.get_callback());

    println!(
        "Designing variants of {} ({} run(s), target {}) ...",
        config.design.reference, config.design.runs, config.design.filter.target_count
    );
    let store = config.oracle.profile_store();
    let outcome = workflows::design::run(&oracle, &config.design, Some(store.as_path()), &reporter);
    progress.finish();
    debug!(phases = ?progress.completed_phases(), "Workflow phases completed.");
    drop(oracle);
    session.close();

    if outcome.variants.is_empty() {
        warn!("No variants survived filtering; only empty outputs will be written.");
    }
    write_outcome(&outcome, &config.output_dir)?;
    print_summary(&outcome, &config.output_dir);
    Ok(())
}

fn write_outcome(outcome: &DesignOutcome, dir: &Path) -> Result<()> {
    write_output::<VariantFasta>(&outcome.variants, &dir.join(VARIANTS_FILE))?;
    write_output::<GroupFasta>(&outcome.groups, &dir.join(GROUPS_FILE))?;
    write_output::<MatrixCsv>(&DistanceMatrix::hamming(&outcome.variants), &dir.join(HAMMING_FILE))?;
    write_output::<MatrixCsv>(&DistanceMatrix::lmax(&outcome.variants), &dir.join(LMAX_FILE))?;
    if let Some(profile) = &outcome.conservation {
        write_output::<ConservationCsv>(profile, &dir.join(CONSERVATION_FILE))?;
    }
    Ok(())
}

fn print_summary(outcome: &DesignOutcome, dir: &Path) {
    if let Some(target) = &outcome.target {
        println!("Target structure: {} (MFE {:.2})", target.structure, target.mfe);
    }
    for run in &outcome.runs {
        info!(
            run = run.run,
            candidates = run.candidates,
            filtered = run.filtered,
            kept = run.kept,
            new_unique = run.new_unique,
            "Run summary."
        );
    }
    println!(
        "Selected {} variant(s) in {} group(s).",
        outcome.variants.len(),
        outcome.groups.len()
    );
    println!(
        "Hamming diversity: intra-group {:.2}, inter-group {:.2}",
        outcome.group_diversity.intra_group_mean, outcome.group_diversity.inter_group_mean
    );
    println!(
        "Lmax: intra-group {:.2}, inter-group {:.2}",
        outcome.lmax.intra_group_mean, outcome.lmax.inter_group_mean
    );
    println!("✓ Results written to: {}", dir.display());
}
