use super::{OracleSession, write_output};
use crate::cli::ProfileArgs;
use crate::config::PartialDesignConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use rnadesign::core::io::report::ConservationCsv;
use rnadesign::core::oracle::CachedOracle;
use rnadesign::engine::progress::ProgressReporter;
use rnadesign::workflows;
use tracing::{debug, info};

pub const CONSERVATION_FILE: &str = "conservation.csv";

pub fn run(args: ProfileArgs, threads: Option<usize>, quiet: bool) -> Result<()> {
    let config = PartialDesignConfig::load(&args.shared)?.merge_profile_args(&args, threads)?;
    std::fs::create_dir_all(&config.output_dir)?;

    let session = OracleSession::open(&config.oracle);
    let oracle = CachedOracle::new(&session.oracle, &session.cache);

    let progress = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress.get_callback());

    println!("Profiling {} ...", config.design.reference);
    let store = config.oracle.profile_store();
    let outcome = workflows::profile::run(&oracle, &config.design, Some(store.as_path()), &reporter);
    progress.finish();
    debug!(phases = ?progress.completed_phases(), "Workflow phases completed.");
    drop(oracle);
    session.close();
    let outcome = outcome?;

    info!(
        reused = outcome.reused,
        structure = %outcome.target.structure,
        "Conservation profile ready."
    );
    let path = config.output_dir.join(CONSERVATION_FILE);
    write_output::<ConservationCsv>(&outcome.profile, &path)?;

    println!("Reference structure: {}", outcome.target.structure);
    println!(
        "Conservation: {}",
        outcome
            .profile
            .scores
            .iter()
            .map(|s| format!("{s:.2}"))
            .collect::<Vec<_>>()
            .join(" ")
    );
    println!("✓ Profile written to: {}", path.display());
    Ok(())
}
