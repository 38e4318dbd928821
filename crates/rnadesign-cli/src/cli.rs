use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "rnadesign - design structurally equivalent, mutually dissimilar RNA scaffold variants.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores minus one.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate, filter and group scaffold variants of a reference sequence.
    Design(DesignArgs),
    /// Estimate per-position mutation tolerance of the reference sequence.
    Profile(ProfileArgs),
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct SharedArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory receiving all output files.
    #[arg(short, long, value_name = "DIR", default_value = "rnadesign-output")]
    pub output_dir: PathBuf,

    /// Override the reference sequence (DNA letters are accepted).
    #[arg(short, long, value_name = "SEQUENCE")]
    pub reference: Option<String>,

    /// Override the random seed.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Directory for the persistent oracle and profile caches.
    /// Defaults to `<output-dir>/cache`.
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S filter.gc-min=45
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `design` subcommand.
#[derive(Args, Debug)]
pub struct DesignArgs {
    #[command(flatten)]
    pub shared: SharedArgs,

    /// Candidate generation mode: auto, inverse or conservation.
    #[arg(short, long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Number of independent generate-and-filter runs.
    #[arg(long, value_name = "INT")]
    pub runs: Option<usize>,

    /// Number of variants to keep.
    #[arg(short = 'n', long, value_name = "INT")]
    pub target_count: Option<usize>,

    /// Maximum number of variants per group.
    #[arg(long, value_name = "INT")]
    pub group_size: Option<usize>,

    /// Number of groups to form.
    #[arg(long, value_name = "INT")]
    pub group_count: Option<usize>,

    /// Longest shared substring allowed between any two variants.
    #[arg(long, value_name = "INT")]
    pub lmax_threshold: Option<usize>,

    /// Skip conservation profiling; mutation positions are then chosen uniformly.
    #[arg(long)]
    pub no_conservation: bool,
}

/// Arguments for the `profile` subcommand.
#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub shared: SharedArgs,

    /// Trials per position and alternative base.
    #[arg(short, long, value_name = "INT")]
    pub trials: Option<usize>,
}
