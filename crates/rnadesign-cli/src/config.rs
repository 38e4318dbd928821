use crate::cli::{DesignArgs, ProfileArgs, SharedArgs};
use crate::error::{CliError, Result};
use rnadesign::core::models::Sequence;
use rnadesign::engine::config::{self as core_config, GenerationMode, MutationStrategy};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const CACHE_SUBDIR: &str = "cache";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialGenerationConfig {
    mode: Option<GenerationMode>,
    auto_switch_length: Option<usize>,
    strategy: Option<MutationStrategy>,
    mutation_count: Option<usize>,
    mutation_weights: Option<[f64; 3]>,
    conservation_bias: Option<f64>,
    inverse_attempt_ceiling: Option<usize>,
    mutation_attempt_ceiling: Option<usize>,
    candidate_multiplier: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialConservationConfig {
    enabled: Option<bool>,
    trials: Option<usize>,
    gc_min: Option<f64>,
    gc_max: Option<f64>,
    mfe_tolerance: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialFilterConfig {
    target_count: Option<usize>,
    gc_min: Option<f64>,
    gc_max: Option<f64>,
    max_homopolymer_run: Option<usize>,
    min_probability: Option<f64>,
    max_diversity: Option<f64>,
    lmax_threshold: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialSelectionConfig {
    cluster_threshold: Option<usize>,
    group_size: Option<usize>,
    group_count: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialOracleConfig {
    bin_dir: Option<PathBuf>,
    temperature: Option<f64>,
    cache_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialDesignConfig {
    reference: Option<String>,
    runs: Option<usize>,
    seed: Option<u64>,
    threads: Option<usize>,
    generation: Option<PartialGenerationConfig>,
    conservation: Option<PartialConservationConfig>,
    filter: Option<PartialFilterConfig>,
    selection: Option<PartialSelectionConfig>,
    oracle: Option<PartialOracleConfig>,
}

/// How the folding engine is reached and where its results are cached.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleSettings {
    pub bin_dir: Option<PathBuf>,
    pub temperature: Option<f64>,
    pub cache_dir: PathBuf,
}

impl OracleSettings {
    pub fn profile_store(&self) -> PathBuf {
        self.cache_dir.join("conservation.toml")
    }
}

/// Everything a subcommand needs after file, flags and `--set` values are merged.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub design: core_config::DesignConfig,
    pub oracle: OracleSettings,
    pub output_dir: PathBuf,
}

impl PartialDesignConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads the file named by `--config`, or starts empty when none is given.
    pub fn load(shared: &SharedArgs) -> Result<Self> {
        match &shared.config {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn merge_design_args(
        mut self,
        args: &DesignArgs,
        threads: Option<usize>,
    ) -> Result<AppConfig> {
        if let Some(mode) = &args.mode {
            let mode = GenerationMode::from_str(mode)
                .map_err(|e| CliError::Argument(e.to_string()))?;
            self.generation.get_or_insert_with(Default::default).mode = Some(mode);
        }
        if let Some(runs) = args.runs {
            self.runs = Some(runs);
        }
        if args.no_conservation {
            self.conservation.get_or_insert_with(Default::default).enabled = Some(false);
        }
        let filter = self.filter.get_or_insert_with(Default::default);
        filter.target_count = args.target_count.or(filter.target_count);
        filter.lmax_threshold = args.lmax_threshold.or(filter.lmax_threshold);
        let selection = self.selection.get_or_insert_with(Default::default);
        selection.group_size = args.group_size.or(selection.group_size);
        selection.group_count = args.group_count.or(selection.group_count);

        self.merge_shared(&args.shared, threads)
    }

    pub fn merge_profile_args(
        mut self,
        args: &ProfileArgs,
        threads: Option<usize>,
    ) -> Result<AppConfig> {
        if let Some(trials) = args.trials {
            self.conservation.get_or_insert_with(Default::default).trials = Some(trials);
        }
        self.merge_shared(&args.shared, threads)
    }

    fn merge_shared(mut self, shared: &SharedArgs, threads: Option<usize>) -> Result<AppConfig> {
        if let Some(reference) = &shared.reference {
            self.reference = Some(reference.clone());
        }
        if let Some(seed) = shared.seed {
            self.seed = Some(seed);
        }
        if threads.is_some() {
            self.threads = threads;
        }
        if let Some(dir) = &shared.cache_dir {
            self.oracle.get_or_insert_with(Default::default).cache_dir = Some(dir.clone());
        }
        self.apply_set_values(&shared.set_values)?;

        let oracle = self.oracle.take().unwrap_or_default();
        let oracle = OracleSettings {
            bin_dir: oracle.bin_dir,
            temperature: oracle.temperature,
            cache_dir: oracle
                .cache_dir
                .unwrap_or_else(|| shared.output_dir.join(CACHE_SUBDIR)),
        };

        Ok(AppConfig {
            design: self.into_core()?,
            oracle,
            output_dir: shared.output_dir.clone(),
        })
    }

    fn into_core(self) -> Result<core_config::DesignConfig> {
        let mut builder = core_config::DesignConfigBuilder::new();

        if let Some(reference) = self.reference {
            let sequence = Sequence::from_str(&reference)
                .map_err(|e| CliError::Argument(format!("Invalid reference sequence: {e}")))?;
            builder = builder.reference(sequence);
        }
        if let Some(v) = self.runs {
            builder = builder.runs(v);
        }
        if let Some(v) = self.seed {
            builder = builder.seed(v);
        }
        if let Some(v) = self.threads {
            builder = builder.threads(v);
        }

        let generation = self.generation.unwrap_or_default();
        if let Some(v) = generation.mode {
            builder = builder.mode(v);
        }
        if let Some(v) = generation.auto_switch_length {
            builder = builder.auto_switch_length(v);
        }
        if let Some(v) = generation.strategy {
            builder = builder.strategy(v);
        }
        if let Some(v) = generation.mutation_count {
            builder = builder.mutation_count(v);
        }
        if let Some(v) = generation.mutation_weights {
            builder = builder.mutation_weights(v);
        }
        if let Some(v) = generation.conservation_bias {
            builder = builder.conservation_bias(v);
        }
        if let Some(v) = generation.inverse_attempt_ceiling {
            builder = builder.inverse_attempt_ceiling(v);
        }
        if let Some(v) = generation.mutation_attempt_ceiling {
            builder = builder.mutation_attempt_ceiling(v);
        }
        if let Some(v) = generation.candidate_multiplier {
            builder = builder.candidate_multiplier(v);
        }

        let conservation = self.conservation.unwrap_or_default();
        if let Some(v) = conservation.enabled {
            builder = builder.conservation_enabled(v);
        }
        if let Some(v) = conservation.trials {
            builder = builder.conservation_trials(v);
        }
        if let Some(v) = conservation.mfe_tolerance {
            builder = builder.mfe_tolerance(v);
        }
        builder = builder.conservation_gc_band(
            conservation
                .gc_min
                .unwrap_or(core_config::DEFAULT_CONSERVATION_GC_MIN),
            conservation
                .gc_max
                .unwrap_or(core_config::DEFAULT_CONSERVATION_GC_MAX),
        );

        let filter = self.filter.unwrap_or_default();
        builder = builder.gc_band(
            filter.gc_min.unwrap_or(core_config::DEFAULT_GC_MIN),
            filter.gc_max.unwrap_or(core_config::DEFAULT_GC_MAX),
        );
        if let Some(v) = filter.target_count {
            builder = builder.target_count(v);
        }
        if let Some(v) = filter.max_homopolymer_run {
            builder = builder.max_homopolymer_run(v);
        }
        if let Some(v) = filter.min_probability {
            builder = builder.min_probability(v);
        }
        if let Some(v) = filter.max_diversity {
            builder = builder.max_diversity(v);
        }
        if let Some(v) = filter.lmax_threshold {
            builder = builder.lmax_threshold(v);
        }

        let selection = self.selection.unwrap_or_default();
        if let Some(v) = selection.cluster_threshold {
            builder = builder.cluster_threshold(v);
        }
        if let Some(v) = selection.group_size {
            builder = builder.group_size(v);
        }
        if let Some(v) = selection.group_count {
            builder = builder.group_count(v);
        }

        Ok(builder.build()?)
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let key = key.trim();
            let value_str = value_str.trim();

            match key {
                "reference" => self.reference = Some(value_str.to_string()),
                "runs" => self.runs = Some(parse_value(key, value_str)?),
                "seed" => self.seed = Some(parse_value(key, value_str)?),
                "threads" => self.threads = Some(parse_value(key, value_str)?),
                "generation.mode" => {
                    self.generation.get_or_insert_with(Default::default).mode =
                        Some(parse_value(key, value_str)?);
                }
                "generation.auto-switch-length" => {
                    self.generation
                        .get_or_insert_with(Default::default)
                        .auto_switch_length = Some(parse_value(key, value_str)?);
                }
                "generation.strategy" => {
                    self.generation.get_or_insert_with(Default::default).strategy =
                        Some(parse_value(key, value_str)?);
                }
                "generation.mutation-count" => {
                    self.generation
                        .get_or_insert_with(Default::default)
                        .mutation_count = Some(parse_value(key, value_str)?);
                }
                "generation.conservation-bias" => {
                    self.generation
                        .get_or_insert_with(Default::default)
                        .conservation_bias = Some(parse_value(key, value_str)?);
                }
                "generation.inverse-attempt-ceiling" => {
                    self.generation
                        .get_or_insert_with(Default::default)
                        .inverse_attempt_ceiling = Some(parse_value(key, value_str)?);
                }
                "generation.mutation-attempt-ceiling" => {
                    self.generation
                        .get_or_insert_with(Default::default)
                        .mutation_attempt_ceiling = Some(parse_value(key, value_str)?);
                }
                "generation.candidate-multiplier" => {
                    self.generation
                        .get_or_insert_with(Default::default)
                        .candidate_multiplier = Some(parse_value(key, value_str)?);
                }
                "conservation.enabled" => {
                    self.conservation.get_or_insert_with(Default::default).enabled =
                        Some(parse_value(key, value_str)?);
                }
                "conservation.trials" => {
                    self.conservation.get_or_insert_with(Default::default).trials =
                        Some(parse_value(key, value_str)?);
                }
                "conservation.gc-min" => {
                    self.conservation.get_or_insert_with(Default::default).gc_min =
                        Some(parse_value(key, value_str)?);
                }
                "conservation.gc-max" => {
                    self.conservation.get_or_insert_with(Default::default).gc_max =
                        Some(parse_value(key, value_str)?);
                }
                "conservation.mfe-tolerance" => {
                    self.conservation
                        .get_or_insert_with(Default::default)
                        .mfe_tolerance = Some(parse_value(key, value_str)?);
                }
                "filter.target-count" => {
                    self.filter.get_or_insert_with(Default::default).target_count =
                        Some(parse_value(key, value_str)?);
                }
                "filter.gc-min" => {
                    self.filter.get_or_insert_with(Default::default).gc_min =
                        Some(parse_value(key, value_str)?);
                }
                "filter.gc-max" => {
                    self.filter.get_or_insert_with(Default::default).gc_max =
                        Some(parse_value(key, value_str)?);
                }
                "filter.max-homopolymer-run" => {
                    self.filter
                        .get_or_insert_with(Default::default)
                        .max_homopolymer_run = Some(parse_value(key, value_str)?);
                }
                "filter.min-probability" => {
                    self.filter.get_or_insert_with(Default::default).min_probability =
                        Some(parse_value(key, value_str)?);
                }
                "filter.max-diversity" => {
                    self.filter.get_or_insert_with(Default::default).max_diversity =
                        Some(parse_value(key, value_str)?);
                }
                "filter.lmax-threshold" => {
                    self.filter.get_or_insert_with(Default::default).lmax_threshold =
                        Some(parse_value(key, value_str)?);
                }
                "selection.cluster-threshold" => {
                    self.selection
                        .get_or_insert_with(Default::default)
                        .cluster_threshold = Some(parse_value(key, value_str)?);
                }
                "selection.group-size" => {
                    self.selection.get_or_insert_with(Default::default).group_size =
                        Some(parse_value(key, value_str)?);
                }
                "selection.group-count" => {
                    self.selection.get_or_insert_with(Default::default).group_count =
                        Some(parse_value(key, value_str)?);
                }
                "oracle.temperature" => {
                    self.oracle.get_or_insert_with(Default::default).temperature =
                        Some(parse_value(key, value_str)?);
                }
                "oracle.bin-dir" => {
                    self.oracle.get_or_insert_with(Default::default).bin_dir =
                        Some(PathBuf::from(value_str));
                }
                "oracle.cache-dir" => {
                    self.oracle.get_or_insert_with(Default::default).cache_dir =
                        Some(PathBuf::from(value_str));
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid value for {}: {}", key, value))
    })
}
