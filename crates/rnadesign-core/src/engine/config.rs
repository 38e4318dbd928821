use crate::core::models::{Sequence, SequenceError};
use crate::core::utils::metrics::DEFAULT_MAX_HOMOPOLYMER_RUN;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_REFERENCE: &str = "GUGAACUGCCGAGUAGGUAGCUGAUAAC";
pub const DEFAULT_TARGET_COUNT: usize = 50;
pub const DEFAULT_CANDIDATE_MULTIPLIER: usize = 10;
pub const DEFAULT_RUNS: usize = 10;
pub const DEFAULT_GROUP_SIZE: usize = 12;
pub const DEFAULT_GROUP_COUNT: usize = 1;
pub const DEFAULT_LMAX_THRESHOLD: usize = 10;
pub const DEFAULT_GC_MIN: f64 = 40.0;
pub const DEFAULT_GC_MAX: f64 = 60.0;
pub const DEFAULT_CONSERVATION_GC_MIN: f64 = 30.0;
pub const DEFAULT_CONSERVATION_GC_MAX: f64 = 70.0;
pub const DEFAULT_MIN_PROBABILITY: f64 = 0.7;
pub const DEFAULT_MAX_DIVERSITY: f64 = 20.0;
pub const DEFAULT_MFE_TOLERANCE: f64 = 5.0;
pub const DEFAULT_AUTO_SWITCH_LENGTH: usize = 30;
pub const DEFAULT_CONSERVATION_TRIALS: usize = 100;
pub const DEFAULT_CONSERVATION_BIAS: f64 = 0.7;
pub const DEFAULT_MUTATION_COUNT: usize = 20;
pub const DEFAULT_MUTATION_WEIGHTS: [f64; 3] = [70.0, 25.0, 5.0];
pub const DEFAULT_INVERSE_ATTEMPT_CEILING: usize = 10_000;
pub const DEFAULT_MUTATION_ATTEMPT_CEILING: usize = 1_000_000;
pub const DEFAULT_CLUSTER_THRESHOLD: usize = 100;
pub const DEFAULT_SEED: u64 = 1;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },

    #[error("Invalid reference sequence: {0}")]
    InvalidReference(#[from] SequenceError),

    #[error("Unknown {kind} '{value}' (expected one of: {expected})")]
    UnknownVariant {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// How candidate sequences are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Direct inverse folding for long targets, conservation-guided mutation otherwise.
    #[default]
    Auto,
    Inverse,
    Conservation,
}

impl FromStr for GenerationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "inverse" => Ok(Self::Inverse),
            "conservation" => Ok(Self::Conservation),
            _ => Err(ConfigError::UnknownVariant {
                kind: "generation mode",
                value: s.to_string(),
                expected: "auto, inverse, conservation",
            }),
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Inverse => "inverse",
            Self::Conservation => "conservation",
        })
    }
}

/// How many positions one mutation trial changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationStrategy {
    /// Always the configured mutation count.
    #[default]
    Fixed,
    /// 1, 2 or 3 drawn from the configured weights.
    Random,
}

impl FromStr for MutationStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "random" => Ok(Self::Random),
            _ => Err(ConfigError::UnknownVariant {
                kind: "mutation strategy",
                value: s.to_string(),
                expected: "fixed, random",
            }),
        }
    }
}

impl fmt::Display for MutationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fixed => "fixed",
            Self::Random => "random",
        })
    }
}

/// Inclusive GC-content window, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GcBand {
    pub min: f64,
    pub max: f64,
}

impl GcBand {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, gc_percent: f64) -> bool {
        gc_percent >= self.min && gc_percent <= self.max
    }
}

impl Default for GcBand {
    fn default() -> Self {
        Self::new(DEFAULT_GC_MIN, DEFAULT_GC_MAX)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub mode: GenerationMode,
    pub auto_switch_length: usize,
    pub strategy: MutationStrategy,
    pub mutation_count: usize,
    pub mutation_weights: [f64; 3],
    pub conservation_bias: f64,
    pub inverse_attempt_ceiling: usize,
    pub mutation_attempt_ceiling: usize,
    /// Candidates requested per run, as a multiple of the target variant count.
    pub candidate_multiplier: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConservationConfig {
    pub enabled: bool,
    pub trials: usize,
    pub gc_band: GcBand,
    pub mfe_tolerance: f64,
    pub max_homopolymer_run: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    pub target_count: usize,
    pub gc_band: GcBand,
    pub max_homopolymer_run: usize,
    pub min_probability: f64,
    pub max_diversity: f64,
    pub lmax_threshold: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    /// Pools at least this large are reduced by clustering instead of farthest-point search.
    pub cluster_threshold: usize,
    pub group_size: usize,
    pub group_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesignConfig {
    pub reference: Sequence,
    pub runs: usize,
    pub seed: u64,
    /// Worker threads for parallel tasks; `None` means available cores minus one.
    pub threads: Option<usize>,
    pub generation: GenerationConfig,
    pub conservation: ConservationConfig,
    pub filter: FilterConfig,
    pub selection: SelectionConfig,
}

#[derive(Default, Clone)]
pub struct DesignConfigBuilder {
    reference: Option<Sequence>,
    runs: Option<usize>,
    seed: Option<u64>,
    threads: Option<usize>,
    target_count: Option<usize>,
    candidate_multiplier: Option<usize>,
    mode: Option<GenerationMode>,
    auto_switch_length: Option<usize>,
    strategy: Option<MutationStrategy>,
    mutation_count: Option<usize>,
    mutation_weights: Option<[f64; 3]>,
    conservation_bias: Option<f64>,
    inverse_attempt_ceiling: Option<usize>,
    mutation_attempt_ceiling: Option<usize>,
    conservation_enabled: Option<bool>,
    conservation_trials: Option<usize>,
    conservation_gc_band: Option<GcBand>,
    gc_band: Option<GcBand>,
    mfe_tolerance: Option<f64>,
    max_homopolymer_run: Option<usize>,
    min_probability: Option<f64>,
    max_diversity: Option<f64>,
    lmax_threshold: Option<usize>,
    cluster_threshold: Option<usize>,
    group_size: Option<usize>,
    group_count: Option<usize>,
}

impl DesignConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reference(mut self, reference: Sequence) -> Self {
        self.reference = Some(reference);
        self
    }
    pub fn runs(mut self, runs: usize) -> Self {
        self.runs = Some(runs);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
    pub fn target_count(mut self, count: usize) -> Self {
        self.target_count = Some(count);
        self
    }
    pub fn candidate_multiplier(mut self, multiplier: usize) -> Self {
        self.candidate_multiplier = Some(multiplier);
        self
    }
    pub fn mode(mut self, mode: GenerationMode) -> Self {
        self.mode = Some(mode);
        self
    }
    pub fn auto_switch_length(mut self, length: usize) -> Self {
        self.auto_switch_length = Some(length);
        self
    }
    pub fn strategy(mut self, strategy: MutationStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
    pub fn mutation_count(mut self, count: usize) -> Self {
        self.mutation_count = Some(count);
        self
    }
    pub fn mutation_weights(mut self, weights: [f64; 3]) -> Self {
        self.mutation_weights = Some(weights);
        self
    }
    pub fn conservation_bias(mut self, bias: f64) -> Self {
        self.conservation_bias = Some(bias);
        self
    }
    pub fn inverse_attempt_ceiling(mut self, ceiling: usize) -> Self {
        self.inverse_attempt_ceiling = Some(ceiling);
        self
    }
    pub fn mutation_attempt_ceiling(mut self, ceiling: usize) -> Self {
        self.mutation_attempt_ceiling = Some(ceiling);
        self
    }
    pub fn conservation_enabled(mut self, enabled: bool) -> Self {
        self.conservation_enabled = Some(enabled);
        self
    }
    pub fn conservation_trials(mut self, trials: usize) -> Self {
        self.conservation_trials = Some(trials);
        self
    }
    /// GC window for variants kept by the filter.
    pub fn gc_band(mut self, min: f64, max: f64) -> Self {
        self.gc_band = Some(GcBand::new(min, max));
        self
    }
    /// GC window for single-point mutants during conservation profiling. Wider than the
    /// filter band by default.
    pub fn conservation_gc_band(mut self, min: f64, max: f64) -> Self {
        self.conservation_gc_band = Some(GcBand::new(min, max));
        self
    }
    pub fn mfe_tolerance(mut self, tolerance: f64) -> Self {
        self.mfe_tolerance = Some(tolerance);
        self
    }
    pub fn max_homopolymer_run(mut self, run: usize) -> Self {
        self.max_homopolymer_run = Some(run);
        self
    }
    pub fn min_probability(mut self, probability: f64) -> Self {
        self.min_probability = Some(probability);
        self
    }
    pub fn max_diversity(mut self, diversity: f64) -> Self {
        self.max_diversity = Some(diversity);
        self
    }
    pub fn lmax_threshold(mut self, threshold: usize) -> Self {
        self.lmax_threshold = Some(threshold);
        self
    }
    pub fn cluster_threshold(mut self, threshold: usize) -> Self {
        self.cluster_threshold = Some(threshold);
        self
    }
    pub fn group_size(mut self, size: usize) -> Self {
        self.group_size = Some(size);
        self
    }
    pub fn group_count(mut self, count: usize) -> Self {
        self.group_count = Some(count);
        self
    }

    pub fn build(self) -> Result<DesignConfig, ConfigError> {
        let reference = match self.reference {
            Some(reference) => reference,
            None => DEFAULT_REFERENCE.parse()?,
        };
        if reference.is_empty() {
            return Err(invalid("reference", "sequence is empty"));
        }

        let runs = self.runs.unwrap_or(DEFAULT_RUNS);
        if runs == 0 {
            return Err(invalid("runs", "at least one run is required"));
        }
        if self.threads == Some(0) {
            return Err(invalid("threads", "must be at least 1"));
        }

        let gc_band = validate_band("gc_band", self.gc_band.unwrap_or_default())?;
        let conservation_gc_band = validate_band(
            "conservation_gc_band",
            self.conservation_gc_band.unwrap_or(GcBand::new(
                DEFAULT_CONSERVATION_GC_MIN,
                DEFAULT_CONSERVATION_GC_MAX,
            )),
        )?;

        let max_homopolymer_run = self
            .max_homopolymer_run
            .unwrap_or(DEFAULT_MAX_HOMOPOLYMER_RUN);
        if max_homopolymer_run == 0 {
            return Err(invalid("max_homopolymer_run", "must be at least 1"));
        }

        let mfe_tolerance = self.mfe_tolerance.unwrap_or(DEFAULT_MFE_TOLERANCE);
        if !mfe_tolerance.is_finite() || mfe_tolerance < 0.0 {
            return Err(invalid("mfe_tolerance", "must be a non-negative number"));
        }

        let conservation_bias = self.conservation_bias.unwrap_or(DEFAULT_CONSERVATION_BIAS);
        if !(0.0..=1.0).contains(&conservation_bias) {
            return Err(invalid("conservation_bias", "must lie in [0, 1]"));
        }

        let min_probability = self.min_probability.unwrap_or(DEFAULT_MIN_PROBABILITY);
        if !(0.0..=1.0).contains(&min_probability) {
            return Err(invalid("min_probability", "must lie in [0, 1]"));
        }

        let max_diversity = self.max_diversity.unwrap_or(DEFAULT_MAX_DIVERSITY);
        if max_diversity.is_nan() || max_diversity < 0.0 {
            return Err(invalid("max_diversity", "must be non-negative"));
        }

        let mutation_weights = self.mutation_weights.unwrap_or(DEFAULT_MUTATION_WEIGHTS);
        if mutation_weights
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
            || mutation_weights.iter().sum::<f64>() <= 0.0
        {
            return Err(invalid(
                "mutation_weights",
                "weights must be non-negative with a positive sum",
            ));
        }

        let mutation_count = self.mutation_count.unwrap_or(DEFAULT_MUTATION_COUNT);
        if mutation_count == 0 {
            return Err(invalid("mutation_count", "must be at least 1"));
        }

        let candidate_multiplier = self
            .candidate_multiplier
            .unwrap_or(DEFAULT_CANDIDATE_MULTIPLIER);
        if candidate_multiplier == 0 {
            return Err(invalid("candidate_multiplier", "must be at least 1"));
        }

        let generation = GenerationConfig {
            mode: self.mode.unwrap_or_default(),
            auto_switch_length: self
                .auto_switch_length
                .unwrap_or(DEFAULT_AUTO_SWITCH_LENGTH),
            strategy: self.strategy.unwrap_or_default(),
            mutation_count,
            mutation_weights,
            conservation_bias,
            inverse_attempt_ceiling: self
                .inverse_attempt_ceiling
                .unwrap_or(DEFAULT_INVERSE_ATTEMPT_CEILING),
            mutation_attempt_ceiling: self
                .mutation_attempt_ceiling
                .unwrap_or(DEFAULT_MUTATION_ATTEMPT_CEILING),
            candidate_multiplier,
        };
        let conservation = ConservationConfig {
            enabled: self.conservation_enabled.unwrap_or(true),
            trials: self.conservation_trials.unwrap_or(DEFAULT_CONSERVATION_TRIALS),
            gc_band: conservation_gc_band,
            mfe_tolerance,
            max_homopolymer_run,
        };
        let filter = FilterConfig {
            target_count: self.target_count.unwrap_or(DEFAULT_TARGET_COUNT),
            gc_band,
            max_homopolymer_run,
            min_probability,
            max_diversity,
            lmax_threshold: self.lmax_threshold.unwrap_or(DEFAULT_LMAX_THRESHOLD),
        };
        let selection = SelectionConfig {
            cluster_threshold: self.cluster_threshold.unwrap_or(DEFAULT_CLUSTER_THRESHOLD),
            group_size: self.group_size.unwrap_or(DEFAULT_GROUP_SIZE),
            group_count: self.group_count.unwrap_or(DEFAULT_GROUP_COUNT),
        };

        Ok(DesignConfig {
            reference,
            runs,
            seed: self.seed.unwrap_or(DEFAULT_SEED),
            threads: self.threads,
            generation,
            conservation,
            filter,
            selection,
        })
    }
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        parameter,
        reason: reason.into(),
    }
}

fn validate_band(parameter: &'static str, band: GcBand) -> Result<GcBand, ConfigError> {
    if !(0.0..=100.0).contains(&band.min) || !(0.0..=100.0).contains(&band.max) || band.min > band.max
    {
        return Err(invalid(
            parameter,
            format!(
                "expected 0 <= min <= max <= 100, got [{}, {}]",
                band.min, band.max
            ),
        ));
    }
    Ok(band)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_historical_constants() {
        let config = DesignConfigBuilder::new().build().unwrap();
        assert_eq!(config.reference.to_string(), DEFAULT_REFERENCE);
        assert_eq!(config.runs, 10);
        assert_eq!(config.filter.target_count, 50);
        assert_eq!(config.filter.lmax_threshold, 10);
        assert_eq!(config.filter.gc_band, GcBand::new(40.0, 60.0));
        assert_eq!(config.conservation.gc_band, GcBand::new(30.0, 70.0));
        assert_eq!(config.filter.max_homopolymer_run, 3);
        assert_eq!(config.generation.mode, GenerationMode::Auto);
        assert_eq!(config.generation.strategy, MutationStrategy::Fixed);
        assert_eq!(config.generation.mutation_weights, [70.0, 25.0, 5.0]);
        assert_eq!(config.selection.group_size, 12);
        assert_eq!(config.selection.group_count, 1);
        assert!(config.conservation.enabled);
        assert_eq!(config.threads, None);
    }

    #[test]
    fn gc_band_must_be_ordered() {
        let err = DesignConfigBuilder::new()
            .gc_band(70.0, 30.0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                parameter: "gc_band",
                ..
            }
        ));
    }

    #[test]
    fn conservation_band_is_independent_of_filter_band() {
        let config = DesignConfigBuilder::new()
            .gc_band(45.0, 55.0)
            .conservation_gc_band(20.0, 80.0)
            .build()
            .unwrap();
        assert_eq!(config.filter.gc_band, GcBand::new(45.0, 55.0));
        assert_eq!(config.conservation.gc_band, GcBand::new(20.0, 80.0));

        let err = DesignConfigBuilder::new()
            .conservation_gc_band(80.0, 20.0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                parameter: "conservation_gc_band",
                ..
            }
        ));
    }

    #[test]
    fn bias_outside_unit_interval_is_rejected() {
        assert!(DesignConfigBuilder::new().conservation_bias(1.5).build().is_err());
        assert!(DesignConfigBuilder::new().conservation_bias(0.0).build().is_ok());
    }

    #[test]
    fn zero_runs_and_zero_weights_are_rejected() {
        assert!(DesignConfigBuilder::new().runs(0).build().is_err());
        assert!(
            DesignConfigBuilder::new()
                .mutation_weights([0.0, 0.0, 0.0])
                .build()
                .is_err()
        );
    }

    #[test]
    fn zero_group_parameters_are_allowed() {
        let config = DesignConfigBuilder::new()
            .group_size(0)
            .group_count(0)
            .build()
            .unwrap();
        assert_eq!(config.selection.group_size, 0);
    }

    #[test]
    fn modes_and_strategies_parse_case_insensitively() {
        assert_eq!("AUTO".parse::<GenerationMode>().unwrap(), GenerationMode::Auto);
        assert_eq!(
            " conservation ".parse::<GenerationMode>().unwrap(),
            GenerationMode::Conservation
        );
        assert_eq!("Random".parse::<MutationStrategy>().unwrap(), MutationStrategy::Random);
        assert!("greedy".parse::<GenerationMode>().is_err());
        assert_eq!(GenerationMode::Inverse.to_string(), "inverse");
    }

    #[test]
    fn gc_band_is_inclusive() {
        let band = GcBand::new(40.0, 60.0);
        assert!(band.contains(40.0));
        assert!(band.contains(60.0));
        assert!(!band.contains(60.1));
    }
}
