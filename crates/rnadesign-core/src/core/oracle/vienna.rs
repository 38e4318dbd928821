use super::{FoldResult, FoldingOracle, OracleError, StructureConfidence};
use crate::core::models::{Sequence, Structure};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::trace;

/// Gas constant in kcal/(mol·K).
const GAS_CONSTANT: f64 = 0.0019872;
const CELSIUS_TO_KELVIN: f64 = 273.15;

/// MFE folding without the structure drawing.
const FOLD_ARGS: &[&str] = &["--noPS"];
/// Partition function without the structure drawing or the dot plot.
const PARTITION_ARGS: &[&str] = &["-p", "--noPS", "--noDP"];

/// Drives the ViennaRNA command-line programs (`RNAfold`, `RNAinverse`, `RNAeval`).
///
/// Each call spawns one process and talks to it over stdin/stdout, so the adapter is
/// trivially `Sync` and can be shared between workers.
#[derive(Debug, Clone)]
pub struct ViennaOracle {
    rnafold: PathBuf,
    rnainverse: PathBuf,
    rnaeval: PathBuf,
    temperature_celsius: f64,
}

impl Default for ViennaOracle {
    fn default() -> Self {
        Self {
            rnafold: PathBuf::from("RNAfold"),
            rnainverse: PathBuf::from("RNAinverse"),
            rnaeval: PathBuf::from("RNAeval"),
            temperature_celsius: 37.0,
        }
    }
}

impl ViennaOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves all three executables inside `dir` instead of `$PATH`.
    pub fn with_bin_dir(mut self, dir: &Path) -> Self {
        self.rnafold = dir.join("RNAfold");
        self.rnainverse = dir.join("RNAinverse");
        self.rnaeval = dir.join("RNAeval");
        self
    }

    pub fn with_temperature(mut self, celsius: f64) -> Self {
        self.temperature_celsius = celsius;
        self
    }

    pub fn temperature(&self) -> f64 {
        self.temperature_celsius
    }

    fn kt(&self) -> f64 {
        GAS_CONSTANT * (self.temperature_celsius + CELSIUS_TO_KELVIN)
    }

    fn invoke(&self, program: &Path, args: &[&str], input: &str) -> Result<String, OracleError> {
        let temperature = self.temperature_celsius.to_string();
        let mut child = Command::new(program)
            .args(args)
            .args(["-T", temperature.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| OracleError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .map_err(|source| OracleError::Spawn {
                    program: program.to_path_buf(),
                    source,
                })?;
        }

        let output = child
            .wait_with_output()
            .map_err(|source| OracleError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            return Err(OracleError::ExitStatus {
                program: program.to_path_buf(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!(program = %program.display(), %stdout, "Oracle output received.");
        Ok(stdout)
    }
}

impl FoldingOracle for ViennaOracle {
    fn fold(&self, sequence: &Sequence) -> Result<FoldResult, OracleError> {
        let stdout = self.invoke(&self.rnafold, FOLD_ARGS, &format!("{sequence}\n"))?;
        parse_fold_output(&stdout, sequence.len()).map_err(|message| OracleError::Parse {
            program: self.rnafold.clone(),
            message,
        })
    }

    fn inverse_fold(&self, target: &Structure, seed: &Sequence) -> Result<Sequence, OracleError> {
        let stdout = self.invoke(&self.rnainverse, &[], &format!("{target}\n{seed}\n@\n"))?;
        let (candidate, distance) =
            parse_inverse_output(&stdout).map_err(|message| OracleError::Parse {
                program: self.rnainverse.clone(),
                message,
            })?;
        if distance > 0 {
            return Err(OracleError::NotConverged { distance });
        }
        Ok(candidate.parse()?)
    }

    fn structure_confidence(
        &self,
        sequence: &Sequence,
        target: &Structure,
    ) -> Result<StructureConfidence, OracleError> {
        let pf = self.invoke(&self.rnafold, PARTITION_ARGS, &format!("{sequence}\n"))?;
        let (ensemble_energy, diversity) =
            parse_partition_output(&pf, sequence.len()).map_err(|message| {
                OracleError::Parse {
                    program: self.rnafold.clone(),
                    message,
                }
            })?;

        let eval = self.invoke(&self.rnaeval, &[], &format!("{sequence}\n{target}\n"))?;
        let probability = match parse_fold_output(&eval, sequence.len()) {
            Ok(evaluated) => {
                ((ensemble_energy - evaluated.mfe) / self.kt()).exp().clamp(0.0, 1.0)
            }
            // The sequence cannot form the target at all.
            Err(_) => 0.0,
        };
        Ok(StructureConfidence {
            probability,
            diversity,
        })
    }
}

fn content_lines(output: &str) -> impl Iterator<Item = &str> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty() && !l.starts_with('>'))
}

fn strip_delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text[start..].find(close)? + start;
    Some(text[start + 1..end].trim())
}

/// Parses `SEQUENCE\nSTRUCTURE ( ENERGY)` as printed by `RNAfold` and `RNAeval`.
fn parse_fold_output(output: &str, length: usize) -> Result<FoldResult, String> {
    let line = content_lines(output)
        .nth(1)
        .ok_or_else(|| "missing structure line".to_string())?;
    if line.len() < length {
        return Err(format!("structure line too short: '{line}'"));
    }
    let (structure, rest) = line.split_at(length);
    let structure: Structure = structure.parse().map_err(|e| format!("{e}"))?;
    let energy = strip_delimited(rest, '(', ')')
        .ok_or_else(|| format!("missing energy in '{line}'"))?
        .parse::<f64>()
        .map_err(|e| format!("bad energy in '{line}': {e}"))?;
    Ok(FoldResult {
        structure,
        mfe: energy,
    })
}

/// Extracts the ensemble free energy and ensemble diversity from `RNAfold -p` output.
fn parse_partition_output(output: &str, length: usize) -> Result<(f64, f64), String> {
    let mut ensemble_energy = None;
    let mut diversity = None;
    for line in content_lines(output) {
        if let Some(idx) = line.find("ensemble diversity") {
            let value = line[idx + "ensemble diversity".len()..]
                .trim()
                .trim_end_matches(';');
            diversity = value.parse::<f64>().ok();
        } else if line.len() > length && line[length..].trim_start().starts_with('[') {
            ensemble_energy = strip_delimited(&line[length..], '[', ']')
                .and_then(|v| v.parse::<f64>().ok());
        }
    }
    match (ensemble_energy, diversity) {
        (Some(e), Some(d)) => Ok((e, d)),
        (None, _) => Err("missing ensemble free energy".to_string()),
        (_, None) => Err("missing ensemble diversity".to_string()),
    }
}

/// Returns the designed sequence and its residual structure distance.
fn parse_inverse_output(output: &str) -> Result<(String, usize), String> {
    let line = content_lines(output)
        .filter(|l| {
            l.split_whitespace()
                .next()
                .is_some_and(|t| t.chars().all(|c| "ACGUTacgut".contains(c)))
        })
        .last()
        .ok_or_else(|| "no designed sequence in output".to_string())?;
    let mut tokens = line.split_whitespace();
    let sequence = tokens
        .next()
        .ok_or_else(|| "empty design line".to_string())?
        .to_ascii_uppercase();
    let distance = tokens
        .filter_map(|t| t.parse::<usize>().ok())
        .next_back()
        .unwrap_or(0);
    Ok((sequence, distance))
}
