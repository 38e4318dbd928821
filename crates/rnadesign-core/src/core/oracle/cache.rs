use super::{FoldResult, FoldingOracle, OracleError, StructureConfidence};
use crate::core::models::{Sequence, Structure};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

const FOLD_TABLE: &str = "fold.csv";
const INVERSE_TABLE: &str = "inverse.csv";
const CONFIDENCE_TABLE: &str = "confidence.csv";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error at '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cache table '{path}' could not be written: {source}", path = path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct FoldRecord {
    sequence: Sequence,
    structure: Structure,
    mfe: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct InverseRecord {
    target: Structure,
    seed: Sequence,
    sequence: Sequence,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfidenceRecord {
    sequence: Sequence,
    target: Structure,
    probability: f64,
    diversity: f64,
}

/// Exact-key memo tables for the three oracle operations.
///
/// Entries never expire. The cache is constructed once per run by the caller, lent to
/// a [`CachedOracle`], and optionally flushed with [`OracleCache::save`] at shutdown.
#[derive(Debug, Default)]
pub struct OracleCache {
    folds: RwLock<HashMap<Sequence, FoldResult>>,
    inversions: RwLock<HashMap<(Structure, Sequence), Sequence>>,
    confidences: RwLock<HashMap<(Sequence, Structure), StructureConfidence>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl OracleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads whatever tables exist under `dir`. Missing or unreadable tables start empty.
    pub fn load(dir: &Path) -> Self {
        let cache = Self::new();
        {
            let mut folds = write_lock(&cache.folds);
            for r in read_table::<FoldRecord>(&dir.join(FOLD_TABLE)) {
                folds.insert(
                    r.sequence,
                    FoldResult {
                        structure: r.structure,
                        mfe: r.mfe,
                    },
                );
            }
        }
        {
            let mut inversions = write_lock(&cache.inversions);
            for r in read_table::<InverseRecord>(&dir.join(INVERSE_TABLE)) {
                inversions.insert((r.target, r.seed), r.sequence);
            }
        }
        {
            let mut confidences = write_lock(&cache.confidences);
            for r in read_table::<ConfidenceRecord>(&dir.join(CONFIDENCE_TABLE)) {
                confidences.insert(
                    (r.sequence, r.target),
                    StructureConfidence {
                        probability: r.probability,
                        diversity: r.diversity,
                    },
                );
            }
        }
        info!(entries = cache.len(), dir = %dir.display(), "Oracle cache loaded.");
        cache
    }

    pub fn save(&self, dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(dir).map_err(|source| CacheError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        {
            let folds = read_lock(&self.folds);
            write_table(
                &dir.join(FOLD_TABLE),
                folds.iter().map(|(sequence, fold)| FoldRecord {
                    sequence: sequence.clone(),
                    structure: fold.structure.clone(),
                    mfe: fold.mfe,
                }),
            )?;
        }
        {
            let inversions = read_lock(&self.inversions);
            write_table(
                &dir.join(INVERSE_TABLE),
                inversions
                    .iter()
                    .map(|((target, seed), sequence)| InverseRecord {
                        target: target.clone(),
                        seed: seed.clone(),
                        sequence: sequence.clone(),
                    }),
            )?;
        }
        {
            let confidences = read_lock(&self.confidences);
            write_table(
                &dir.join(CONFIDENCE_TABLE),
                confidences
                    .iter()
                    .map(|((sequence, target), c)| ConfidenceRecord {
                        sequence: sequence.clone(),
                        target: target.clone(),
                        probability: c.probability,
                        diversity: c.diversity,
                    }),
            )?;
        }

        info!(entries = self.len(), dir = %dir.display(), "Oracle cache saved.");
        Ok(())
    }

    pub fn len(&self) -> usize {
        read_lock(&self.folds).len()
            + read_lock(&self.inversions).len()
            + read_lock(&self.confidences).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn lookup<K: Eq + Hash, V: Clone>(&self, table: &RwLock<HashMap<K, V>>, key: &K) -> Option<V> {
        let found = read_lock(table).get(key).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_table<R: DeserializeOwned>(path: &Path) -> Vec<R> {
    if !path.exists() {
        debug!(path = %path.display(), "No cache table found; starting empty.");
        return Vec::new();
    }
    let reader = match csv::Reader::from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not open cache table; ignoring it.");
            return Vec::new();
        }
    };
    let mut records = Vec::new();
    for row in reader.into_deserialize::<R>() {
        match row {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt cache table; discarding it.");
                return Vec::new();
            }
        }
    }
    records
}

fn write_table<R: Serialize>(
    path: &Path,
    records: impl Iterator<Item = R>,
) -> Result<(), CacheError> {
    let csv_err = |source: csv::Error| CacheError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for record in records {
        writer.serialize(record).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// A [`FoldingOracle`] that consults an [`OracleCache`] before delegating.
///
/// Only successful results are memoized; failures are retried on the next call.
pub struct CachedOracle<'a, O: ?Sized> {
    inner: &'a O,
    cache: &'a OracleCache,
}

impl<'a, O: FoldingOracle + ?Sized> CachedOracle<'a, O> {
    pub fn new(inner: &'a O, cache: &'a OracleCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &OracleCache {
        self.cache
    }
}

impl<O: FoldingOracle + ?Sized> FoldingOracle for CachedOracle<'_, O> {
    fn fold(&self, sequence: &Sequence) -> Result<FoldResult, OracleError> {
        if let Some(hit) = self.cache.lookup(&self.cache.folds, sequence) {
            return Ok(hit);
        }
        let result = self.inner.fold(sequence)?;
        write_lock(&self.cache.folds).insert(sequence.clone(), result.clone());
        Ok(result)
    }

    fn inverse_fold(&self, target: &Structure, seed: &Sequence) -> Result<Sequence, OracleError> {
        let key = (target.clone(), seed.clone());
        if let Some(hit) = self.cache.lookup(&self.cache.inversions, &key) {
            return Ok(hit);
        }
        let result = self.inner.inverse_fold(target, seed)?;
        write_lock(&self.cache.inversions).insert(key, result.clone());
        Ok(result)
    }

    fn structure_confidence(
        &self,
        sequence: &Sequence,
        target: &Structure,
    ) -> Result<StructureConfidence, OracleError> {
        let key = (sequence.clone(), target.clone());
        if let Some(hit) = self.cache.lookup(&self.cache.confidences, &key) {
            return Ok(hit);
        }
        let result = self.inner.structure_confidence(sequence, target)?;
        write_lock(&self.cache.confidences).insert(key, result);
        Ok(result)
    }
}
