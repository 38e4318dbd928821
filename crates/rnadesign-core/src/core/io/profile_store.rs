use crate::core::models::{ConservationProfile, Sequence};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ProfileStoreError {
    #[error("I/O error at '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize conservation profile: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Loads a stored profile if it was computed for exactly `reference`.
///
/// A missing, unreadable or mismatched file is treated as a cache miss.
pub fn load_profile(path: &Path, reference: &Sequence) -> Option<ConservationProfile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<ConservationProfile>(&content) {
        Ok(profile) if profile.matches(reference) && profile.len() == reference.len() => {
            debug!(path = %path.display(), "Reusing stored conservation profile.");
            Some(profile)
        }
        Ok(_) => {
            debug!(path = %path.display(), "Stored profile belongs to another reference.");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable conservation profile.");
            None
        }
    }
}

pub fn save_profile(path: &Path, profile: &ConservationProfile) -> Result<(), ProfileStoreError> {
    let text = toml::to_string(profile)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ProfileStoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, text).map_err(|source| ProfileStoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Base, SiteCounts};
    use tempfile::tempdir;

    fn profile_for(reference: &str) -> ConservationProfile {
        let reference: Sequence = reference.parse().unwrap();
        let sites = reference.bases().iter().map(|&b| SiteCounts::empty(b)).collect();
        ConservationProfile::from_sites(reference, sites)
    }

    #[test]
    fn saved_profile_is_reloaded_for_same_reference() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("profile.toml");
        let profile = profile_for("ACGU");
        save_profile(&path, &profile).unwrap();

        let loaded = load_profile(&path, &"ACGU".parse().unwrap()).unwrap();
        assert_eq!(loaded, profile);
        assert_eq!(loaded.sites[0].alternatives, [Base::C, Base::G, Base::U]);
    }

    #[test]
    fn stored_profile_for_other_reference_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.toml");
        save_profile(&path, &profile_for("ACGU")).unwrap();
        assert!(load_profile(&path, &"ACGA".parse().unwrap()).is_none());
    }

    #[test]
    fn missing_file_is_a_miss() {
        let dir = tempdir().unwrap();
        assert!(load_profile(&dir.path().join("none.toml"), &"A".parse().unwrap()).is_none());
    }
}
