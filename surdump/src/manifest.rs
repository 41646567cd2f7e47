//! Manifest Store. Sidecar metadata for an artifact, serialized as a
//! single JSON object: the same "parse with serde, persist as a
//! human-readable object" idiom the CLI's own config loader uses, applied
//! here to per-artifact metadata instead of CLI settings.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

use crate::error::{CResult, Error};
use crate::model::{ArtifactKind, Versionstamp};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub created_at: DateTime<Utc>,
    pub size: u64,
    pub namespace: String,
    pub database: String,
    pub start_versionstamp: Versionstamp,
    pub end_versionstamp: Versionstamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl Manifest {
    /// Enforces the per-artifact invariants on a manifest in isolation (not
    /// the chain invariants, which [`crate::chain::validate`] owns).
    pub fn validate(&self) -> CResult<()> {
        if self.namespace.trim().is_empty() || self.database.trim().is_empty() {
            return Err(Error::Integrity("namespace and database must be non-empty".into()));
        }
        match self.kind {
            ArtifactKind::Full => {
                if self.start_versionstamp != 0 {
                    return Err(Error::Integrity("FULL manifest must have start_versionstamp = 0".into()));
                }
            }
            ArtifactKind::Incremental => {
                if self.start_versionstamp == 0 {
                    return Err(Error::Integrity(
                        "INCREMENTAL manifest must have start_versionstamp > 0".into(),
                    ));
                }
                if self.end_versionstamp <= self.start_versionstamp {
                    return Err(Error::Integrity(
                        "INCREMENTAL manifest must have end_versionstamp > start_versionstamp".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Returns success iff `self` is an incremental manifest that can extend
    /// a chain currently sitting at `current_vs`.
    pub fn can_apply_incremental(&self, current_vs: Versionstamp) -> CResult<()> {
        if self.kind != ArtifactKind::Incremental {
            return Err(Error::Type(format!("{} is not an incremental manifest", self.filename)));
        }
        if self.start_versionstamp != current_vs {
            return Err(Error::Gap { expected: current_vs, got: self.start_versionstamp });
        }
        Ok(())
    }

    fn sidecar_path(artifact_path: &Path) -> PathBuf {
        let mut name = artifact_path.as_os_str().to_owned();
        name.push(".manifest.json");
        PathBuf::from(name)
    }
}

pub struct ManifestStore;

impl ManifestStore {
    /// Writes `manifest` into `<artifact_path>.manifest.json`, atomically
    /// (write to a temp file in the same directory, then rename).
    pub fn write(manifest: &Manifest, artifact_path: &Path) -> CResult<()> {
        let sidecar = Manifest::sidecar_path(artifact_path);
        let tmp = sidecar.with_extension("manifest.json.tmp");
        let body = serde_json::to_vec_pretty(manifest)?;
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &sidecar)?;
        Ok(())
    }

    /// Reads and validates the manifest sidecar for `artifact_path`. Missing
    /// sidecar is a hard error: an artifact without a manifest is invalid.
    pub fn read(artifact_path: &Path) -> CResult<Manifest> {
        let sidecar = Manifest::sidecar_path(artifact_path);
        let body = std::fs::read(&sidecar)
            .map_err(|_| Error::Integrity(format!("missing manifest sidecar {}", sidecar.display())))?;
        let manifest: Manifest = serde_json::from_slice(&body)?;
        manifest.validate()?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    fn full(namespace: &str, database: &str, end: Versionstamp) -> Manifest {
        Manifest {
            filename: "a.dump".into(),
            kind: ArtifactKind::Full,
            created_at: Utc::now(),
            size: 10,
            namespace: namespace.into(),
            database: database.into(),
            start_versionstamp: 0,
            end_versionstamp: end,
            sha256: Some("deadbeef".into()),
        }
    }

    #[test]
    fn round_trip_read_after_write_equals_the_original_modulo_tz() {
        let dir = tempdir().unwrap();
        let artifact_path = dir.path().join("a.dump");
        std::fs::write(&artifact_path, b"SURDUMP01").unwrap();
        let manifest = full("ns", "db", 200);

        ManifestStore::write(&manifest, &artifact_path).unwrap();
        let read_back = ManifestStore::read(&artifact_path).unwrap();
        assert_eq!(read_back, manifest);
    }

    #[test]
    fn missing_sidecar_is_a_hard_error() {
        let dir = tempdir().unwrap();
        let artifact_path = dir.path().join("orphan.dump");
        std::fs::write(&artifact_path, b"SURDUMP01").unwrap();
        assert!(ManifestStore::read(&artifact_path).is_err());
    }

    #[test]
    fn full_manifest_must_start_at_zero() {
        let mut m = full("ns", "db", 200);
        m.start_versionstamp = 5;
        assert!(m.validate().is_err());
    }

    #[test]
    fn incremental_end_must_exceed_start() {
        let m = Manifest {
            kind: ArtifactKind::Incremental,
            start_versionstamp: 200,
            end_versionstamp: 200,
            ..full("ns", "db", 200)
        };
        assert!(m.validate().is_err());
    }

    #[test]
    fn can_apply_incremental_checks_the_start_versionstamp_gap() {
        let b = Manifest {
            kind: ArtifactKind::Incremental,
            start_versionstamp: 200,
            end_versionstamp: 300,
            ..full("ns", "db", 300)
        };
        assert!(b.can_apply_incremental(200).is_ok());
        assert!(matches!(b.can_apply_incremental(100), Err(Error::Gap { expected: 200, got: 100 })));

        let a = full("ns", "db", 200);
        assert!(matches!(a.can_apply_incremental(200), Err(Error::Type(_))));
    }
}
