//! Config injection for a single dump operation. Flag parsing and file
//! loading are the CLI's job; this struct is the shape both the CLI and any
//! embedder populate before calling into [`crate::engine`].

use std::path::PathBuf;
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

use crate::error::{CResult, Error};

/// One hour, the conservative minimum retention the probe and full-dump
/// protocols request when enabling change feeds.
pub const MIN_CHANGE_FEED_RETENTION: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpConfig {
    pub namespace: String,
    pub database: String,

    /// Destination directory for the artifact + manifest sidecar.
    pub output_dir: PathBuf,

    /// Explicit table set. `None` means "discover via the database's
    /// metadata".
    #[serde(default)]
    pub tables: Option<Vec<String>>,

    /// Retention requested when the engine ensures change feeds exist.
    #[serde(default = "default_retention_secs")]
    pub change_feed_retention_secs: u64,
}

fn default_retention_secs() -> u64 {
    MIN_CHANGE_FEED_RETENTION.as_secs()
}

impl DumpConfig {
    pub fn validate(&self) -> CResult<()> {
        if self.namespace.trim().is_empty() {
            return Err(Error::Config("namespace must not be empty".into()));
        }
        if self.database.trim().is_empty() {
            return Err(Error::Config("database must not be empty".into()));
        }
        Ok(())
    }

    pub fn change_feed_retention(&self) -> Duration {
        Duration::from_secs(self.change_feed_retention_secs).max(MIN_CHANGE_FEED_RETENTION)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_empty_namespace_or_database() {
        let cfg = DumpConfig {
            namespace: "".into(),
            database: "db".into(),
            output_dir: PathBuf::from("."),
            tables: None,
            change_feed_retention_secs: default_retention_secs(),
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn retention_is_floored_at_the_conservative_minimum() {
        let cfg = DumpConfig {
            namespace: "ns".into(),
            database: "db".into(),
            output_dir: PathBuf::from("."),
            tables: None,
            change_feed_retention_secs: 5,
        };
        assert_eq!(cfg.change_feed_retention(), MIN_CHANGE_FEED_RETENTION);
    }
}
