use std::path::{Path, PathBuf};

use serde_derive::{Deserialize, Serialize};

/// Settings loaded from a config file and layered underneath whatever the
/// user passes on the command line. Parsing failures fall back to
/// [`Default`] rather than aborting -- a missing or malformed config file
/// is not fatal, it just means the defaults apply.
#[derive(Debug, Serialize, Deserialize)]
pub struct CliSettings {
    pub log_level: String,

    /// Default output directory used when a subcommand doesn't override it.
    pub default_output_dir: Option<PathBuf>,
}

impl Default for CliSettings {
    fn default() -> Self {
        CliSettings { log_level: "info".to_string(), default_output_dir: None }
    }
}

impl CliSettings {
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(body) => match serde_json::from_str(&body) {
                Ok(settings) => settings,
                Err(err) => {
                    log::warn!("failed to parse config file {}: {err}, using defaults", path.display());
                    CliSettings::default()
                }
            },
            Err(_) => CliSettings::default(),
        }
    }
}
