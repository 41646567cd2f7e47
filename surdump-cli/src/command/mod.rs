use std::path::PathBuf;

use clap::Subcommand;

/// The various kinds of commands `surdumpcli` can execute.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Take a full, consistent backup of every configured table.
    Full {
        /// Namespace to back up.
        #[clap(long)]
        namespace: String,

        /// Database to back up.
        #[clap(long)]
        database: String,

        /// Directory the artifact and its manifest sidecar are written into.
        #[clap(long = "output-dir", default_value = ".")]
        output_dir: PathBuf,

        /// Filename for the artifact, relative to `output-dir`.
        #[clap(long, default_value = "full.dump")]
        filename: String,

        /// Restrict the dump to these tables; omit to discover every table.
        #[clap(long = "table")]
        tables: Option<Vec<String>>,

        /// JSON seed file loaded into the bundled in-memory reference
        /// database before the dump runs. A production deployment supplies
        /// its own `Database` implementation instead of this flag.
        #[clap(long)]
        seed: Option<PathBuf>,
    },

    /// Capture every change since a prior restore point.
    Incremental {
        #[clap(long)]
        namespace: String,

        #[clap(long)]
        database: String,

        #[clap(long = "output-dir", default_value = ".")]
        output_dir: PathBuf,

        #[clap(long, default_value = "incremental.dump")]
        filename: String,

        #[clap(long = "table")]
        tables: Option<Vec<String>>,

        /// Versionstamp to capture changes since -- the prior chain's
        /// latest restore point.
        #[clap(long)]
        since: u64,

        #[clap(long)]
        seed: Option<PathBuf>,
    },

    /// Assemble and print every backup chain found under a directory.
    Chains {
        /// Directory to scan, recursively, for artifact/manifest pairs.
        dir: PathBuf,
    },
}
