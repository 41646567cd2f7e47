//! Directory Scanner. Walks a directory tree, reads every manifest
//! sidecar it can, hands the survivors to the chain builder, and validates
//! every resulting chain before returning.

use std::path::Path;

use walkdir::WalkDir;

use crate::chain::{self, Chain};
use crate::error::{CResult, Error};
use crate::manifest::{Manifest, ManifestStore};

const MANIFEST_SUFFIX: &str = ".manifest.json";

/// Collects every chain rooted under `root`. Files without a readable,
/// valid manifest are treated as invalid artifacts and silently skipped --
/// a stray or partially written file is expected, not exceptional. A
/// single chain that fails validation is fatal: a directory is either a
/// coherent backup history or it is broken, and callers need to know which.
pub fn scan_chains(root: &Path) -> CResult<Vec<Chain>> {
    let manifests = collect_manifests(root);
    let (chains, _orphans) = chain::build(manifests);
    for c in &chains {
        if let Err(err) = chain::validate(c) {
            return Err(Error::Integrity(format!(
                "{}.{}: {err}",
                c.full.namespace, c.full.database
            )));
        }
    }
    Ok(chains)
}

fn collect_manifests(root: &Path) -> Vec<Manifest> {
    let mut manifests = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.ends_with(MANIFEST_SUFFIX) {
            continue;
        }
        if let Ok(manifest) = ManifestStore::read(entry.path()) {
            manifests.push(manifest);
        }
    }
    manifests
}
