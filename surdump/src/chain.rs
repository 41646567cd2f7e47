//! Chain Builder & Validator. Assembles manifests scattered across a
//! directory into contiguous full+incremental sequences and answers the two
//! questions restore tooling needs: "what are the possible restore points?"
//! and "which artifacts do I need for versionstamp V?".

use crate::error::{CResult, Error};
use crate::manifest::Manifest;
use crate::model::{ArtifactKind, Versionstamp};

#[derive(Debug, Clone)]
pub struct Chain {
    pub full: Manifest,
    pub increments: Vec<Manifest>,
}

impl Chain {
    pub fn total_size(&self) -> u64 {
        self.full.size + self.increments.iter().map(|m| m.size).sum::<u64>()
    }

    pub fn latest_versionstamp(&self) -> Versionstamp {
        self.increments
            .last()
            .map(|m| m.end_versionstamp)
            .unwrap_or(self.full.end_versionstamp)
    }
}

/// Groups `manifests` by `(namespace, database)` and, within each group,
/// greedily grows one chain per FULL manifest by repeatedly picking an
/// unused INCREMENTAL whose `start_versionstamp` matches the chain's
/// current end. Ties (more than one incremental starting at the same
/// versionstamp) are broken deterministically by `(created_at, filename)`
/// ascending -- a well-formed directory never produces a tie, so this is
/// a defensive rule, not a feature.
///
/// Returns the assembled chains alongside every manifest that ended up in
/// no chain at all (a FULL with nothing using it is not an orphan; an
/// INCREMENTAL nobody claimed is).
pub fn build(manifests: Vec<Manifest>) -> (Vec<Chain>, Vec<Manifest>) {
    use std::collections::BTreeMap;

    let mut groups: BTreeMap<(String, String), Vec<Manifest>> = BTreeMap::new();
    for m in manifests {
        groups
            .entry((m.namespace.clone(), m.database.clone()))
            .or_default()
            .push(m);
    }

    let mut chains = Vec::new();
    let mut orphans = Vec::new();

    for (_, group) in groups {
        let mut fulls: Vec<Manifest> = Vec::new();
        let mut increments: Vec<Manifest> = Vec::new();
        for m in group {
            match m.kind {
                ArtifactKind::Full => fulls.push(m),
                ArtifactKind::Incremental => increments.push(m),
            }
        }

        let mut used = vec![false; increments.len()];
        for full in fulls {
            let mut current_end = full.end_versionstamp;
            let mut chain_increments = Vec::new();
            loop {
                let candidate = increments
                    .iter()
                    .enumerate()
                    .filter(|(i, m)| !used[*i] && m.start_versionstamp == current_end)
                    .min_by(|(_, a), (_, b)| {
                        (a.created_at, &a.filename).cmp(&(b.created_at, &b.filename))
                    })
                    .map(|(i, _)| i);

                match candidate {
                    Some(i) => {
                        used[i] = true;
                        current_end = increments[i].end_versionstamp;
                        chain_increments.push(increments[i].clone());
                    }
                    None => break,
                }
            }
            chains.push(Chain { full, increments: chain_increments });
        }

        orphans.extend(
            increments
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !used[*i])
                .map(|(_, m)| m),
        );
    }

    (chains, orphans)
}

/// Enforces the chain invariants: the full must start at 0, every
/// incremental's start must equal the prior artifact's end, and no
/// non-incremental may appear after the full.
pub fn validate(chain: &Chain) -> CResult<()> {
    if chain.full.kind != ArtifactKind::Full {
        return Err(Error::Shape(format!(
            "{} heads a chain but is not a FULL manifest",
            chain.full.filename
        )));
    }
    if chain.full.start_versionstamp != 0 {
        return Err(Error::Shape(format!(
            "{} is the chain head but does not start at versionstamp 0",
            chain.full.filename
        )));
    }

    let mut current_end = chain.full.end_versionstamp;
    for inc in &chain.increments {
        if inc.kind != ArtifactKind::Incremental {
            return Err(Error::Type(format!("{} follows the full but is not INCREMENTAL", inc.filename)));
        }
        if inc.start_versionstamp != current_end {
            return Err(Error::Gap { expected: current_end, got: inc.start_versionstamp });
        }
        current_end = inc.end_versionstamp;
    }
    Ok(())
}

/// The ordered set of versionstamps this chain can restore to: the full's
/// end, then each incremental's end in chain order.
pub fn restore_points(chain: &Chain) -> Vec<Versionstamp> {
    std::iter::once(chain.full.end_versionstamp)
        .chain(chain.increments.iter().map(|m| m.end_versionstamp))
        .collect()
}

/// The minimal ordered artifact list needed to restore `chain` to
/// `target_vs`: the full, plus every incremental whose end is `<=
/// target_vs`, in chain order.
///
/// `target_vs` need not be an exact restore point -- landing strictly
/// between two increments' ends silently yields the shorter prefix rather
/// than an error, on the reasoning that a caller asking for "as of V" wants
/// the newest state not newer than V, not a proof that V was itself ever a
/// flush boundary.
pub fn manifests_for(chain: &Chain, target_vs: Versionstamp) -> CResult<Vec<&Manifest>> {
    if target_vs < chain.full.end_versionstamp {
        return Err(Error::BeforeBase { target: target_vs, base: chain.full.end_versionstamp });
    }
    let mut out = vec![&chain.full];
    for inc in &chain.increments {
        if inc.end_versionstamp <= target_vs {
            out.push(inc);
        }
    }
    Ok(out)
}
