use thiserror::Error;

use crate::model::Versionstamp;

/// Errors produced by the backup engine. Variants map 1:1 onto the error
/// taxonomy of the consistent-dump protocol: each represents a distinct
/// failure *kind* a caller needs to branch on, not an implementation detail.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing required config: namespace/database/output/since when no chain is present.
    #[error("config error: {0}")]
    Config(String),

    /// Database handshake problems.
    #[error("connect error: {0}")]
    Connect(String),

    /// Database handshake problems, auth specifically.
    #[error("auth error: {0}")]
    Auth(String),

    /// Any error returned by the database mid-operation, with the offending query identified.
    #[error("upstream error running {query:?}: {source}")]
    Upstream { query: String, source: String },

    /// The versionstamp probe could not obtain a versionstamp within its bounded retry budget.
    #[error("probe failed after exhausting retries: {last_cause}")]
    Probe { last_cause: String },

    /// An incremental dump captured zero new changes and refuses to write one.
    #[error("incremental dump would be empty, refusing to write an artifact")]
    EmptyIncremental,

    /// Manifest missing, malformed, or violating the data-model invariants.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Chain assembly found a gap between adjacent manifests.
    #[error("gap in chain: expected start versionstamp {expected}, got {got}")]
    Gap { expected: Versionstamp, got: Versionstamp },

    /// Chain assembly found a malformed chain shape (missing full, bad order).
    #[error("malformed chain: {0}")]
    Shape(String),

    /// Chain assembly found a non-incremental manifest after the full dump.
    #[error("expected an incremental manifest: {0}")]
    Type(String),

    /// Requested restore target precedes the full dump's end versionstamp.
    #[error("restore target {target} precedes full dump end {base}")]
    BeforeBase { target: Versionstamp, base: Versionstamp },

    /// Cooperative cancellation was observed mid-operation.
    #[error("operation canceled")]
    Canceled,

    /// Internal invariant violation not covered by a more specific variant above.
    #[error("internal error: {0}")]
    Internal(String),

    /// A value failed to parse/deserialize.
    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type CResult<T> = Result<T, Error>;
