//! Change-Feed Reader. Streams change events for one table since a
//! given versionstamp, reporting the max versionstamp observed. Never
//! retries; database errors propagate verbatim as [`Error::Upstream`].

use crate::database::Database;
use crate::error::CResult;
use crate::model::{ChangeEntry, Versionstamp};

/// Returns entries with `versionstamp > since_vs`, in non-decreasing
/// versionstamp order, along with the max versionstamp observed. The max
/// equals `since_vs` only when the feed yielded nothing.
pub async fn scan(
    db: &mut dyn Database,
    table: &str,
    since_vs: Versionstamp,
) -> CResult<(Vec<ChangeEntry>, Versionstamp)> {
    let entries = db.show_changes(table, since_vs).await?;
    let max_vs = entries.iter().map(|e| e.versionstamp).max().unwrap_or(since_vs);
    Ok((entries, max_vs))
}
