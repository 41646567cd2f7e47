//! Versionstamp Probe. The database never returns a transaction's
//! commit versionstamp directly, but change-feed events are stamped, so the
//! probe induces a fresh stamped event on a throw-away table and reads it
//! back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::sleep;

use crate::config::MIN_CHANGE_FEED_RETENTION;
use crate::database::Database;
use crate::error::{CResult, Error};
use crate::model::Versionstamp;

const PROBE_RETRIES: u32 = 10;
const PROBE_BACKOFF: Duration = Duration::from_millis(50);

static PROBE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn disposable_table_name() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = PROBE_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("__surdump_probe_{nanos}_{seq}")
}

/// Obtains a versionstamp strictly greater than any versionstamp produced by
/// a transaction that committed-and-returned before this call was made.
///
/// `running` is checked before every database call and on every poll-loop
/// wake: when it flips to `false` the probe stops issuing new calls and
/// returns `Error::Canceled`.
pub async fn probe(
    db: &mut dyn Database,
    ns: &str,
    database: &str,
    running: &std::sync::atomic::AtomicBool,
) -> CResult<Versionstamp> {
    check_running(running)?;

    // Step 1: verify a namespace/database is selected.
    db.use_namespace(ns, database).await?;
    db.exec("INFO FOR DB", &[]).await.map_err(|_| {
        Error::Config("no namespace/database selected before probing for a versionstamp".into())
    })?;

    let table = disposable_table_name();

    // Step 3: create/overwrite the throw-away table with a change feed.
    db.ensure_change_feed(&table, MIN_CHANGE_FEED_RETENTION).await?;

    let result = run_probe(db, &table, running).await;

    // Step 7: guaranteed cleanup, best-effort, never fails the probe.
    if let Err(err) = db.remove_table(&table).await {
        log::warn!("probe: failed to drop disposable table {table}: {err}");
    }

    result
}

async fn run_probe(
    db: &mut dyn Database,
    table: &str,
    running: &std::sync::atomic::AtomicBool,
) -> CResult<Versionstamp> {
    check_running(running)?;

    // Step 4: insert one marker row, asserting a non-empty result.
    let marker = serde_json::json!({ "id": "marker" });
    let inserted = db.exec(&format!("INSERT INTO {table}"), &[marker]).await?;
    if inserted.is_empty() {
        return Err(Error::Probe { last_cause: "insert returned no rows".into() });
    }

    // Step 5: re-select to assert row presence (best-effort; failure here is
    // folded into the retry loop below like any other observed cause).
    let _ = db.exec(&format!("SELECT * FROM {table}"), &[]).await;

    // Step 6: poll the change feed for the stamped marker event.
    let mut last_cause = "no change-feed events observed yet".to_string();
    for attempt in 0..PROBE_RETRIES {
        check_running(running)?;

        match db.show_changes(table, 0).await {
            Ok(entries) => {
                if let Some(entry) = entries.first() {
                    return Ok(entry.versionstamp);
                }
                last_cause = "change feed empty".to_string();
            }
            Err(err) => {
                last_cause = err.to_string();
            }
        }

        if attempt + 1 < PROBE_RETRIES {
            sleep(PROBE_BACKOFF).await;
        }
    }

    Err(Error::Probe { last_cause })
}

fn check_running(running: &std::sync::atomic::AtomicBool) -> CResult<()> {
    if running.load(Ordering::SeqCst) {
        Ok(())
    } else {
        Err(Error::Canceled)
    }
}
