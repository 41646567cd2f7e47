//! The external collaborator contract. The engine never talks to a concrete
//! driver directly -- it is handed a `&mut dyn Database` for the lifetime of
//! one dump, exclusively, per the single-owner resource model.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CResult;
use crate::model::{ChangeEntry, Versionstamp};

/// The database contract the engine consumes. Implementations are expected
/// to be thin wrappers around a real client; the engine owns no connection
/// pooling, auth, or retry behavior beyond what's specified per-method below.
#[async_trait]
pub trait Database: Send {
    /// Runs a query, returning tabular rows as JSON objects.
    async fn exec(
        &mut self,
        query: &str,
        params: &[serde_json::Value],
    ) -> CResult<Vec<serde_json::Map<String, serde_json::Value>>>;

    /// Idempotently ensures a change-feed exists on `table` with retention at
    /// least `retention`. Best-effort: implementations may succeed silently
    /// without effect if the feed machinery is degraded.
    async fn ensure_change_feed(&mut self, table: &str, retention: Duration) -> CResult<()>;

    /// Removes a table. Used to clean up the probe's disposable table.
    async fn remove_table(&mut self, table: &str) -> CResult<()>;

    /// Returns change-feed events for `table` strictly after `since`, in
    /// ascending versionstamp order.
    async fn show_changes(&mut self, table: &str, since: Versionstamp) -> CResult<Vec<ChangeEntry>>;

    /// Lists tables in the currently selected namespace/database.
    async fn list_tables(&mut self) -> CResult<Vec<String>>;

    /// Scopes all subsequent calls to the given namespace/database.
    async fn use_namespace(&mut self, ns: &str, db: &str) -> CResult<()>;
}

/// An in-memory `Database` used by the test suite. Mirrors the role the
/// teacher crate's in-memory storage engine plays for its own engine tests:
/// a stand-in with the same contract as production, fast and deterministic.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[derive(Clone, Debug)]
    struct Row {
        data: serde_json::Map<String, serde_json::Value>,
    }

    /// A fake database: one monotonic versionstamp counter, a table of rows
    /// per name, and a change log per table. `exec` understands only the
    /// handful of statement shapes the engine actually issues.
    #[derive(Default)]
    pub struct FakeDatabase {
        next_vs: AtomicU64,
        tables: BTreeMap<String, BTreeMap<String, Row>>,
        changes: BTreeMap<String, Vec<ChangeEntry>>,
        namespace: Option<(String, String)>,
    }

    impl FakeDatabase {
        pub fn new() -> Self {
            Self {
                next_vs: AtomicU64::new(1),
                tables: BTreeMap::new(),
                changes: BTreeMap::new(),
                namespace: None,
            }
        }

        fn next_versionstamp(&self) -> Versionstamp {
            self.next_vs.fetch_add(1, Ordering::SeqCst)
        }

        fn record_change(&mut self, table: &str, descriptor: crate::model::ChangeDescriptor) -> Versionstamp {
            let vs = self.next_versionstamp();
            self.changes.entry(table.to_string()).or_default().push(ChangeEntry {
                table: table.to_string(),
                versionstamp: vs,
                changes: vec![descriptor],
            });
            vs
        }

        /// Test helper: commits an upsert as a real caller would, bumping
        /// the change feed and the live row set in one step.
        pub fn upsert(&mut self, table: &str, id: &str, data: serde_json::Map<String, serde_json::Value>) -> Versionstamp {
            self.tables
                .entry(table.to_string())
                .or_default()
                .insert(id.to_string(), Row { data: data.clone() });
            self.record_change(
                table,
                crate::model::ChangeDescriptor::Update { id: id.to_string(), data },
            )
        }

        /// Test helper: commits a delete.
        pub fn delete(&mut self, table: &str, id: &str) -> Versionstamp {
            self.tables.entry(table.to_string()).or_default().remove(id);
            self.record_change(table, crate::model::ChangeDescriptor::Delete { id: id.to_string() })
        }
    }

    #[async_trait]
    impl Database for FakeDatabase {
        async fn exec(
            &mut self,
            query: &str,
            params: &[serde_json::Value],
        ) -> CResult<Vec<serde_json::Map<String, serde_json::Value>>> {
            if query.starts_with("INFO FOR DB") {
                return match &self.namespace {
                    Some(_) => Ok(vec![serde_json::Map::new()]),
                    None => Err(crate::error::Error::Config("no namespace/database selected".into())),
                };
            }
            if query.starts_with("SELECT * FROM") {
                let table = query.trim_start_matches("SELECT * FROM ").trim();
                let rows = self
                    .tables
                    .get(table)
                    .map(|t| t.values().map(|r| r.data.clone()).collect())
                    .unwrap_or_default();
                return Ok(rows);
            }
            if query.starts_with("INSERT INTO") {
                let table = query.trim_start_matches("INSERT INTO ").trim();
                let data = params
                    .first()
                    .and_then(|v| v.as_object())
                    .cloned()
                    .unwrap_or_default();
                let id = data
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("marker")
                    .to_string();
                self.upsert(table, &id, data.clone());
                return Ok(vec![data]);
            }
            Err(crate::error::Error::Upstream {
                query: query.to_string(),
                source: "unrecognized statement shape".to_string(),
            })
        }

        async fn ensure_change_feed(&mut self, table: &str, _retention: Duration) -> CResult<()> {
            self.tables.entry(table.to_string()).or_default();
            self.changes.entry(table.to_string()).or_default();
            Ok(())
        }

        async fn remove_table(&mut self, table: &str) -> CResult<()> {
            self.tables.remove(table);
            self.changes.remove(table);
            Ok(())
        }

        async fn show_changes(&mut self, table: &str, since: Versionstamp) -> CResult<Vec<ChangeEntry>> {
            Ok(self
                .changes
                .get(table)
                .map(|entries| entries.iter().filter(|e| e.versionstamp > since).cloned().collect())
                .unwrap_or_default())
        }

        async fn list_tables(&mut self) -> CResult<Vec<String>> {
            Ok(self.tables.keys().cloned().collect())
        }

        async fn use_namespace(&mut self, ns: &str, db: &str) -> CResult<()> {
            self.namespace = Some((ns.to_string(), db.to_string()));
            Ok(())
        }
    }
}
