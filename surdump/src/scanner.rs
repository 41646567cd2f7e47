//! Table Scanner. Enumerates all rows of a table via the query
//! channel. Ordering is unspecified; the scanner holds no snapshot, so a
//! concurrent writer may make a row appear once, twice, or not at all --
//! the bracketing protocol in [`crate::engine`] repairs the inconsistency.
//!
//! Reverse/bounded scans aren't universally supported by backends, so
//! chunked/parallel scanning is disallowed in this version: one sequential
//! scan per table.

use crate::database::Database;
use crate::error::CResult;
use crate::model::Record;

pub async fn scan(db: &mut dyn Database, table: &str) -> CResult<Vec<Record>> {
    let rows = db.exec(&format!("SELECT * FROM {table}"), &[]).await?;
    Ok(rows
        .into_iter()
        .map(|data| {
            let id = data.get("id").map(|v| id_to_string(v)).unwrap_or_default();
            Record { table: table.to_string(), id, data }
        })
        .collect())
}

fn id_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::testing::FakeDatabase;

    #[tokio::test]
    async fn scan_enumerates_every_live_row() {
        let mut db = FakeDatabase::new();
        db.upsert("people", "1", serde_json::json!({"id": "1", "name": "a"}).as_object().unwrap().clone());
        db.upsert("people", "2", serde_json::json!({"id": "2", "name": "b"}).as_object().unwrap().clone());
        db.delete("people", "1");

        let records = scan(&mut db, "people").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "2");
        assert_eq!(records[0].table, "people");
    }
}
