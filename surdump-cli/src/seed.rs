//! Loads the reference in-memory database from a JSON seed file: an object
//! mapping table name to an array of row objects. A production deployment
//! never touches this module -- it exists so `surdumpcli` has something to
//! back up without requiring a live driver.

use std::path::Path;

use anyhow::{Context, Result};
use surdump::database::testing::FakeDatabase;

pub fn load(path: &Path) -> Result<FakeDatabase> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let tables: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&body)
        .with_context(|| format!("parsing seed file {}", path.display()))?;

    let mut db = FakeDatabase::new();
    for (table, rows) in tables {
        let rows = rows
            .as_array()
            .with_context(|| format!("table {table} in seed file must be an array of rows"))?;
        for row in rows {
            let data = row
                .as_object()
                .with_context(|| format!("row in table {table} must be a JSON object"))?
                .clone();
            let id = data
                .get("id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .with_context(|| format!("row in table {table} is missing an \"id\" field"))?;
            db.upsert(&table, &id, data);
        }
    }
    Ok(db)
}
