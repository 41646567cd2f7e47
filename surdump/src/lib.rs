//! `surdump` is a consistent backup engine for a change-feed-backed document
//! database. It never sees a transaction's own commit versionstamp; instead
//! it derives one by probing the change feed of a throw-away table, and
//! uses that probed versionstamp to bracket a table scan against concurrent
//! writes so a FULL dump is consistent as of a single point even though the
//! scan and the change-feed read it reconciles against are not atomic with
//! each other.
//!
//! ## Getting started
//!
//! ```rust
//! use std::sync::atomic::AtomicBool;
//! use surdump::config::DumpConfig;
//! use surdump::database::testing::FakeDatabase;
//! use surdump::engine::DumpEngine;
//!
//! # #[tokio::main]
//! # async fn main() -> surdump::error::CResult<()> {
//! let mut db = FakeDatabase::new();
//! db.upsert("people", "1", serde_json::json!({"id": "1", "name": "ada"}).as_object().unwrap().clone());
//!
//! let config = DumpConfig {
//!     namespace: "demo".into(),
//!     database: "main".into(),
//!     output_dir: std::env::temp_dir(),
//!     tables: Some(vec!["people".into()]),
//!     change_feed_retention_secs: 3600,
//! };
//!
//! let running = AtomicBool::new(true);
//! let mut engine = DumpEngine::new(&mut db, config, &running)?;
//! let outcome = engine.full("demo.dump").await?;
//! println!("wrote {} bytes, end versionstamp {}", outcome.manifest.size, outcome.manifest.end_versionstamp);
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod changefeed;
pub mod config;
pub mod database;
pub mod directory;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod model;
pub mod probe;
pub mod scanner;
pub mod writer;
