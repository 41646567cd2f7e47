//! Dump Engine. Owns a `&mut dyn Database` for the lifetime of one dump
//! and runs the full or incremental bracketing protocol over it, writing
//! through a [`DumpWriter`] and emitting a [`Manifest`] sidecar on success.

use std::io::Write;
use std::path::Path;

use chrono::Utc;

use crate::changefeed;
use crate::config::DumpConfig;
use crate::database::Database;
use crate::error::{CResult, Error};
use crate::manifest::{Manifest, ManifestStore};
use crate::model::{ArtifactKind, Versionstamp};
use crate::probe;
use crate::scanner;
use crate::writer::DumpWriter;

/// Outcome of a completed dump, independent of how it was produced.
#[derive(Debug, Clone)]
pub struct DumpOutcome {
    pub manifest: Manifest,
}

pub struct DumpEngine<'a> {
    db: &'a mut dyn Database,
    config: DumpConfig,
    running: &'a std::sync::atomic::AtomicBool,
}

impl<'a> DumpEngine<'a> {
    pub fn new(db: &'a mut dyn Database, config: DumpConfig, running: &'a std::sync::atomic::AtomicBool) -> CResult<Self> {
        config.validate()?;
        Ok(Self { db, config, running })
    }

    async fn tables(&mut self) -> CResult<Vec<String>> {
        match &self.config.tables {
            Some(tables) => Ok(tables.clone()),
            None => self.db.list_tables().await,
        }
    }

    fn check_running(&self) -> CResult<()> {
        if self.running.load(std::sync::atomic::Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Canceled)
        }
    }

    /// Produces a full snapshot plus the changes that landed while the
    /// snapshot was being taken, so the artifact is self-consistent as of
    /// `end_versionstamp` rather than merely "as of whenever each table
    /// finished scanning".
    ///
    /// 1. `vs0` <- probe, establishing the lower bracket.
    /// 2. scan and write every table's live rows.
    /// 3. `vs1` <- probe, establishing the upper bracket.
    /// 4. for each table, write every change in `(vs0, vs1]`, tracking the
    ///    highest versionstamp seen, `max_t`.
    /// 5. `end_versionstamp = max(vs1, max_t over all tables)`: a change
    ///    observed in step 4 can itself carry a versionstamp beyond `vs1`
    ///    if more writes land between the probe and the read of its own
    ///    change feed.
    pub async fn full(&mut self, filename: &str) -> CResult<DumpOutcome> {
        self.check_running()?;
        let artifact_path = self.config.output_dir.join(filename);
        let file = std::fs::File::create(&artifact_path)?;
        let mut writer = DumpWriter::new(std::io::BufWriter::new(file));
        writer.write_magic(ArtifactKind::Full)?;

        let vs0 = probe::probe(self.db, &self.config.namespace, &self.config.database, self.running).await?;

        let tables = self.tables().await?;
        for table in &tables {
            self.check_running()?;
            self.db
                .ensure_change_feed(table, self.config.change_feed_retention())
                .await?;
            for record in scanner::scan(self.db, table).await? {
                writer.encode(record)?;
            }
        }

        let vs1 = probe::probe(self.db, &self.config.namespace, &self.config.database, self.running).await?;

        let mut end_versionstamp = vs1;
        for table in &tables {
            self.check_running()?;
            let (entries, max_t) = changefeed::scan(self.db, table, vs0).await?;
            for entry in entries {
                writer.encode(entry)?;
            }
            end_versionstamp = end_versionstamp.max(max_t);
        }

        self.finish(writer, &artifact_path, filename, ArtifactKind::Full, 0, end_versionstamp)
    }

    /// Writes every change recorded for the configured tables in
    /// `(since_versionstamp, last_versionstamp]`. Refuses to produce an
    /// artifact that captures zero changes -- an incremental dump exists to
    /// advance the chain, and an artifact advancing it by nothing would be
    /// indistinguishable from a silently dropped write.
    pub async fn incremental(&mut self, filename: &str, since_versionstamp: Versionstamp) -> CResult<DumpOutcome> {
        self.check_running()?;
        let artifact_path = self.config.output_dir.join(filename);
        let file = std::fs::File::create(&artifact_path)?;
        let mut writer = DumpWriter::new(std::io::BufWriter::new(file));
        writer.write_magic(ArtifactKind::Incremental)?;

        let tables = self.tables().await?;
        let mut last_versionstamp = since_versionstamp;
        let mut wrote_any = false;
        for table in &tables {
            self.check_running()?;
            let (entries, max_t) = changefeed::scan(self.db, table, since_versionstamp).await?;
            if !entries.is_empty() {
                wrote_any = true;
            }
            for entry in entries {
                writer.encode(entry)?;
            }
            last_versionstamp = last_versionstamp.max(max_t);
        }

        if !wrote_any {
            // Drop the half-written artifact; nothing downstream should see it.
            drop(writer);
            let _ = std::fs::remove_file(&artifact_path);
            return Err(Error::EmptyIncremental);
        }

        self.finish(
            writer,
            &artifact_path,
            filename,
            ArtifactKind::Incremental,
            since_versionstamp,
            last_versionstamp,
        )
    }

    fn finish<W: Write>(
        &self,
        writer: DumpWriter<W>,
        artifact_path: &Path,
        filename: &str,
        kind: ArtifactKind,
        start_versionstamp: Versionstamp,
        end_versionstamp: Versionstamp,
    ) -> CResult<DumpOutcome> {
        let (finished, sha256) = writer.finish()?;
        let manifest = Manifest {
            filename: filename.to_string(),
            kind,
            created_at: Utc::now(),
            size: finished.size,
            namespace: self.config.namespace.clone(),
            database: self.config.database.clone(),
            start_versionstamp,
            end_versionstamp,
            sha256: Some(sha256),
        };
        manifest.validate()?;
        ManifestStore::write(&manifest, artifact_path)?;
        Ok(DumpOutcome { manifest })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::testing::FakeDatabase;
    use crate::writer::decode_items;
    use std::sync::atomic::AtomicBool;
    use tempfile::tempdir;

    fn config(output_dir: &Path) -> DumpConfig {
        DumpConfig {
            namespace: "ns".into(),
            database: "db".into(),
            output_dir: output_dir.to_path_buf(),
            tables: Some(vec!["people".into()]),
            change_feed_retention_secs: 3600,
        }
    }

    #[tokio::test]
    async fn full_dump_captures_pre_existing_rows_and_concurrent_changes() {
        let dir = tempdir().unwrap();
        let mut db = FakeDatabase::new();
        db.upsert("people", "1", serde_json::json!({"id": "1"}).as_object().unwrap().clone());

        let running = AtomicBool::new(true);
        let mut engine = DumpEngine::new(&mut db, config(dir.path()), &running).unwrap();
        let outcome = engine.full("full.dump").await.unwrap();

        assert_eq!(outcome.manifest.kind, ArtifactKind::Full);
        assert_eq!(outcome.manifest.start_versionstamp, 0);
        assert!(outcome.manifest.end_versionstamp > 0);

        let bytes = std::fs::read(dir.path().join("full.dump")).unwrap();
        let items = decode_items(&bytes, ArtifactKind::Full).unwrap();
        assert!(!items.is_empty());
    }

    #[tokio::test]
    async fn manifest_digest_matches_the_independently_hashed_artifact_on_disk() {
        use sha2::{Digest, Sha256};

        let dir = tempdir().unwrap();
        let mut db = FakeDatabase::new();
        db.upsert("people", "1", serde_json::json!({"id": "1"}).as_object().unwrap().clone());

        let running = AtomicBool::new(true);
        let mut engine = DumpEngine::new(&mut db, config(dir.path()), &running).unwrap();
        engine.full("full.dump").await.unwrap();

        let artifact_path = dir.path().join("full.dump");
        let manifest = crate::manifest::ManifestStore::read(&artifact_path).unwrap();

        let bytes_on_disk = std::fs::read(&artifact_path).unwrap();
        let mut hasher = Sha256::new();
        hasher.update(&bytes_on_disk);
        let recomputed = hex::encode(hasher.finalize());

        assert_eq!(manifest.sha256.as_deref(), Some(recomputed.as_str()));
        assert_eq!(manifest.size, bytes_on_disk.len() as u64);
    }

    #[tokio::test]
    async fn incremental_dump_refuses_to_capture_zero_changes() {
        let dir = tempdir().unwrap();
        let mut db = FakeDatabase::new();
        db.ensure_change_feed("people", std::time::Duration::from_secs(1)).await.unwrap();

        let running = AtomicBool::new(true);
        let mut engine = DumpEngine::new(&mut db, config(dir.path()), &running).unwrap();
        let err = engine.incremental("inc.dump", 1).await.unwrap_err();
        assert!(matches!(err, Error::EmptyIncremental));
        assert!(!dir.path().join("inc.dump").exists());
    }

    #[tokio::test]
    async fn incremental_dump_after_full_captures_only_the_new_changes() {
        let dir = tempdir().unwrap();
        let mut db = FakeDatabase::new();
        let running = AtomicBool::new(true);

        let full_outcome = {
            let mut engine = DumpEngine::new(&mut db, config(dir.path()), &running).unwrap();
            engine.full("full.dump").await.unwrap()
        };
        db.upsert("people", "2", serde_json::json!({"id": "2"}).as_object().unwrap().clone());

        let mut engine = DumpEngine::new(&mut db, config(dir.path()), &running).unwrap();
        let inc_outcome = engine
            .incremental("inc.dump", full_outcome.manifest.end_versionstamp)
            .await
            .unwrap();

        assert_eq!(inc_outcome.manifest.start_versionstamp, full_outcome.manifest.end_versionstamp);
        assert!(inc_outcome.manifest.end_versionstamp > inc_outcome.manifest.start_versionstamp);
    }
}
