#[cfg(test)]
mod test {
    use assert_cmd::prelude::*;
    use assert_fs::TempDir;
    use chrono::Utc;
    use predicates::prelude::*;
    use std::process::Command;
    use surdump::manifest::{Manifest, ManifestStore};
    use surdump::model::ArtifactKind;

    fn write_artifact(dir: &std::path::Path, filename: &str, kind: ArtifactKind, start: u64, end: u64) {
        let path = dir.join(filename);
        std::fs::write(&path, kind.magic()).unwrap();
        let manifest = Manifest {
            filename: filename.to_string(),
            kind,
            created_at: Utc::now(),
            size: kind.magic().len() as u64,
            namespace: "demo".into(),
            database: "main".into(),
            start_versionstamp: start,
            end_versionstamp: end,
            sha256: None,
        };
        ManifestStore::write(&manifest, &path).unwrap();
    }

    #[test]
    fn chains_prints_the_assembled_chain_and_its_restore_points() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        write_artifact(dir.path(), "full.dump", ArtifactKind::Full, 0, 200);
        write_artifact(dir.path(), "inc.dump", ArtifactKind::Incremental, 200, 300);

        let mut cmd = Command::cargo_bin("surdumpcli")?;
        cmd.arg("chains").arg(dir.path());
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("demo.main"))
            .stdout(predicate::str::contains("restore points: [200, 300]"));

        Ok(())
    }

    #[test]
    fn chains_reports_an_empty_directory_without_failing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;

        let mut cmd = Command::cargo_bin("surdumpcli")?;
        cmd.arg("chains").arg(dir.path());
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("no chains found"));

        Ok(())
    }
}
