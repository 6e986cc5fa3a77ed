//! Persistent storage of counter values.
//!
//! The primary file is rewritten on orderly shutdown; a backup file
//! (`<path>~`) is rewritten periodically with the sets that survive reload.
//! On startup a newer, valid backup wins over the primary.

pub mod checkpoint;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tally_core::error::{Result, TallyError};
use tally_core::snapshot::{decode_snapshot, Snapshot};

use crate::config::PersistentStorageSection;

pub use checkpoint::Checkpoint;

/// Read a snapshot file. A missing file is an empty snapshot; an empty or
/// corrupt one is an error.
pub fn load(path: &Path) -> Result<Snapshot> {
    match fs::read_to_string(path) {
        Ok(text) => decode_snapshot(&path.display().to_string(), &text).map_err(|e| {
            TallyError::persistence(path.display(), format!("{e}; delete it and run again"))
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Snapshot::empty()),
        Err(e) => Err(TallyError::persistence(path.display(), e)),
    }
}

#[derive(Debug, Clone)]
pub struct PersistentStorage {
    pub path: PathBuf,
    pub backup: PathBuf,
    pub interval: Option<Duration>,
}

impl PersistentStorage {
    pub fn from_config(section: &PersistentStorageSection) -> Result<Self> {
        section.validate()?;
        let path = PathBuf::from(&section.path);
        let mut backup = path.clone().into_os_string();
        backup.push("~");
        Ok(Self { path, backup: PathBuf::from(backup), interval: section.interval()? })
    }

    /// Startup protocol: promote a newer valid backup, load the primary, and
    /// pre-create the backup when periodic checkpoints are configured.
    ///
    /// Fails when the primary is unreadable, empty or corrupt, or when a
    /// validated backup cannot be copied over it.
    pub fn recover(&self) -> Result<Snapshot> {
        let primary_mtime = mtime(&self.path)?;
        let backup_mtime = mtime(&self.backup).unwrap_or_else(|e| {
            tracing::warn!(code = e.class().as_str(), "{e}");
            None
        });

        if let Some(b) = backup_mtime {
            let newer = primary_mtime.map_or(true, |p| b > p);
            if newer {
                self.promote_backup()?;
            }
        }

        let snapshot = load(&self.path)?;

        if self.interval.is_some() && !self.backup.exists() {
            if let Err(e) = fs::File::create(&self.backup) {
                tracing::warn!(path = %self.backup.display(), error = %e, "failed to create backup file");
            }
        }

        tracing::info!(path = %self.path.display(), sets = snapshot.set_names().count(), "persistent counters loaded");
        Ok(snapshot)
    }

    fn promote_backup(&self) -> Result<()> {
        let source = self.backup.display().to_string();
        let valid = fs::read_to_string(&self.backup)
            .map_err(|e| TallyError::persistence(&source, e))
            .and_then(|text| decode_snapshot(&source, &text));

        match valid {
            Ok(_) => {
                fs::copy(&self.backup, &self.path).map_err(|e| {
                    TallyError::persistence(self.path.display(), format!("failed to restore from backup: {e}"))
                })?;
                tracing::info!(backup = %source, "persistent counters restored from backup");
            }
            Err(e) => tracing::warn!(code = e.class().as_str(), "backup skipped: {e}"),
        }
        Ok(())
    }

    pub fn write_primary(&self, text: &str) -> Result<()> {
        write_file(&self.path, text)
    }

    pub fn write_backup(&self, text: &str) -> Result<()> {
        write_file(&self.backup, text)
    }
}

fn mtime(path: &Path) -> Result<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(meta) => meta
            .modified()
            .map(Some)
            .map_err(|e| TallyError::persistence(path.display(), e)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(TallyError::persistence(path.display(), e)),
    }
}

/// Truncate and rewrite.
fn write_file(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).map_err(|e| TallyError::persistence(path.display(), e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn storage(dir: &Path, interval: Option<&str>) -> PersistentStorage {
        PersistentStorage::from_config(&PersistentStorageSection {
            path: dir.join("counters.json").display().to_string(),
            check_interval: interval.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn backup_path_appends_tilde() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(dir.path(), None);
        assert_eq!(s.backup, dir.path().join("counters.json~"));
    }

    #[test]
    fn missing_files_give_empty_snapshot_and_backup_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(dir.path(), Some("10s"));
        assert!(s.recover().unwrap().is_empty());
        assert!(s.backup.exists());
        assert!(!s.path.exists());
    }

    #[test]
    fn corrupt_primary_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(dir.path(), None);
        fs::write(&s.path, "{\"a\":").unwrap();
        let err = s.recover().unwrap_err();
        assert_eq!(err.class().as_str(), "PERSISTENCE");
        assert!(err.to_string().contains("delete it and run again"));
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope.json")).unwrap().is_empty());
    }
}
