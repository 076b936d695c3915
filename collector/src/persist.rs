//! Snapshot storage. Each run replaces both documents wholesale; a reader
//! sees either the previous file or the new one, never a partial write.

use crate::snapshot::{Snapshot, Summary};
use serde::Serialize;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const DATA_FILE: &str = "notion-data.json";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait SnapshotStore: Send + Sync {
    fn store(&self, snapshot: &Snapshot, summary: &Summary) -> Result<(), PersistError>;
}

pub struct FilesystemStore {
    dir: PathBuf,
}

impl FilesystemStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FilesystemStore { dir: dir.into() }
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.join(DATA_FILE)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(SUMMARY_FILE)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), PersistError> {
        let io_err = |source| PersistError::Io {
            path: path.to_path_buf(),
            source,
        };

        // Same directory as the target so the rename stays on one filesystem.
        let tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.write_all(b"\n").map_err(io_err)?;
            writer.flush().map_err(io_err)?;
        }
        tmp.persist(path).map_err(|e| io_err(e.error))?;

        Ok(())
    }
}

impl SnapshotStore for FilesystemStore {
    fn store(&self, snapshot: &Snapshot, summary: &Summary) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir).map_err(|source| PersistError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let data_path = self.data_path();
        self.write_json(&data_path, snapshot)?;
        let summary_path = self.summary_path();
        self.write_json(&summary_path, summary)?;

        tracing::info!(
            data = %data_path.display(),
            summary = %summary_path.display(),
            "Snapshot written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotBuilder;
    use chrono::Utc;
    use serde_json::Value;

    fn read(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_store_creates_directory_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path().join("nested/data"));
        let (snapshot, summary) = SnapshotBuilder::new(Utc::now()).error("boom");

        store.store(&snapshot, &summary).unwrap();

        let data = read(&store.data_path());
        assert_eq!(data["status"], "error");
        assert_eq!(data["error"], "boom");
        let written = read(&store.summary_path());
        assert_eq!(written["total_cases"], 0);

        // Pretty printed with two-space indent.
        let raw = fs::read_to_string(store.data_path()).unwrap();
        assert!(raw.starts_with("{\n  \""));

        // Only the two documents remain, no temp files.
        let mut names: Vec<String> = fs::read_dir(dir.path().join("nested/data"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![DATA_FILE, SUMMARY_FILE]);
    }

    #[test]
    fn test_store_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());
        fs::write(store.data_path(), "stale and not even json").unwrap();

        let (snapshot, summary) = SnapshotBuilder::new(Utc::now()).error("second run");
        store.store(&snapshot, &summary).unwrap();

        assert_eq!(read(&store.data_path())["error"], "second run");
    }

    #[test]
    fn test_unwritable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        // A regular file where the directory should be.
        let store = FilesystemStore::new(&blocker);
        let (snapshot, summary) = SnapshotBuilder::new(Utc::now()).error("x");
        let err = store.store(&snapshot, &summary).unwrap_err();
        assert!(matches!(err, PersistError::Io { .. }));
    }
}
