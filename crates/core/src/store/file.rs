//! Filesystem-backed audit store.
//!
//! ```text
//! <data_dir>/generations/<s1>/<s2>/<generation_id>.json
//! <data_dir>/confirmations/<s1>/<s2>/<generation_id>.json
//! ```
//!
//! where `s1`/`s2` are the first four hex characters of the id. Confirmations are keyed by the
//! generation they confirm so the one-per-generation rule is enforced by the filesystem.
//!
//! Records are written to a temporary sibling file and then hard-linked into place. Linking
//! fails if the target exists, which makes "create if absent" atomic across threads and
//! processes sharing the directory.

use super::AuditStore;
use crate::constants::{CONFIRMATIONS_DIR_NAME, GENERATIONS_DIR_NAME, RECORD_EXTENSION};
use crate::model::{ConfirmationRecord, GenerationId, GenerationRecord};
use crate::{AuditError, AuditResult, ShardableUuid};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Store keeping one JSON document per record.
#[derive(Clone, Debug)]
pub struct FileStore {
    data_dir: PathBuf,
}

enum CreateOutcome {
    Created,
    AlreadyExists,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns `StorageDirCreation` if the record directories cannot be created.
    pub fn open(data_dir: impl Into<PathBuf>) -> AuditResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(data_dir.join(GENERATIONS_DIR_NAME))
            .map_err(AuditError::StorageDirCreation)?;
        fs::create_dir_all(data_dir.join(CONFIRMATIONS_DIR_NAME))
            .map_err(AuditError::StorageDirCreation)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn generation_path(&self, id: &GenerationId) -> PathBuf {
        id.as_uuid()
            .sharded_file(&self.data_dir.join(GENERATIONS_DIR_NAME), RECORD_EXTENSION)
    }

    fn confirmation_path(&self, generation_id: &GenerationId) -> PathBuf {
        generation_id
            .as_uuid()
            .sharded_file(&self.data_dir.join(CONFIRMATIONS_DIR_NAME), RECORD_EXTENSION)
    }

    fn create_new<T: Serialize>(path: &Path, record: &T) -> AuditResult<CreateOutcome> {
        let json = serde_json::to_vec_pretty(record).map_err(AuditError::Serialization)?;
        let Some(dir) = path.parent() else {
            return Err(AuditError::InvalidInput(format!(
                "record path has no parent: {}",
                path.display()
            )));
        };
        fs::create_dir_all(dir).map_err(AuditError::StorageDirCreation)?;

        let tmp_path = dir.join(format!(".{}.tmp", ShardableUuid::new()));
        let mut tmp = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .map_err(AuditError::RecordWrite)?;
        let written = tmp
            .write_all(&json)
            .and_then(|_| tmp.sync_all())
            .map_err(AuditError::RecordWrite);
        drop(tmp);

        let outcome = written.and_then(|_| match fs::hard_link(&tmp_path, path) {
            Ok(()) => Ok(CreateOutcome::Created),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(AuditError::RecordWrite(e)),
        });

        if let Err(e) = fs::remove_file(&tmp_path) {
            tracing::warn!(
                "failed to remove temporary record {}: {}",
                tmp_path.display(),
                e
            );
        }
        outcome
    }

    fn read_record<T: DeserializeOwned>(path: &Path) -> AuditResult<Option<T>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuditError::RecordRead(e)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(AuditError::Deserialization)
    }

    /// Paths of every record file under `root`, following the two shard levels.
    fn record_files(root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let Ok(s1_iter) = fs::read_dir(root) else {
            return files;
        };
        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }
            let Ok(s2_iter) = fs::read_dir(&s1_path) else {
                continue;
            };
            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }
                let Ok(id_iter) = fs::read_dir(&s2_path) else {
                    continue;
                };
                for entry in id_iter.flatten() {
                    let path = entry.path();
                    let is_record = path.extension().is_some_and(|ext| ext == RECORD_EXTENSION)
                        && !path
                            .file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|n| n.starts_with('.'));
                    if is_record && path.is_file() {
                        files.push(path);
                    }
                }
            }
        }
        files
    }
}

impl AuditStore for FileStore {
    fn put_generation(&self, record: &GenerationRecord) -> AuditResult<()> {
        match Self::create_new(&self.generation_path(&record.id), record)? {
            CreateOutcome::Created => Ok(()),
            CreateOutcome::AlreadyExists => {
                Err(AuditError::DuplicateRecord(record.id.to_string()))
            }
        }
    }

    fn get_generation(&self, id: &GenerationId) -> AuditResult<Option<GenerationRecord>> {
        Self::read_record(&self.generation_path(id))
    }

    fn list_generations(&self) -> AuditResult<Vec<GenerationRecord>> {
        let mut records = Vec::new();
        for path in Self::record_files(&self.data_dir.join(GENERATIONS_DIR_NAME)) {
            match fs::read_to_string(&path)
                .map_err(AuditError::RecordRead)
                .and_then(|c| {
                    serde_json::from_str::<GenerationRecord>(&c)
                        .map_err(AuditError::Deserialization)
                }) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("skipping unreadable record {}: {}", path.display(), e);
                }
            }
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    fn insert_confirmation(&self, record: &ConfirmationRecord) -> AuditResult<()> {
        let path = self.confirmation_path(&record.generation_id);
        match Self::create_new(&path, record)? {
            CreateOutcome::Created => Ok(()),
            CreateOutcome::AlreadyExists => {
                let existing: Option<ConfirmationRecord> = Self::read_record(&path)?;
                Err(AuditError::Conflict {
                    generation_id: record.generation_id.to_string(),
                    confirmed_at: existing
                        .map(|c| c.confirmed_at)
                        .unwrap_or(record.confirmed_at),
                })
            }
        }
    }

    fn get_confirmation(
        &self,
        generation_id: &GenerationId,
    ) -> AuditResult<Option<ConfirmationRecord>> {
        Self::read_record(&self.confirmation_path(generation_id))
    }
}
