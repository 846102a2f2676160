//! JSON file progress store.
//!
//! One file per aggregate at `<root>/<learner>/<training>.json`. Ids are
//! percent-encoded so any id maps to a single safe path component. Saves
//! write a temporary file in the same directory and rename it over the
//! target, so readers see either the old or the new aggregate.
//!
//! Writers are serialized across processes by an exclusive advisory lock on
//! `<root>/<learner>/<training>.lock`. Lock files are left in place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs4::fs_std::FileExt;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use quizforge_core::progress::{ProgressKey, TrainingProgress};
use quizforge_core::traits::{ProgressStore, StoreLock};
use quizforge_core::StoreError;

const EXTENSION: &str = "json";
const LOCK_EXTENSION: &str = "lock";

/// Progress store persisting each aggregate as a JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileProgressStore {
    root: PathBuf,
}

impl JsonFileProgressStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document holding `key`.
    pub fn path_for(&self, key: &ProgressKey) -> PathBuf {
        self.root
            .join(encode_component(&key.learner_id))
            .join(format!("{}.{EXTENSION}", encode_component(&key.training_id)))
    }

    /// Path of the lock file guarding `key`.
    pub fn lock_path_for(&self, key: &ProgressKey) -> PathBuf {
        self.path_for(key).with_extension(LOCK_EXTENSION)
    }
}

fn lock_exclusive(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    file.lock_exclusive()?;
    Ok(file)
}

#[async_trait]
impl ProgressStore for JsonFileProgressStore {
    async fn load(&self, key: &ProgressKey) -> Result<Option<TrainingProgress>, StoreError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let progress: TrainingProgress =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        if progress.key() != *key {
            return Err(StoreError::Corrupt {
                key: key.to_string(),
                message: format!("document belongs to {}", progress.key()),
            });
        }
        if !progress.is_consistent() {
            return Err(StoreError::Corrupt {
                key: key.to_string(),
                message: "counters disagree with module states".into(),
            });
        }
        Ok(Some(progress))
    }

    async fn save(&self, progress: &TrainingProgress) -> Result<(), StoreError> {
        let key = progress.key();
        let path = self.path_for(&key);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        tokio::fs::create_dir_all(&dir).await?;

        let json = serde_json::to_vec_pretty(progress)?;
        let tmp = dir.join(format!(".{}.tmp", Uuid::new_v4()));

        let written = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(&json).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!("failed to remove {}: {}", tmp.display(), cleanup);
                }
            }
            return Err(e.into());
        }

        tracing::debug!(progress = %key, "saved to {}", path.display());
        Ok(())
    }

    async fn lock(&self, key: &ProgressKey) -> Result<StoreLock, StoreError> {
        let path = self.lock_path_for(key);
        let file = tokio::task::spawn_blocking(move || lock_exclusive(&path))
            .await
            .map_err(std::io::Error::other)??;
        tracing::trace!(progress = %key, "store lock acquired");
        // Closing the file releases the lock.
        Ok(StoreLock::holding(file))
    }

    async fn keys_for_learner(&self, learner_id: &str) -> Result<Vec<ProgressKey>, StoreError> {
        let dir = self.root.join(encode_component(learner_id));
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match decode_component(stem) {
                Some(training_id) => keys.push(ProgressKey::new(learner_id, training_id)),
                None => tracing::warn!("skipping unrecognized file {}", path.display()),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Percent-encode everything outside `[A-Za-z0-9_-]`.
fn encode_component(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for b in id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    if out.is_empty() {
        out.push('%');
    }
    out
}

fn decode_component(encoded: &str) -> Option<String> {
    if encoded == "%" {
        return Some(String::new());
    }
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = encoded.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
