//! Persistence of the single tracked instance
//!
//! The record lives in one JSON file (`.hostflow/state.json` by default).
//! Writes go to a sibling temp file first and are renamed into place, so a
//! reader sees either the previous record or the new one.

use crate::error::{CloudError, Result};
use crate::record::InstanceRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_STATE_PATH: &str = ".hostflow/state.json";
const LOCK_SUFFIX: &str = "lock";
const TEMP_SUFFIX: &str = "tmp";
const STALE_LOCK_AGE: Duration = Duration::from_secs(60 * 60);

/// Storage for the one managed instance record
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the record; `None` when nothing is tracked
    async fn load(&self) -> Result<Option<InstanceRecord>>;

    /// Replace the persisted record
    async fn save(&self, record: &InstanceRecord) -> Result<()>;

    /// Whether a record is currently persisted
    async fn exists(&self) -> Result<bool>;

    /// Forget the record. Succeeds when nothing is stored.
    async fn clear(&self) -> Result<()>;
}

/// JSON file backed [`StateStore`]
#[derive(Debug, Clone)]
pub struct JsonStateFile {
    path: PathBuf,
}

impl JsonStateFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn lock_path(&self) -> PathBuf {
        self.sibling(LOCK_SUFFIX)
    }

    async fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
            && !dir.exists()
        {
            fs::create_dir_all(dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Acquire an advisory lock guarding the state file.
    ///
    /// The lock file is created with `create_new`, so of two concurrent
    /// callers exactly one wins. A lock older than an hour is taken over.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_parent_dir().await?;

        let lock_path = self.lock_path();
        let content = serde_json::to_string_pretty(&LockInfo::current())?;

        match create_lock_file(&lock_path, &content).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                ensure_stale(&lock_path).await?;
                match fs::remove_file(&lock_path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                create_lock_file(&lock_path, &content)
                    .await
                    .map_err(|e| match e.kind() {
                        std::io::ErrorKind::AlreadyExists => CloudError::Lock(
                            "State lock was taken by another process".to_string(),
                        ),
                        _ => e.into(),
                    })?;
            }
            Err(e) => return Err(e.into()),
        }

        tracing::debug!("Acquired state lock");
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

async fn create_lock_file(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await
}

/// Fail with [`CloudError::Lock`] unless the existing lock may be taken over
async fn ensure_stale(lock_path: &Path) -> Result<()> {
    let content = match fs::read_to_string(lock_path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str::<LockInfo>(&content) {
        Ok(lock_info) => {
            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_seconds() < STALE_LOCK_AGE.as_secs() as i64 {
                return Err(CloudError::Lock(format!(
                    "State is locked by {} (pid {}) since {}",
                    lock_info.holder, lock_info.pid, lock_info.acquired_at
                )));
            }
            tracing::warn!("Removing stale lock from {}", lock_info.holder);
        }
        Err(e) => {
            // The holder may not have written its details yet
            let age = fs::metadata(lock_path)
                .await?
                .modified()?
                .elapsed()
                .unwrap_or_default();
            if age < STALE_LOCK_AGE {
                return Err(CloudError::Lock(format!(
                    "State is locked ({} is unreadable: {})",
                    lock_path.display(),
                    e
                )));
            }
            tracing::warn!("Removing unreadable stale lock: {}", e);
        }
    }
    Ok(())
}

#[async_trait]
impl StateStore for JsonStateFile {
    async fn load(&self) -> Result<Option<InstanceRecord>> {
        if !self.path.exists() {
            tracing::debug!("State file not found: {}", self.path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await?;
        let record: InstanceRecord =
            serde_json::from_str(&content).map_err(|e| CloudError::CorruptState {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(id = %record.id, state = %record.state, "Loaded instance record");
        Ok(Some(record))
    }

    async fn save(&self, record: &InstanceRecord) -> Result<()> {
        self.ensure_parent_dir().await?;

        let temp = self.sibling(TEMP_SUFFIX);
        let content = serde_json::to_string_pretty(record)?;
        fs::write(&temp, content).await?;
        fs::rename(&temp, &self.path).await?;

        tracing::debug!(id = %record.id, state = %record.state, "Saved instance record");
        Ok(())
    }

    async fn exists(&self) -> Result<bool> {
        Ok(fs::try_exists(&self.path).await?)
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!("Removed state file: {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Lock information
#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    pid: u32,
    acquired_at: DateTime<Utc>,
}

impl LockInfo {
    fn current() -> Self {
        Self {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }
}

/// RAII guard for the state lock
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    /// Release the lock
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
