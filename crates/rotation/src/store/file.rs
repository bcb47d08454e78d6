//! Credentials file on disk
//!
//! Rewrites are read-modify-write under two locks: a process-wide mutex and an
//! advisory lock on a sidecar file (`.<name>.lock`) so other processes using
//! the same convention do not interleave. The new content goes to a temp file
//! in the same directory which then atomically replaces the original, so a
//! reader sees either the old file or the new one, never a torn write.

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use uuid::Uuid;

use super::document::CredentialsDocument;
use crate::core::{CredentialPair, PairId, StoreError};
use crate::traits::PairSink;
use crate::utils::SecretString;

/// Handle to a shared credentials file
#[derive(Debug)]
pub struct CredentialsFile {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl CredentialsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the current file content
    pub async fn load(&self) -> Result<CredentialsDocument, StoreError> {
        let content =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| StoreError::Read {
                    path: self.path.clone(),
                    source,
                })?;
        CredentialsDocument::parse(&content, &self.path)
    }

    /// Replace the pair recorded for `profile`, leaving everything else intact
    #[tracing::instrument(skip(self, secret), fields(path = %self.path.display()))]
    pub async fn replace_pair(
        &self,
        profile: &str,
        pair_id: &PairId,
        secret: &SecretString,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let path = self.path.clone();
        let task_profile = profile.to_string();
        let pair_id = pair_id.clone();
        let secret = secret.clone();

        tokio::task::spawn_blocking(move || {
            rewrite_locked(&path, &task_profile, &pair_id, &secret)
        })
            .await
            .map_err(|join| StoreError::Write {
                path: self.path.clone(),
                source: std::io::Error::other(join),
            })??;

        tracing::debug!(profile, "credentials file rewritten");
        Ok(())
    }
}

#[async_trait]
impl PairSink for CredentialsFile {
    async fn persist(&self, profile: &str, pair: &CredentialPair) -> Result<(), StoreError> {
        let secret = pair.secret.as_ref().ok_or_else(|| StoreError::MissingSecret {
            pair_id: pair.id.clone(),
        })?;
        self.replace_pair(profile, &pair.id, secret).await
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("credentials");
    path.with_file_name(format!(".{name}.lock"))
}

fn rewrite_locked(
    path: &Path,
    profile: &str,
    pair_id: &PairId,
    secret: &SecretString,
) -> Result<(), StoreError> {
    let lock_err = |source| StoreError::Lock {
        path: path.to_path_buf(),
        source,
    };
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path(path))
        .map_err(lock_err)?;
    lock_file.lock_exclusive().map_err(lock_err)?;

    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut document = CredentialsDocument::parse(&content, path)?;
    document.set_pair(profile, pair_id, secret)?;

    atomic_write(path, document.render().as_bytes()).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
    // `lock_file` dropped here, releasing the advisory lock
}

/// Write `data` to a sibling temp file with mode 0600, then rename it over `path`
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_file_name(format!(
        ".{}.tmp.{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("credentials"),
        Uuid::new_v4().simple()
    ));

    let result = write_temp(&temp_path, data).and_then(|()| std::fs::rename(&temp_path, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

fn write_temp(temp_path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file: File = options.open(temp_path)?;
    file.write_all(data)?;
    file.sync_all()
}
