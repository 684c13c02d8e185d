// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Durable file-backed backend.
//!
//! One file per key inside a dedicated directory. Keys are base64-encoded
//! (URL-safe, no padding) to produce portable filenames, so arbitrary key
//! strings are fine. Every write goes through a temp file + rename so a
//! crash never leaves a torn value on disk.
//!
//! [`FileBackend::compact`] rewrites the whole directory into a staging
//! sibling and swaps it in. The swap is ordered so that a crash at any point
//! leaves either the old directory or the fully-written new one; `open()`
//! finishes an interrupted swap on the next start.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tokio::fs;
use tracing::{debug, warn};

use super::{BackendError, StorageBackend};

/// Suffix for the compaction staging directory.
const COMPACT_SUFFIX: &str = ".compact";
/// Suffix for the discarded directory during the swap.
const TRASH_SUFFIX: &str = ".old";

pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) a file-backed store rooted at `dir`.
    ///
    /// If a previous compaction was interrupted between its two renames,
    /// the fully-written staging directory is promoted here.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, BackendError> {
        let dir = dir.as_ref().to_path_buf();
        let staging = sibling(&dir, COMPACT_SUFFIX);
        let trash = sibling(&dir, TRASH_SUFFIX);

        // Crashed mid-swap: primary gone, staging complete. Promote it.
        if !dir.exists() && staging.exists() {
            warn!(dir = %dir.display(), "promoting interrupted compaction");
            fs::rename(&staging, &dir).await?;
        }
        // Leftovers from a completed or abandoned compaction.
        if trash.exists() {
            let _ = fs::remove_dir_all(&trash).await;
        }
        if staging.exists() {
            let _ = fs::remove_dir_all(&staging).await;
        }

        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(URL_SAFE_NO_PAD.encode(key))
    }

    /// Rewrite the directory into a staging sibling and swap it in,
    /// reclaiming fragmentation. All-or-nothing: a crash mid-compaction
    /// leaves the original data intact (or the completed staging copy,
    /// which `open()` promotes).
    pub async fn compact(&self) -> Result<(), BackendError> {
        let staging = sibling(&self.dir, COMPACT_SUFFIX);
        let trash = sibling(&self.dir, TRASH_SUFFIX);

        if staging.exists() {
            fs::remove_dir_all(&staging).await?;
        }
        fs::create_dir_all(&staging).await?;

        let mut entries = fs::read_dir(&self.dir).await?;
        let mut copied = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                let bytes = fs::read(entry.path()).await?;
                fs::write(staging.join(entry.file_name()), bytes).await?;
                copied += 1;
            }
        }

        // Swap: primary -> trash, staging -> primary. open() recovers the
        // window between the two renames.
        fs::rename(&self.dir, &trash).await?;
        fs::rename(&staging, &self.dir).await?;
        let _ = fs::remove_dir_all(&trash).await;

        debug!(files = copied, dir = %self.dir.display(), "compacted");
        Ok(())
    }
}

fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let mut name = dir.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    dir.with_file_name(name)
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), BackendError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        match fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        Ok(fs::try_exists(self.path_for(key)).await?)
    }

    async fn clear(&self) -> Result<(), BackendError> {
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, BackendError> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            // Skip in-flight temp files and anything we didn't write.
            if name.ends_with(".tmp") {
                continue;
            }
            if let Ok(raw) = URL_SAFE_NO_PAD.decode(name) {
                if let Ok(key) = String::from_utf8(raw) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn backend() -> (TempDir, FileBackend) {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::open(tmp.path().join("store")).await.unwrap();
        (tmp, backend)
    }

    #[tokio::test]
    async fn test_save_load_delete() {
        let (_tmp, backend) = backend().await;

        backend.save("k1", b"hello").await.unwrap();
        assert_eq!(backend.load("k1").await.unwrap().as_deref(), Some(b"hello".as_ref()));

        assert!(backend.delete("k1").await.unwrap());
        assert!(!backend.delete("k1").await.unwrap());
        assert!(backend.load("k1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_with_awkward_characters() {
        let (_tmp, backend) = backend().await;
        let key = "user/../profile:🦀 settings?";

        backend.save(key, b"data").await.unwrap();

        assert_eq!(backend.load(key).await.unwrap().as_deref(), Some(b"data".as_ref()));
        assert_eq!(backend.list_keys().await.unwrap(), vec![key.to_string()]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("store");

        {
            let backend = FileBackend::open(&dir).await.unwrap();
            backend.save("durable", b"still here").await.unwrap();
        }

        let backend = FileBackend::open(&dir).await.unwrap();
        assert_eq!(
            backend.load("durable").await.unwrap().as_deref(),
            Some(b"still here".as_ref())
        );
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let (_tmp, backend) = backend().await;
        for i in 0..10 {
            backend.save(&format!("k{}", i), b"v").await.unwrap();
        }

        backend.clear().await.unwrap();

        assert!(backend.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_compact_preserves_data() {
        let (_tmp, backend) = backend().await;
        for i in 0..20 {
            backend.save(&format!("k{}", i), format!("v{}", i).as_bytes()).await.unwrap();
        }
        // Churn to create garbage worth compacting
        for i in 0..10 {
            backend.delete(&format!("k{}", i)).await.unwrap();
        }

        backend.compact().await.unwrap();

        let mut keys = backend.list_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys.len(), 10);
        assert_eq!(
            backend.load("k15").await.unwrap().as_deref(),
            Some(b"v15".as_ref())
        );
    }

    #[tokio::test]
    async fn test_open_promotes_interrupted_compaction() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("store");

        // Simulate a crash after the first rename: primary gone, staging
        // complete.
        let staging = super::sibling(&dir, COMPACT_SUFFIX);
        fs::create_dir_all(&staging).await.unwrap();
        fs::write(staging.join(URL_SAFE_NO_PAD.encode("k")), b"rescued")
            .await
            .unwrap();

        let backend = FileBackend::open(&dir).await.unwrap();
        assert_eq!(
            backend.load("k").await.unwrap().as_deref(),
            Some(b"rescued".as_ref())
        );
    }

    #[tokio::test]
    async fn test_foreign_files_ignored_in_listing() {
        let (_tmp, backend) = backend().await;
        backend.save("real", b"v").await.unwrap();
        fs::write(backend.dir.join("not base64 !!"), b"junk").await.unwrap();

        assert_eq!(backend.list_keys().await.unwrap(), vec!["real".to_string()]);
    }
}
