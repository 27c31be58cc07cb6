//! Storage collaborator: the note vault the pipeline writes into.
//!
//! Paths are vault-relative and use `/` separators. Creating a file never
//! overwrites; an existing file is reported as [`StorageError::AlreadyExists`].

use crate::error::StorageError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Where markdown notes and binary assets end up.
#[allow(async_fn_in_trait)]
pub trait Storage {
    /// Create a new text file at `path`.
    async fn create_text(&self, path: &str, content: &str) -> Result<(), StorageError>;

    /// Create a new binary file at `path`.
    async fn create_binary(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Every folder in the vault, sorted.
    async fn list_folders(&self) -> Result<Vec<String>, StorageError>;
}

/// A vault rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    #[instrument(level = "debug", skip(self, bytes), fields(len = bytes.len()))]
    async fn create_file(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let full = self.resolve(path);
        let io_error = |source| StorageError::Io {
            path: path.to_string(),
            source,
        };

        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::AlreadyExists {
                    path: path.to_string(),
                },
                _ => io_error(e),
            })?;
        file.write_all(bytes).await.map_err(io_error)?;
        file.flush().await.map_err(io_error)?;
        debug!(path = %full.display(), "Created file");
        Ok(())
    }
}

impl Storage for FsStorage {
    async fn create_text(&self, path: &str, content: &str) -> Result<(), StorageError> {
        self.create_file(path, content.as_bytes()).await
    }

    async fn create_binary(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.create_file(path, bytes).await
    }

    /// Hidden folders such as `.obsidian` or `.git` are skipped.
    async fn list_folders(&self) -> Result<Vec<String>, StorageError> {
        let mut folders = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let io_error = |source| StorageError::Io {
                path: dir.display().to_string(),
                source,
            };
            let mut entries = fs::read_dir(&dir).await.map_err(io_error)?;
            while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
                if !entry.file_type().await.map_err(io_error)?.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') {
                    continue;
                }
                let relative = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };
                folders.push(relative.clone());
                pending.push((entry.path(), relative));
            }
        }

        folders.sort();
        Ok(folders)
    }
}

/// In-memory vault for tests.
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct MemoryStorage {
        files: Mutex<BTreeMap<String, Vec<u8>>>,
    }

    impl MemoryStorage {
        pub fn paths(&self) -> Vec<String> {
            self.files.lock().unwrap().keys().cloned().collect()
        }

        pub fn text(&self, path: &str) -> Option<String> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .map(|b| String::from_utf8_lossy(b).into_owned())
        }

        pub fn bytes(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().unwrap().get(path).cloned()
        }

        fn insert(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
            let mut files = self.files.lock().unwrap();
            if files.contains_key(path) {
                return Err(StorageError::AlreadyExists {
                    path: path.to_string(),
                });
            }
            files.insert(path.to_string(), bytes.to_vec());
            Ok(())
        }
    }

    impl Storage for MemoryStorage {
        async fn create_text(&self, path: &str, content: &str) -> Result<(), StorageError> {
            self.insert(path, content.as_bytes())
        }

        async fn create_binary(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
            self.insert(path, bytes)
        }

        async fn list_folders(&self) -> Result<Vec<String>, StorageError> {
            let mut folders: Vec<String> = self
                .paths()
                .iter()
                .filter_map(|p| p.rsplit_once('/').map(|(dir, _)| dir.to_string()))
                .collect();
            folders.sort();
            folders.dedup();
            Ok(folders)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_text_creates_parent_folders() {
        let dir = TempDir::new().unwrap();
        let storage = FsStorage::new(dir.path());

        storage.create_text("notes/rust/a.md", "# hi").await.unwrap();
        let written = std::fs::read_to_string(dir.path().join("notes/rust/a.md")).unwrap();
        assert_eq!(written, "# hi");
    }

    #[tokio::test]
    async fn test_create_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let storage = FsStorage::new(dir.path());

        storage.create_text("a.md", "first").await.unwrap();
        let err = storage.create_text("a.md", "second").await.unwrap_err();

        assert!(matches!(err, StorageError::AlreadyExists { ref path } if path == "a.md"));
        assert_eq!(std::fs::read_to_string(dir.path().join("a.md")).unwrap(), "first");
    }

    #[tokio::test]
    async fn test_create_binary_writes_bytes() {
        let dir = TempDir::new().unwrap();
        let storage = FsStorage::new(dir.path());

        storage.create_binary("/assets/x.png", &[1, 2, 3]).await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("assets/x.png")).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_list_folders_is_sorted_and_skips_hidden() {
        let dir = TempDir::new().unwrap();
        for folder in ["notes/rust", "assets", ".obsidian/plugins"] {
            std::fs::create_dir_all(dir.path().join(folder)).unwrap();
        }
        std::fs::write(dir.path().join("notes/readme.md"), "x").unwrap();

        let folders = FsStorage::new(dir.path()).list_folders().await.unwrap();
        assert_eq!(folders, vec!["assets", "notes", "notes/rust"]);
    }
}
