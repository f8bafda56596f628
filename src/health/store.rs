//! Health history stores.

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::path::{Path, PathBuf};

use crate::health::history::{HealthHistoryStore, HistoryError};

/// Process-local store. History is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    inner: DashMap<String, String>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl HealthHistoryStore for MemoryHistoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, HistoryError>> {
        let value = self.inner.get(key).map(|r| r.value().clone());
        futures_util::future::ready(Ok(value)).boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), HistoryError>> {
        self.inner.insert(key.to_string(), value);
        futures_util::future::ready(Ok(())).boxed()
    }
}

/// One JSON file per key under a directory. Survives restarts.
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    directory: PathBuf,
}

impl FileHistoryStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File path for a key; anything outside `[A-Za-z0-9_-]` becomes `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(format!("{}.json", file_name))
    }
}

impl HealthHistoryStore for FileHistoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, HistoryError>> {
        async move {
            match tokio::fs::read_to_string(self.path_for(key)).await {
                Ok(content) => Ok(Some(content)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(HistoryError::Io(e)),
            }
        }
        .boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), HistoryError>> {
        async move {
            tokio::fs::create_dir_all(&self.directory).await?;
            let path = self.path_for(key);
            // Write then rename so a crash never leaves a truncated file.
            let tmp = path.with_extension("json.tmp");
            tokio::fs::write(&tmp, value).await?;
            tokio::fs::rename(&tmp, &path).await?;
            Ok::<(), HistoryError>(())
        }
        .boxed()
    }
}
