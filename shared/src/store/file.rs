use async_trait::async_trait;
use log::{debug, warn};
use std::path::PathBuf;

use super::{keys, KvStore};
use crate::clock::random_suffix;
use crate::errors::StoreError;

const VALUE_EXTENSION: &str = ".json";
const TEMP_PREFIX: &str = ".tmp-";

/// Directory-backed store, one file per key.
///
/// ```text
/// <dir>/
///     rsvp=guests.json
///     rsvp=confirmation=guest_1700000000000_ab12cd34e.json
///     .tmp-<random>          -- in-flight writes, renamed into place
/// ```
///
/// `:` in keys is written as `=` so file names stay portable.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!("Opened file store at {}", dir.display());
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if !keys::is_valid_key(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self
            .dir
            .join(format!("{}{}", key.replace(':', "="), VALUE_EXTENSION)))
    }

    fn key_for(file_name: &str) -> Option<String> {
        if file_name.starts_with(TEMP_PREFIX) {
            return None;
        }
        file_name
            .strip_suffix(VALUE_EXTENSION)
            .map(|stem| stem.replace('=', ":"))
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let temp = self.dir.join(format!("{TEMP_PREFIX}{}", random_suffix(16)));

        tokio::fs::write(&temp, value).await?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                warn!("Failed to remove temp file {}: {}", temp.display(), cleanup);
            }
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut found = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(key) = Self::key_for(name) {
                if key.starts_with(prefix) {
                    found.push(key);
                }
            }
        }

        found.sort();
        Ok(found)
    }
}
