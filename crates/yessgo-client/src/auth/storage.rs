/*
[INPUT]:  Token pairs and a storage location
[OUTPUT]: Persisted token pairs that survive restarts
[POS]:    Auth layer - persistent storage for the current session tokens
[UPDATE]: When storage format or file naming conventions change
*/

use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::auth::TokenPair;
use crate::http::Result;

/// Backend that keeps the token pair outside the process
#[async_trait]
pub trait TokenStorage: Send + Sync + Debug {
    /// Load the stored pair, `None` if nothing is stored
    async fn load(&self) -> Result<Option<TokenPair>>;

    /// Overwrite the stored pair
    async fn save(&self, pair: &TokenPair) -> Result<()>;

    /// Remove the stored pair; succeeds if nothing is stored
    async fn clear(&self) -> Result<()>;
}

/// In-process storage, useful for tests and short-lived sessions
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    pair: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn load(&self) -> Result<Option<TokenPair>> {
        let guard = self.pair.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    async fn save(&self, pair: &TokenPair) -> Result<()> {
        let mut guard = self.pair.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(pair.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut guard = self.pair.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
        Ok(())
    }
}

/// JSON file storage, owner read/write only on Unix
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file written first and renamed over the real one
    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn load(&self) -> Result<Option<TokenPair>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn save(&self, pair: &TokenPair) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let encoded = serde_json::to_vec_pretty(pair)?;
        let staging = self.staging_path();
        match fs::remove_file(&staging).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&staging).await?;
        file.write_all(&encoded).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
