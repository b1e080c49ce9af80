use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto;
use crate::models::AppData;

/// Fixed identifier the whole state blob is stored under.
pub const STORAGE_KEY: &str = "flora-cycle-storage";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("data directory not found")]
    NoDataDir,
    #[error("state at {0} is encrypted; a passphrase is required")]
    Locked(PathBuf),
}

/// Default data directory, `$XDG_DATA_HOME/flora` on Linux.
pub fn default_data_dir() -> Result<PathBuf, StorageError> {
    Ok(dirs::data_local_dir()
        .ok_or(StorageError::NoDataDir)?
        .join("flora"))
}

/// Handle on the persisted state of one data directory.
///
/// With a passphrase the blob is sealed with [`crypto::seal`]; without one it
/// is plain JSON.
pub struct Store {
    dir: PathBuf,
    passphrase: Option<Zeroizing<String>>,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        Self {
            dir: dir.into(),
            passphrase: passphrase.map(Zeroizing::new),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_encrypted(&self) -> bool {
        self.passphrase.is_some()
    }

    fn plain_path(&self) -> PathBuf {
        self.dir.join(format!("{STORAGE_KEY}.json"))
    }

    fn sealed_path(&self) -> PathBuf {
        self.dir.join(format!("{STORAGE_KEY}.sealed"))
    }

    /// Path the state is written to with the current passphrase setting.
    pub fn path(&self) -> PathBuf {
        if self.is_encrypted() {
            self.sealed_path()
        } else {
            self.plain_path()
        }
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Load the persisted state, or `None` when nothing has been saved yet.
    ///
    /// With a passphrase, a plain file left from before encryption was turned
    /// on is still read; the next save seals it and removes the plain copy.
    pub fn load(&self) -> Result<Option<AppData>, StorageError> {
        let path = self.path();
        if !path.exists() {
            if !self.is_encrypted() && self.sealed_path().exists() {
                tracing::warn!(path = ?self.sealed_path(), "state is sealed but no passphrase was given");
                return Err(StorageError::Locked(self.sealed_path()));
            }
            if self.is_encrypted() && self.plain_path().exists() {
                tracing::info!("found unencrypted state, it will be sealed on next save");
                let bytes = fs::read(self.plain_path())?;
                return Ok(Some(serde_json::from_slice(&bytes)?));
            }
            tracing::debug!(?path, "no saved state");
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        match self.decode(&bytes) {
            Ok(data) => {
                tracing::debug!(?path, "loaded state");
                Ok(Some(data))
            }
            Err(e) => {
                tracing::warn!(?path, error = %e, "unreadable state file left untouched");
                Err(e)
            }
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<AppData, StorageError> {
        match &self.passphrase {
            Some(passphrase) => {
                let mut plaintext = crypto::open(passphrase, bytes)?;
                let parsed: Result<AppData, _> = serde_json::from_slice(&plaintext);
                plaintext.zeroize();
                Ok(parsed?)
            }
            None => Ok(serde_json::from_slice(bytes)?),
        }
    }

    /// Replace the persisted state with `data`.
    ///
    /// Writes to a temp file in the same directory, syncs it, then renames
    /// it over the old file.
    pub fn save(&self, data: &AppData) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path();

        let bytes = match &self.passphrase {
            Some(passphrase) => {
                let mut json = serde_json::to_vec(data)?;
                let sealed = crypto::seal(passphrase, &json);
                json.zeroize();
                sealed?
            }
            None => serde_json::to_vec_pretty(data)?,
        };

        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| StorageError::Io(e.error))?;

        if self.is_encrypted() && self.plain_path().exists() {
            fs::remove_file(self.plain_path())?;
        }
        tracing::debug!(?path, "saved state");
        Ok(())
    }

    /// Delete all persisted state, sealed or not.
    pub fn wipe(&self) -> Result<(), StorageError> {
        for path in [self.plain_path(), self.sealed_path()] {
            if path.exists() {
                fs::remove_file(&path)?;
                tracing::info!(?path, "wiped state");
            }
        }
        Ok(())
    }
}
