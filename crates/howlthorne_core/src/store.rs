//! Flat JSON documents backing the ledger.
//!
//! Every document is rewritten whole on each mutation. Writes land in a
//! temporary sibling first and are renamed into place, so a crash mid-write
//! leaves the previous version intact.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::config::StorageConfig;
use crate::error::{CoreError, Result};

/// `"{user}_slot{n}"` -> class -> score. Values are kept loose here and
/// validated when the ledger loads them.
pub type PointsDocument = BTreeMap<String, BTreeMap<String, i64>>;

/// `"{user}_slotname{n}"` -> display name.
pub type SlotNamesDocument = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardMessageDocument {
    #[serde(rename = "messageId")]
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChampionDocument {
    #[serde(rename = "firstPlaceId")]
    pub first_place_id: String,
}

/// A single pretty-printed JSON file with serialized writers.
#[derive(Debug)]
pub struct JsonDocument<T> {
    path: PathBuf,
    name: &'static str,
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(name: &'static str, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name,
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document. A missing file is `Ok(None)`.
    pub async fn load(&self) -> Result<Option<T>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(cause) => {
                return Err(CoreError::DocumentReadFailed {
                    path: self.path.clone(),
                    cause,
                });
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|cause| CoreError::DocumentMalformed {
                path: self.path.clone(),
                cause,
            })
    }

    /// Startup load: a malformed file is moved aside and `None` returned
    /// so the bot can come up with an empty document.
    pub async fn load_or_quarantine(&self) -> Result<Option<T>> {
        match self.load().await {
            Err(CoreError::DocumentMalformed { path, cause }) => {
                let aside = sibling(&path, "corrupt");
                error!(
                    document = self.name,
                    path = %path.display(),
                    moved_to = %aside.display(),
                    error = %cause,
                    "document is not valid JSON, starting empty"
                );
                if let Err(e) = tokio::fs::rename(&path, &aside).await {
                    warn!(path = %path.display(), error = %e, "failed to move malformed document aside");
                }
                Ok(None)
            }
            other => other,
        }
    }

    /// Writes `value` in full.
    pub async fn save(&self, value: &T) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_unlocked(value).await
    }

    /// Takes the snapshot while holding the write lock, so concurrent savers
    /// land on disk in the order they observed the data.
    pub async fn save_with<F>(&self, snapshot: F) -> Result<()>
    where
        F: FnOnce() -> T,
    {
        let _guard = self.write_lock.lock().await;
        let value = snapshot();
        self.write_unlocked(&value).await
    }

    /// Deletes the file. Missing files are fine.
    pub async fn remove(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(cause) => Err(CoreError::DocumentWriteFailed {
                path: self.path.clone(),
                cause,
            }),
        }
    }

    async fn write_unlocked(&self, value: &T) -> Result<()> {
        let body = serde_json::to_string_pretty(value).map_err(|cause| {
            CoreError::DocumentSerializeFailed {
                document: self.name,
                cause,
            }
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|cause| {
                    CoreError::DocumentWriteFailed {
                        path: parent.to_path_buf(),
                        cause,
                    }
                })?;
            }
        }

        let tmp = sibling(&self.path, "tmp");
        let write_failed = |cause| CoreError::DocumentWriteFailed {
            path: self.path.clone(),
            cause,
        };
        tokio::fs::write(&tmp, body).await.map_err(write_failed)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(write_failed)?;

        debug!(document = self.name, path = %self.path.display(), "document written");
        Ok(())
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// The four documents the bot keeps on disk.
#[derive(Debug)]
pub struct LedgerStore {
    pub points: JsonDocument<PointsDocument>,
    pub slot_names: JsonDocument<SlotNamesDocument>,
    pub leaderboard_message: JsonDocument<LeaderboardMessageDocument>,
    pub champion: JsonDocument<ChampionDocument>,
}

impl LedgerStore {
    pub fn new(config: &StorageConfig) -> Self {
        let dir = &config.data_dir;
        Self {
            points: JsonDocument::new("points", dir.join(&config.progress_file)),
            slot_names: JsonDocument::new("slot names", dir.join(&config.slot_names_file)),
            leaderboard_message: JsonDocument::new(
                "leaderboard message",
                dir.join(&config.leaderboard_message_file),
            ),
            champion: JsonDocument::new("champion", dir.join(&config.champion_file)),
        }
    }

    /// Store with the default file names inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(&StorageConfig {
            data_dir: dir.into(),
            ..StorageConfig::default()
        })
    }
}
