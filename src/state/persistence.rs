//! Snapshot persistence for [`GameState`].
//!
//! The store writes the whole state as one named record. [`FileSnapshotStore`]
//! keeps it as pretty-printed JSON in the data directory; [`MemorySnapshotStore`]
//! keeps it in memory for tests and throwaway sessions.

use crate::models::GameState;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Name of the snapshot file inside the data directory.
pub const SNAPSHOT_FILE_NAME: &str = "spellquest-state.json";

/// Load/save the persisted game snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved snapshot, `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<GameState>>;

    /// Replace the saved snapshot.
    fn save(&self, state: &GameState) -> Result<()>;
}

/// JSON snapshot file on disk.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: Utf8PathBuf,
}

impl FileSnapshotStore {
    pub fn new<P: AsRef<Utf8Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn corrupt_path(&self) -> Utf8PathBuf {
        self.path.with_extension("json.corrupt")
    }

    fn temp_path(&self) -> Utf8PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl SnapshotStore for FileSnapshotStore {
    /// A snapshot that cannot be parsed is moved aside to `*.json.corrupt`
    /// and treated as missing.
    fn load(&self) -> Result<Option<GameState>> {
        if !self.path.exists() {
            tracing::debug!("No snapshot at {}", self.path);
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read snapshot: {}", self.path))?;

        match serde_json::from_str::<GameState>(&contents) {
            Ok(state) => {
                tracing::info!("Loaded snapshot from {}", self.path);
                Ok(Some(state))
            }
            Err(e) => {
                let corrupt = self.corrupt_path();
                tracing::warn!(
                    "Snapshot {} is unreadable ({}), moving it to {}",
                    self.path,
                    e,
                    corrupt
                );
                fs::rename(&self.path, &corrupt)
                    .with_context(|| format!("Failed to move corrupt snapshot to {}", corrupt))?;
                Ok(None)
            }
        }
    }

    fn save(&self, state: &GameState) -> Result<()> {
        let json =
            serde_json::to_string_pretty(state).context("Failed to serialize game snapshot")?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create snapshot directory: {}", parent))?;
            }
        }

        let temp = self.temp_path();
        fs::write(&temp, json).with_context(|| format!("Failed to write snapshot: {}", temp))?;
        fs::rename(&temp, &self.path)
            .with_context(|| format!("Failed to replace snapshot: {}", self.path))?;

        tracing::debug!("Saved snapshot to {}", self.path);
        Ok(())
    }
}

/// In-memory snapshot slot.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<GameState>>,
    saves: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing snapshot, as if a previous process had saved it.
    pub fn with_snapshot(state: GameState) -> Self {
        Self {
            slot: Mutex::new(Some(state)),
            saves: AtomicUsize::new(0),
        }
    }

    /// The most recently saved snapshot.
    pub fn saved(&self) -> Option<GameState> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<GameState>> {
        Ok(self.saved())
    }

    fn save(&self, state: &GameState) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(state.clone());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
