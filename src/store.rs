//! Persistence slot for the calibrated voice baseline.
//!
//! The monitor only needs "read the last baseline", "write a new one" and
//! "forget it". [`JsonFileBaselineStore`] keeps it as a small JSON document;
//! [`MemoryBaselineStore`] is for tests and embedders that persist elsewhere.

use crate::calibration::VoiceBaseline;
use crate::error::{CalmwaveError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub trait BaselineStore: Send {
    /// Returns the stored baseline, or `None` when nothing was saved.
    fn load(&self) -> Result<Option<VoiceBaseline>>;

    /// Replaces any stored baseline.
    fn save(&mut self, baseline: &VoiceBaseline) -> Result<()>;

    /// Removes the stored baseline. Clearing an empty store is not an error.
    fn clear(&mut self) -> Result<()>;
}

/// In-memory store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryBaselineStore {
    slot: Arc<Mutex<Option<VoiceBaseline>>>,
}

impl MemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_baseline(baseline: VoiceBaseline) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(baseline))),
        }
    }

    /// Current contents, bypassing the trait.
    pub fn get(&self) -> Option<VoiceBaseline> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl BaselineStore for MemoryBaselineStore {
    fn load(&self) -> Result<Option<VoiceBaseline>> {
        Ok(self.get())
    }

    fn save(&mut self, baseline: &VoiceBaseline) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(baseline.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        Ok(())
    }
}

/// Baseline kept as `{pitchHz, volume, capturedAt}` JSON on disk.
#[derive(Debug, Clone)]
pub struct JsonFileBaselineStore {
    path: PathBuf,
}

impl JsonFileBaselineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BaselineStore for JsonFileBaselineStore {
    fn load(&self) -> Result<Option<VoiceBaseline>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CalmwaveError::BaselineRead {
                    path: self.path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };

        let baseline =
            serde_json::from_str(&content).map_err(|e| CalmwaveError::BaselineRead {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(baseline))
    }

    fn save(&mut self, baseline: &VoiceBaseline) -> Result<()> {
        let write_error = |e: std::io::Error| CalmwaveError::BaselineWrite {
            path: self.path.display().to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let json = serde_json::to_string_pretty(baseline)?;
        fs::write(&self.path, json).map_err(write_error)?;
        tracing::debug!("Saved baseline to {}", self.path.display());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CalmwaveError::BaselineWrite {
                path: self.path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn baseline(pitch_hz: f32) -> VoiceBaseline {
        VoiceBaseline {
            pitch_hz,
            volume: 0.42,
            captured_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryBaselineStore::new();
        assert_eq!(store.load().unwrap(), None);

        store.save(&baseline(170.0)).unwrap();
        assert_eq!(store.load().unwrap(), Some(baseline(170.0)));

        store.save(&baseline(120.0)).unwrap();
        assert_eq!(store.load().unwrap().unwrap().pitch_hz, 120.0);

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_memory_store_clones_share_slot() {
        let mut store = MemoryBaselineStore::new();
        let observer = store.clone();
        store.save(&baseline(150.0)).unwrap();
        assert_eq!(observer.get(), Some(baseline(150.0)));
    }

    #[test]
    fn test_file_store_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileBaselineStore::new(dir.path().join("baseline.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/calmwave/baseline.json");
        let mut store = JsonFileBaselineStore::new(&path);

        store.save(&baseline(165.0)).unwrap();
        assert!(path.exists());
        assert_eq!(store.load().unwrap(), Some(baseline(165.0)));
    }

    #[test]
    fn test_file_store_writes_camel_case_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("baseline.json");
        let mut store = JsonFileBaselineStore::new(&path);
        store.save(&baseline(165.0)).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"pitchHz\""));
        assert!(raw.contains("\"capturedAt\": \"2026-03-01T12:00:00Z\""));
    }

    #[test]
    fn test_file_store_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("baseline.json");
        let mut store = JsonFileBaselineStore::new(&path);
        store.save(&baseline(165.0)).unwrap();

        store.clear().unwrap();
        assert!(!path.exists());
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_corrupt_is_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("baseline.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileBaselineStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CalmwaveError::BaselineRead { .. }));
    }
}
