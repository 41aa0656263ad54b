//! RSCoin Storage Layer - Snapshots Plus Change Log
//!
//! Persistence model per node:
//! - State stays in memory; every update is appended to a change log
//! - A full snapshot is written periodically
//! - Recovery loads the snapshot and replays the log tail over it
//!
//! A store opened without a data directory is volatile: every write is a
//! no-op and recovery finds nothing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// File-based store for one node's snapshots and change logs
#[derive(Debug, Clone)]
pub struct Store {
    data_dir: Option<PathBuf>,
}

impl Store {
    /// Open a store rooted at `path`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let data_dir = path.as_ref().to_path_buf();

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)?;
        }

        Ok(Self {
            data_dir: Some(data_dir),
        })
    }

    /// A store that keeps nothing: for nodes run without a DB path
    pub fn volatile() -> Self {
        Self { data_dir: None }
    }

    pub fn is_volatile(&self) -> bool {
        self.data_dir.is_none()
    }

    /// Save a snapshot (JSON for readability, Bincode for speed)
    pub fn save_snapshot<T: Serialize>(&self, name: &str, data: &T) -> Result<(), StorageError> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(data)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(dir.join(format!("{}.json", name)), json)?;

        let bin = bincode::serialize(data)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(dir.join(format!("{}.bin", name)), bin)?;

        Ok(())
    }

    /// Load a snapshot (tries Bincode first, falls back to JSON); `None` if
    /// no snapshot was ever written
    pub fn load_snapshot<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StorageError> {
        let Some(dir) = &self.data_dir else {
            return Ok(None);
        };

        let bin_path = dir.join(format!("{}.bin", name));
        if bin_path.exists() {
            let data = fs::read(&bin_path)?;
            return bincode::deserialize(&data)
                .map(Some)
                .map_err(|e| StorageError::SerializationError(e.to_string()));
        }

        let json_path = dir.join(format!("{}.json", name));
        if json_path.exists() {
            let data = fs::read_to_string(&json_path)?;
            return serde_json::from_str(&data)
                .map(Some)
                .map_err(|e| StorageError::SerializationError(e.to_string()));
        }

        Ok(None)
    }

    /// Append one event to the named change log and flush it to disk
    pub fn append_event<T: Serialize>(&self, name: &str, event: &T) -> Result<(), StorageError> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };

        let bytes = bincode::serialize(event)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(format!("{}.log", name)))?;
        file.write_all(&(bytes.len() as u32).to_le_bytes())?;
        file.write_all(&bytes)?;

        // Flush to disk to ensure durability before the caller acks
        file.sync_data()?;

        Ok(())
    }

    /// Read every complete event in the named change log, oldest first.
    ///
    /// A trailing partial record (crash mid-append) is ignored; replay stops
    /// at the last complete event.
    pub fn read_events<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StorageError> {
        let Some(dir) = &self.data_dir else {
            return Ok(Vec::new());
        };

        let path = dir.join(format!("{}.log", name));
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut buf = Vec::new();
        File::open(&path)?.read_to_end(&mut buf)?;

        let mut events = Vec::new();
        let mut offset = 0usize;
        loop {
            if offset + 4 > buf.len() {
                break;
            }
            let len =
                u32::from_le_bytes(buf[offset..offset + 4].try_into().expect("4-byte slice"))
                    as usize;
            if offset + 4 + len > buf.len() {
                break;
            }
            let event = bincode::deserialize(&buf[offset + 4..offset + 4 + len])
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            events.push(event);
            offset += 4 + len;
        }

        Ok(events)
    }

    /// Drop the named change log, typically right after a snapshot
    pub fn truncate_events(&self, name: &str) -> Result<(), StorageError> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };

        let path = dir.join(format!("{}.log", name));
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct SampleState {
        height: u64,
        label: String,
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();

        let state = SampleState {
            height: 42,
            label: "tip".to_string(),
        };
        store.save_snapshot("state", &state).unwrap();

        let loaded: Option<SampleState> = store.load_snapshot("state").unwrap();
        assert_eq!(loaded, Some(state));
    }

    #[test]
    fn test_missing_snapshot_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();

        let loaded: Option<SampleState> = store.load_snapshot("state").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_event_log_append_and_replay() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();

        for i in 0..5u64 {
            store.append_event("events", &i).unwrap();
        }

        let events: Vec<u64> = store.read_events("events").unwrap();
        assert_eq!(events, vec![0, 1, 2, 3, 4]);

        store.truncate_events("events").unwrap();
        let events: Vec<u64> = store.read_events("events").unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_partial_trailing_record_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();

        store.append_event("events", &7u64).unwrap();

        // Simulate a crash mid-append: a length prefix with no body.
        let path = tmp.path().join("events.log");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&100u32.to_le_bytes()).unwrap();

        let events: Vec<u64> = store.read_events("events").unwrap();
        assert_eq!(events, vec![7]);
    }

    #[test]
    fn test_volatile_store_keeps_nothing() {
        let store = Store::volatile();
        store.save_snapshot("state", &1u64).unwrap();
        store.append_event("events", &1u64).unwrap();

        assert!(store.load_snapshot::<u64>("state").unwrap().is_none());
        assert!(store.read_events::<u64>("events").unwrap().is_empty());
    }
}
