use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error writing {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String-keyed JSON blobs. Reads never fail: absent or unreadable entries
/// are `None`, and callers fall back to defaults.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sutradrill");
        Self::with_base_dir(base_dir)
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// `drill-progress/heart-sutra` -> `drill-progress_heart-sutra.json`.
    /// Bytes outside `[A-Za-z0-9.-]` other than `/` are percent-encoded, so
    /// distinct keys never share a file.
    fn file_path(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len());
        for b in key.bytes() {
            match b {
                b'/' => name.push('_'),
                b if b.is_ascii_alphanumeric() || b == b'-' || b == b'.' => name.push(b as char),
                b => name.push_str(&format!("%{b:02X}")),
            }
        }
        self.base_dir.join(format!("{name}.json"))
    }

    /// Remove `.tmp` files left behind by a write that was interrupted
    /// between create and rename. Returns how many were found.
    pub fn clean_stale_temp_files(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.base_dir) else {
            return 0;
        };
        let mut found = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|x| x.to_str()) == Some("tmp") {
                found += 1;
                let _ = fs::remove_file(&path);
            }
        }
        if found > 0 {
            warn!(count = found, "removed stale temp files from interrupted writes");
        }
        found
    }
}

impl KeyValueStore for JsonStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.file_path(key);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(key, path = %path.display(), error = %e, "could not read stored record");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.file_path(key);
        let tmp_path = path.with_extension("tmp");
        let io = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };

        let mut file = fs::File::create(&tmp_path).map_err(io)?;
        file.write_all(value.as_bytes()).map_err(io)?;
        file.sync_all().map_err(io)?;
        fs::rename(&tmp_path, &path).map_err(io)?;

        debug!(key, path = %path.display(), "stored record");
        Ok(())
    }
}

/// In-memory store for tests and for running without a writable data dir.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut store = Self::default();
        store.entries.insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
