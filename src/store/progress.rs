use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::store::json_store::{KeyValueStore, StoreError};
use crate::store::schema::{DrillProgress, EXPORT_VERSION, ExportData, WritingProgress};

pub fn drill_key(sutra_id: &str) -> String {
    format!("drill-progress/{sutra_id}")
}

pub fn writing_key(sutra_id: &str) -> String {
    format!("writing-progress/{sutra_id}")
}

/// Typed load/save of per-sutra progress records over a key-value store.
pub struct ProgressStore {
    kv: Box<dyn KeyValueStore>,
}

impl ProgressStore {
    pub fn new(kv: Box<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn raw(&self) -> &dyn KeyValueStore {
        self.kv.as_ref()
    }

    /// Absent or corrupt records load as `{frontier: 0}`.
    pub fn load_drill(&self, sutra_id: &str) -> DrillProgress {
        let key = drill_key(sutra_id);
        match self.kv.get(&key) {
            None => DrillProgress::default(),
            Some(raw) => DrillProgress::decode(&raw).unwrap_or_else(|| {
                warn!(key, "unreadable drill progress, starting from section 0");
                DrillProgress::default()
            }),
        }
    }

    pub fn save_drill(&mut self, sutra_id: &str, progress: &DrillProgress) -> Result<(), StoreError> {
        let key = drill_key(sutra_id);
        let json = progress.encode().map_err(|source| StoreError::Encode {
            key: key.clone(),
            source,
        })?;
        self.kv.set(&key, &json)
    }

    pub fn load_writing(&self, sutra_id: &str) -> WritingProgress {
        let key = writing_key(sutra_id);
        match self.kv.get(&key) {
            None => WritingProgress::default(),
            Some(raw) => WritingProgress::decode(&raw).unwrap_or_else(|| {
                warn!(key, "unreadable writing progress, starting empty");
                WritingProgress::default()
            }),
        }
    }

    pub fn save_writing(
        &mut self,
        sutra_id: &str,
        progress: &WritingProgress,
    ) -> Result<(), StoreError> {
        let key = writing_key(sutra_id);
        let json = progress.encode().map_err(|source| StoreError::Encode {
            key: key.clone(),
            source,
        })?;
        self.kv.set(&key, &json)
    }

    /// Bundle every record for the given sutras.
    pub fn export_all(&self, sutra_ids: &[&str]) -> ExportData {
        let mut drill = BTreeMap::new();
        let mut writing = BTreeMap::new();
        for &id in sutra_ids {
            drill.insert(id.to_string(), self.load_drill(id));
            writing.insert(id.to_string(), self.load_writing(id));
        }
        ExportData {
            sutradrill_export_version: EXPORT_VERSION,
            exported_at: Utc::now(),
            drill,
            writing,
        }
    }

    /// Write `export_all` as pretty JSON to `path`.
    pub fn export_to(&self, sutra_ids: &[&str], path: &Path) -> Result<()> {
        let data = self.export_all(sutra_ids);
        let json = serde_json::to_string_pretty(&data)?;
        fs::write(path, json).with_context(|| format!("writing export to {}", path.display()))?;
        info!(path = %path.display(), sutras = sutra_ids.len(), "exported progress");
        Ok(())
    }

    pub fn import_from(&mut self, path: &Path) -> Result<()> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading import file {}", path.display()))?;
        let data: ExportData = serde_json::from_str(&json)
            .with_context(|| format!("parsing import file {}", path.display()))?;
        self.import_all(&data)
    }

    /// Overwrite every record named in the export.
    pub fn import_all(&mut self, data: &ExportData) -> Result<()> {
        if data.sutradrill_export_version != EXPORT_VERSION {
            bail!(
                "Unsupported export version: {} (expected {})",
                data.sutradrill_export_version,
                EXPORT_VERSION
            );
        }
        for (id, progress) in &data.drill {
            self.save_drill(id, progress)?;
        }
        for (id, progress) in &data.writing {
            self.save_writing(id, progress)?;
        }
        info!(
            drill = data.drill.len(),
            writing = data.writing.len(),
            "imported progress"
        );
        Ok(())
    }
}
