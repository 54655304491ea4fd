use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SCHEMA_VERSION: u32 = 1;

/// Persisted frontier for one sutra: the next section to introduce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillProgress {
    pub frontier: usize,
}

#[derive(Serialize, Deserialize)]
struct VersionedDrillProgress {
    version: u32,
    frontier: usize,
}

#[derive(Deserialize)]
struct UnversionedDrillProgress {
    frontier: usize,
}

#[derive(Deserialize)]
struct LegacyDrillProgress {
    #[serde(rename = "currentSectionIndex")]
    current_section_index: usize,
}

type Decoder<T> = fn(&Value) -> Option<T>;

fn has_version(value: &Value, version: u32) -> bool {
    value.get("version").and_then(Value::as_u64) == Some(version as u64)
}

fn unversioned(value: &Value) -> bool {
    value.is_object() && value.get("version").is_none()
}

fn decode_drill_v1(value: &Value) -> Option<DrillProgress> {
    if !has_version(value, SCHEMA_VERSION) {
        return None;
    }
    let record: VersionedDrillProgress = serde_json::from_value(value.clone()).ok()?;
    Some(DrillProgress {
        frontier: record.frontier,
    })
}

fn decode_drill_unversioned(value: &Value) -> Option<DrillProgress> {
    if !unversioned(value) {
        return None;
    }
    let record: UnversionedDrillProgress = serde_json::from_value(value.clone()).ok()?;
    Some(DrillProgress {
        frontier: record.frontier,
    })
}

fn decode_drill_legacy(value: &Value) -> Option<DrillProgress> {
    if !unversioned(value) {
        return None;
    }
    let record: LegacyDrillProgress = serde_json::from_value(value.clone()).ok()?;
    Some(DrillProgress {
        frontier: record.current_section_index,
    })
}

/// Newest shape first; the first decoder that accepts the record wins.
const DRILL_DECODERS: &[Decoder<DrillProgress>] =
    &[decode_drill_v1, decode_drill_unversioned, decode_drill_legacy];

impl DrillProgress {
    /// Decode any known persisted shape. `None` means absent or corrupt.
    pub fn decode(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        DRILL_DECODERS.iter().find_map(|decode| decode(&value))
    }

    /// Encode in the current versioned shape.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(&VersionedDrillProgress {
            version: SCHEMA_VERSION,
            frontier: self.frontier,
        })
    }

    /// Clamp a decoded frontier into a sutra of `total_sections`.
    pub fn clamped(self, total_sections: usize) -> Self {
        Self {
            frontier: self.frontier.min(total_sections.saturating_sub(1)),
        }
    }
}

/// Sections completed in the handwriting test. Grows until reset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritingProgress {
    pub completed: BTreeSet<usize>,
}

#[derive(Serialize, Deserialize)]
struct VersionedWritingProgress {
    version: u32,
    completed: BTreeSet<usize>,
}

fn decode_writing_v1(value: &Value) -> Option<WritingProgress> {
    if !has_version(value, SCHEMA_VERSION) {
        return None;
    }
    let record: VersionedWritingProgress = serde_json::from_value(value.clone()).ok()?;
    Some(WritingProgress {
        completed: record.completed,
    })
}

fn decode_writing_bare_list(value: &Value) -> Option<WritingProgress> {
    let completed: BTreeSet<usize> = serde_json::from_value(value.clone()).ok()?;
    Some(WritingProgress { completed })
}

const WRITING_DECODERS: &[Decoder<WritingProgress>] = &[decode_writing_v1, decode_writing_bare_list];

impl WritingProgress {
    pub fn decode(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        WRITING_DECODERS.iter().find_map(|decode| decode(&value))
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(&VersionedWritingProgress {
            version: SCHEMA_VERSION,
            completed: self.completed.clone(),
        })
    }

    /// Returns true if the section was newly added.
    pub fn mark(&mut self, section: usize) -> bool {
        self.completed.insert(section)
    }

    pub fn contains(&self, section: usize) -> bool {
        self.completed.contains(&section)
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }
}

pub const EXPORT_VERSION: u32 = 1;

/// Every progress record, keyed by sutra id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub sutradrill_export_version: u32,
    pub exported_at: DateTime<Utc>,
    pub drill: BTreeMap<String, DrillProgress>,
    pub writing: BTreeMap<String, WritingProgress>,
}
