use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_embed::Embed;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::content::schema::{ContentError, RawSection, Section, build_sections};

#[derive(Embed)]
#[folder = "assets/sutras/"]
struct SutraAssets;

/// One memorization text and its sections in chant order.
#[derive(Clone, Debug)]
pub struct SutraInfo {
    pub id: String,
    pub title_ja: String,
    pub title_en: String,
    pub sections: Vec<Section>,
}

impl SutraInfo {
    pub fn total_sections(&self) -> usize {
        self.sections.len()
    }
}

#[derive(Deserialize)]
struct SutraDocument {
    #[serde(rename = "titleJa")]
    title_ja: String,
    #[serde(rename = "titleEn")]
    title_en: String,
    sections: Vec<RawSection>,
}

/// Parse a sutra document (`{titleJa, titleEn, sections}`) into a validated sutra.
pub fn parse_sutra(id: &str, json: &str) -> Result<SutraInfo, ContentError> {
    let doc: SutraDocument =
        serde_json::from_str(json).map_err(|e| ContentError::Json(e.to_string()))?;
    Ok(SutraInfo {
        id: id.to_string(),
        title_ja: doc.title_ja,
        title_en: doc.title_en,
        sections: build_sections(doc.sections)?,
    })
}

/// Bundled order on the home screen.
const BUNDLED_ORDER: &[&str] = &["heart-sutra", "four-great-vows"];

#[derive(Clone, Debug, Default)]
pub struct Library {
    sutras: Vec<SutraInfo>,
}

impl Library {
    /// Load every bundled sutra. A bundled file that fails validation is
    /// skipped with a warning rather than taking the others down with it.
    pub fn bundled() -> Self {
        let mut ids: Vec<String> = SutraAssets::iter()
            .filter_map(|f| f.strip_suffix(".json").map(|n| n.to_string()))
            .collect();
        ids.sort_by_key(|id| {
            BUNDLED_ORDER
                .iter()
                .position(|known| known == id)
                .unwrap_or(BUNDLED_ORDER.len())
        });

        let mut sutras = Vec::new();
        for id in ids {
            let Some(file) = SutraAssets::get(&format!("{id}.json")) else {
                continue;
            };
            let Ok(json) = std::str::from_utf8(file.data.as_ref()) else {
                warn!(sutra = %id, "bundled sutra is not UTF-8");
                continue;
            };
            match parse_sutra(&id, json) {
                Ok(sutra) => {
                    debug!(sutra = %id, sections = sutra.total_sections(), "loaded bundled sutra");
                    sutras.push(sutra);
                }
                Err(e) => warn!(sutra = %id, error = %e, "skipping invalid bundled sutra"),
            }
        }
        Self { sutras }
    }

    pub fn from_sutras(sutras: Vec<SutraInfo>) -> Self {
        Self { sutras }
    }

    /// Add (or replace) a sutra from a JSON file. The id is the file stem.
    pub fn load_file(&mut self, path: &Path) -> Result<&SutraInfo> {
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .context("content file has no usable name")?
            .to_string();
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading content file {}", path.display()))?;
        let sutra = parse_sutra(&id, &json)
            .with_context(|| format!("validating content file {}", path.display()))?;

        self.sutras.retain(|s| s.id != id);
        self.sutras.push(sutra);
        Ok(&self.sutras[self.sutras.len() - 1])
    }

    pub fn get(&self, id: &str) -> Option<&SutraInfo> {
        self.sutras.iter().find(|s| s.id == id)
    }

    pub fn sutras(&self) -> &[SutraInfo] {
        &self.sutras
    }

    pub fn ids(&self) -> Vec<&str> {
        self.sutras.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sutras.is_empty()
    }
}
