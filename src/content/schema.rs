use icu_normalizer::ComposingNormalizerBorrowed;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("content is not valid JSON: {0}")]
    Json(String),
    #[error("sutra has no sections")]
    Empty,
    #[error("section at index {index} has id {id}, expected {index}")]
    SectionOrder { index: usize, id: usize },
    #[error("section {section} has no characters")]
    NoCharacters { section: usize },
    #[error("section {section} character {position} is {value:?}, expected a single character")]
    NotSingleChar {
        section: usize,
        position: usize,
        value: String,
    },
    #[error("section {section} chunk {start}..{end} is empty or out of range")]
    ChunkRange {
        section: usize,
        start: usize,
        end: usize,
    },
    #[error("section {section} chunk {start}..{end} starts before the previous chunk")]
    ChunkOrder {
        section: usize,
        start: usize,
        end: usize,
    },
    #[error("section {section} chunk {start}..{end} overlaps the previous chunk")]
    ChunkOverlap {
        section: usize,
        start: usize,
        end: usize,
    },
}

/// Role of a character within the chant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharKind {
    /// Translated meaning.
    #[serde(rename = "s")]
    Semantic,
    /// Sanskrit transliteration.
    #[serde(rename = "p")]
    Phonetic,
    /// Part of a name or title.
    #[serde(rename = "n")]
    Name,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Character {
    #[serde(rename = "char")]
    pub face: char,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplified: Option<char>,
    #[serde(rename = "type")]
    pub kind: CharKind,
    pub on: String,
    pub kana: String,
    pub pinyin: String,
    #[serde(default)]
    pub gloss: Option<String>,
}

impl Character {
    /// The face to show for the chosen character form.
    pub fn display(&self, simplified: bool) -> char {
        if simplified {
            self.simplified.unwrap_or(self.face)
        } else {
            self.face
        }
    }

    /// The other form, if it differs from `display(simplified)`.
    pub fn alternate(&self, simplified: bool) -> Option<char> {
        let shown = self.display(simplified);
        let other = if simplified {
            Some(self.face)
        } else {
            self.simplified
        };
        other.filter(|&c| c != shown)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
    pub ja: String,
    #[serde(rename = "jaKana")]
    pub ja_kana: String,
    pub zh: String,
}

impl Chunk {
    fn single(position: usize, c: &Character) -> Self {
        Self {
            start: position,
            end: position + 1,
            ja: c.on.clone(),
            ja_kana: c.kana.clone(),
            zh: c.pinyin.clone(),
        }
    }

    pub fn contains(&self, position: usize) -> bool {
        (self.start..self.end).contains(&position)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Section {
    pub id: usize,
    pub characters: Vec<Character>,
    pub chunks: Vec<Chunk>,
    pub translation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanskrit: Option<String>,
}

impl Section {
    pub fn chunk_characters(&self, chunk: &Chunk) -> &[Character] {
        &self.characters[chunk.start..chunk.end]
    }

    pub fn chunk_at(&self, position: usize) -> Option<usize> {
        self.chunks.iter().position(|c| c.contains(position))
    }

    pub fn text(&self, simplified: bool) -> String {
        self.characters.iter().map(|c| c.display(simplified)).collect()
    }
}

/// Serialized shape of a section, before validation and chunk expansion.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RawSection {
    id: usize,
    characters: Vec<RawCharacter>,
    #[serde(default)]
    chunks: Vec<Chunk>,
    translation: String,
    #[serde(default)]
    sanskrit: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawCharacter {
    #[serde(rename = "char")]
    face: String,
    #[serde(default)]
    simplified: Option<String>,
    #[serde(rename = "type")]
    kind: CharKind,
    on: String,
    kana: String,
    pinyin: String,
    #[serde(default)]
    gloss: Option<String>,
}

fn single_char(raw: &str) -> Option<char> {
    let nfc = ComposingNormalizerBorrowed::new_nfc();
    let normalized = nfc.normalize(raw);
    let mut chars = normalized.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Parse and validate a sutra's section list from JSON.
pub fn parse_sections(json: &str) -> Result<Vec<Section>, ContentError> {
    let raw: Vec<RawSection> =
        serde_json::from_str(json).map_err(|e| ContentError::Json(e.to_string()))?;
    build_sections(raw)
}

pub(crate) fn build_sections(raw: Vec<RawSection>) -> Result<Vec<Section>, ContentError> {
    if raw.is_empty() {
        return Err(ContentError::Empty);
    }
    raw.into_iter()
        .enumerate()
        .map(|(index, section)| build_section(index, section))
        .collect()
}

fn build_section(index: usize, raw: RawSection) -> Result<Section, ContentError> {
    if raw.id != index {
        return Err(ContentError::SectionOrder { index, id: raw.id });
    }
    if raw.characters.is_empty() {
        return Err(ContentError::NoCharacters { section: raw.id });
    }

    let mut characters = Vec::with_capacity(raw.characters.len());
    for (position, c) in raw.characters.into_iter().enumerate() {
        let not_single = |value: &str| ContentError::NotSingleChar {
            section: raw.id,
            position,
            value: value.to_string(),
        };
        let face = single_char(&c.face).ok_or_else(|| not_single(&c.face))?;
        let simplified = match c.simplified.as_deref() {
            Some(s) => Some(single_char(s).ok_or_else(|| not_single(s))?),
            None => None,
        };
        characters.push(Character {
            face,
            simplified,
            kind: c.kind,
            on: c.on,
            kana: c.kana,
            pinyin: c.pinyin,
            gloss: c.gloss.filter(|g| !g.is_empty()),
        });
    }

    let chunks = expand_chunks(raw.id, &characters, raw.chunks)?;
    Ok(Section {
        id: raw.id,
        characters,
        chunks,
        translation: raw.translation,
        sanskrit: raw.sanskrit,
    })
}

/// Fill gaps between authored compound chunks with single-character chunks so
/// the result partitions the whole section. Authored chunks must be listed in
/// order of their start.
pub fn expand_chunks(
    section: usize,
    characters: &[Character],
    authored: Vec<Chunk>,
) -> Result<Vec<Chunk>, ContentError> {
    let mut result = Vec::with_capacity(characters.len());
    let mut pos = 0;
    let mut prev_start = None;
    for chunk in authored {
        if prev_start.is_some_and(|prev| chunk.start < prev) {
            return Err(ContentError::ChunkOrder {
                section,
                start: chunk.start,
                end: chunk.end,
            });
        }
        prev_start = Some(chunk.start);
        if chunk.is_empty() || chunk.end > characters.len() {
            return Err(ContentError::ChunkRange {
                section,
                start: chunk.start,
                end: chunk.end,
            });
        }
        if chunk.start < pos {
            return Err(ContentError::ChunkOverlap {
                section,
                start: chunk.start,
                end: chunk.end,
            });
        }
        while pos < chunk.start {
            result.push(Chunk::single(pos, &characters[pos]));
            pos += 1;
        }
        pos = chunk.end;
        result.push(chunk);
    }
    while pos < characters.len() {
        result.push(Chunk::single(pos, &characters[pos]));
        pos += 1;
    }
    Ok(result)
}
