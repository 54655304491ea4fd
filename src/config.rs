use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    #[default]
    Romaji,
    Kana,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KanjiForm {
    #[default]
    Traditional,
    Simplified,
}

/// What the drill shows as the answer to recall.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    #[default]
    Readings,
    Kanji,
    Mandarin,
    Glosses,
    Translation,
    Writing,
}

impl StudyMode {
    pub const ALL: [StudyMode; 6] = [
        StudyMode::Readings,
        StudyMode::Kanji,
        StudyMode::Mandarin,
        StudyMode::Glosses,
        StudyMode::Translation,
        StudyMode::Writing,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StudyMode::Readings => "Readings",
            StudyMode::Kanji => "Kanji",
            StudyMode::Mandarin => "Mandarin",
            StudyMode::Glosses => "Glosses",
            StudyMode::Translation => "Translation",
            StudyMode::Writing => "Writing",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub script: Script,
    #[serde(default)]
    pub kanji_form: KanjiForm,
    #[serde(default = "default_tts_enabled")]
    pub tts_enabled: bool,
    #[serde(default = "default_show_glosses")]
    pub show_glosses: bool,
    #[serde(default)]
    pub mode: StudyMode,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_sutra")]
    pub sutra: String,
    /// Program run to speak a reading; `{lang}` and `{text}` are substituted.
    #[serde(default)]
    pub tts_command: Option<String>,
    #[serde(default = "default_patterns_path")]
    pub patterns_path: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_tts_enabled() -> bool {
    false
}
fn default_show_glosses() -> bool {
    true
}
fn default_theme() -> String {
    "terminal-default".to_string()
}
fn default_sutra() -> String {
    "heart-sutra".to_string()
}
fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sutradrill")
        .to_string_lossy()
        .to_string()
}
fn default_patterns_path() -> String {
    PathBuf::from(default_data_dir())
        .join("ref-patterns.json")
        .to_string_lossy()
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            script: Script::default(),
            kanji_form: KanjiForm::default(),
            tts_enabled: default_tts_enabled(),
            show_glosses: default_show_glosses(),
            mode: StudyMode::default(),
            theme: default_theme(),
            sutra: default_sutra(),
            tts_command: None,
            patterns_path: default_patterns_path(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sutradrill")
            .join("config.toml")
    }

    pub fn simplified(&self) -> bool {
        self.kanji_form == KanjiForm::Simplified
    }

    pub fn kana(&self) -> bool {
        self.script == Script::Kana
    }

    /// Reset values that no longer name anything: unknown sutra or theme ids,
    /// blank paths and blank speech commands. Call after deserialization.
    pub fn normalize(&mut self, sutra_ids: &[&str], theme_names: &[&str]) {
        if !sutra_ids.contains(&self.sutra.as_str()) {
            self.sutra = sutra_ids
                .first()
                .map_or_else(default_sutra, |id| id.to_string());
        }
        if !theme_names.contains(&self.theme.as_str()) {
            self.theme = default_theme();
        }
        if self.tts_command.as_deref().is_some_and(|c| c.trim().is_empty()) {
            self.tts_command = None;
        }
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir();
        }
        if self.patterns_path.trim().is_empty() {
            self.patterns_path = default_patterns_path();
        }
    }
}
