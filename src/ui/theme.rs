use std::fs;

use ratatui::style::Color;
use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Embed)]
#[folder = "assets/themes/"]
struct ThemeAssets;

pub const DEFAULT_THEME: &str = "terminal-default";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub colors: ThemeColors,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeColors {
    pub bg: String,
    pub fg: String,
    pub accent: String,
    pub accent_dim: String,
    pub border: String,
    pub border_focused: String,
    pub header_bg: String,
    pub header_fg: String,
    pub bar_filled: String,
    pub bar_empty: String,
    /// Ruby text above the characters.
    pub reading: String,
    pub gloss: String,
    /// Previous sections shown above the current one.
    pub context: String,
    /// Strokes on the writing pad.
    pub ink: String,
    pub success: String,
    pub error: String,
    pub warning: String,
}

impl Theme {
    /// User themes in `<config_dir>/sutradrill/themes/` shadow bundled ones.
    pub fn load(name: &str) -> Option<Self> {
        if let Some(config_dir) = dirs::config_dir() {
            let user_theme_path = config_dir
                .join("sutradrill")
                .join("themes")
                .join(format!("{name}.toml"));
            if let Ok(content) = fs::read_to_string(&user_theme_path) {
                match toml::from_str::<Theme>(&content) {
                    Ok(theme) => return Some(theme),
                    Err(e) => warn!(
                        path = %user_theme_path.display(),
                        error = %e,
                        "ignoring unreadable user theme"
                    ),
                }
            }
        }

        let file = ThemeAssets::get(&format!("{name}.toml"))?;
        let content = std::str::from_utf8(file.data.as_ref()).ok()?;
        toml::from_str::<Theme>(content).ok()
    }

    pub fn available_themes() -> Vec<String> {
        let mut names: Vec<String> = ThemeAssets::iter()
            .filter_map(|f| f.strip_suffix(".toml").map(|n| n.to_string()))
            .collect();
        names.sort();
        names
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::load(DEFAULT_THEME).unwrap_or_else(|| Self {
            name: DEFAULT_THEME.to_string(),
            colors: ThemeColors::default(),
        })
    }
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            bg: "#000000".to_string(),
            fg: "#d0d0d0".to_string(),
            accent: "#5fafff".to_string(),
            accent_dim: "#3a3a3a".to_string(),
            border: "#4e4e4e".to_string(),
            border_focused: "#5fafff".to_string(),
            header_bg: "#262626".to_string(),
            header_fg: "#e4e4e4".to_string(),
            bar_filled: "#5fafff".to_string(),
            bar_empty: "#262626".to_string(),
            reading: "#ffd75f".to_string(),
            gloss: "#8a8a8a".to_string(),
            context: "#6c6c6c".to_string(),
            ink: "#ffffff".to_string(),
            success: "#87d787".to_string(),
            error: "#ff5f5f".to_string(),
            warning: "#ffd75f".to_string(),
        }
    }
}

impl ThemeColors {
    pub fn parse_color(hex: &str) -> Color {
        let hex = hex.trim_start_matches('#');
        if hex.len() == 6
            && hex.is_ascii()
            && let (Ok(r), Ok(g), Ok(b)) = (
                u8::from_str_radix(&hex[0..2], 16),
                u8::from_str_radix(&hex[2..4], 16),
                u8::from_str_radix(&hex[4..6], 16),
            )
        {
            return Color::Rgb(r, g, b);
        }
        Color::White
    }

    pub fn bg(&self) -> Color { Self::parse_color(&self.bg) }
    pub fn fg(&self) -> Color { Self::parse_color(&self.fg) }
    pub fn accent(&self) -> Color { Self::parse_color(&self.accent) }
    pub fn accent_dim(&self) -> Color { Self::parse_color(&self.accent_dim) }
    pub fn border(&self) -> Color { Self::parse_color(&self.border) }
    pub fn border_focused(&self) -> Color { Self::parse_color(&self.border_focused) }
    pub fn header_bg(&self) -> Color { Self::parse_color(&self.header_bg) }
    pub fn header_fg(&self) -> Color { Self::parse_color(&self.header_fg) }
    pub fn bar_filled(&self) -> Color { Self::parse_color(&self.bar_filled) }
    pub fn bar_empty(&self) -> Color { Self::parse_color(&self.bar_empty) }
    pub fn reading(&self) -> Color { Self::parse_color(&self.reading) }
    pub fn gloss(&self) -> Color { Self::parse_color(&self.gloss) }
    pub fn context(&self) -> Color { Self::parse_color(&self.context) }
    pub fn ink(&self) -> Color { Self::parse_color(&self.ink) }
    pub fn success(&self) -> Color { Self::parse_color(&self.success) }
    pub fn error(&self) -> Color { Self::parse_color(&self.error) }
    pub fn warning(&self) -> Color { Self::parse_color(&self.warning) }
}
