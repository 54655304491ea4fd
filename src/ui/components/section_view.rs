use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget, Wrap};

use crate::config::{Config, StudyMode};
use crate::content::{Chunk, Section};
use crate::ui::layout::LayoutTier;
use crate::ui::theme::Theme;

/// Gap between chunk columns.
const CHUNK_GAP: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayOptions {
    pub mode: StudyMode,
    pub simplified: bool,
    pub kana: bool,
    /// Per-chunk glosses under the characters plus the translation below.
    pub glosses: bool,
}

impl DisplayOptions {
    pub fn from_config(config: &Config, tier: LayoutTier) -> Self {
        Self {
            mode: config.mode,
            simplified: config.simplified(),
            kana: config.kana(),
            glosses: config.show_glosses
                && tier.show_glosses()
                && matches!(config.mode, StudyMode::Readings | StudyMode::Mandarin),
        }
    }

    /// Ruby text for one chunk in the current mode.
    pub fn chunk_reading(&self, section: &Section, chunk: &Chunk) -> String {
        match self.mode {
            StudyMode::Mandarin => chunk.zh.clone(),
            StudyMode::Glosses => section
                .chunk_characters(chunk)
                .iter()
                .map(|c| c.gloss.as_deref().unwrap_or("~"))
                .collect::<Vec<_>>()
                .join(" "),
            _ if self.kana => chunk.ja_kana.clone(),
            _ => chunk.ja.clone(),
        }
    }

    pub fn chunk_face(&self, section: &Section, chunk: &Chunk) -> String {
        section
            .chunk_characters(chunk)
            .iter()
            .map(|c| c.display(self.simplified))
            .collect()
    }
}

struct Column {
    reading: String,
    face: String,
    gloss: String,
    width: usize,
}

fn columns(section: &Section, opts: &DisplayOptions) -> Vec<Column> {
    section
        .chunks
        .iter()
        .map(|chunk| {
            let reading = opts.chunk_reading(section, chunk);
            let face = opts.chunk_face(section, chunk);
            let gloss = if opts.glosses {
                section
                    .chunk_characters(chunk)
                    .iter()
                    .filter_map(|c| c.gloss.as_deref())
                    .collect::<Vec<_>>()
                    .join(" ")
            } else {
                String::new()
            };
            let width = [&reading, &face, &gloss]
                .iter()
                .map(|s| Span::raw(s.as_str()).width())
                .max()
                .unwrap_or(0);
            Column {
                reading,
                face,
                gloss,
                width,
            }
        })
        .collect()
}

fn padded(text: &str, width: usize) -> String {
    let w = Span::raw(text).width();
    format!("{text}{}", " ".repeat(width.saturating_sub(w) + CHUNK_GAP))
}

fn row_line<F>(row: &[Column], pick: F, style: Style) -> Line<'static>
where
    F: Fn(&Column) -> &str,
{
    Line::from(
        row.iter()
            .map(|c| Span::styled(padded(pick(c), c.width), style))
            .collect::<Vec<_>>(),
    )
}

/// Readings over characters, chunk by chunk, wrapped to `width` columns.
/// Each wrapped row is two lines (three with glosses).
pub fn ruby_lines(
    section: &Section,
    opts: &DisplayOptions,
    width: u16,
    styles: RubyStyles,
) -> Vec<Line<'static>> {
    let width = width as usize;
    let mut rows: Vec<Vec<Column>> = vec![Vec::new()];
    let mut used = 0;
    for col in columns(section, opts) {
        let needed = col.width + CHUNK_GAP;
        if used > 0 && used + needed > width {
            rows.push(Vec::new());
            used = 0;
        }
        used += needed;
        if let Some(row) = rows.last_mut() {
            row.push(col);
        }
    }

    let mut lines = Vec::new();
    for row in rows.iter().filter(|r| !r.is_empty()) {
        lines.push(row_line(row, |c| &c.reading, styles.reading));
        lines.push(row_line(row, |c| &c.face, styles.face));
        if opts.glosses {
            lines.push(row_line(row, |c| &c.gloss, styles.gloss));
        }
    }
    lines
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RubyStyles {
    pub reading: Style,
    pub face: Style,
    pub gloss: Style,
}

/// One section: the current prompt or a context line above it.
pub struct SectionView<'a> {
    section: &'a Section,
    opts: DisplayOptions,
    revealed: bool,
    context: bool,
    theme: &'a Theme,
}

impl<'a> SectionView<'a> {
    pub fn current(
        section: &'a Section,
        opts: DisplayOptions,
        revealed: bool,
        theme: &'a Theme,
    ) -> Self {
        Self {
            section,
            opts,
            revealed,
            context: false,
            theme,
        }
    }

    pub fn context(section: &'a Section, opts: DisplayOptions, theme: &'a Theme) -> Self {
        Self {
            section,
            opts: DisplayOptions {
                glosses: false,
                ..opts
            },
            revealed: true,
            context: true,
            theme,
        }
    }

    /// Rows this view needs at the given width.
    pub fn height(&self, width: u16) -> u16 {
        self.lines(width).len() as u16
    }

    fn styles(&self) -> RubyStyles {
        let colors = &self.theme.colors;
        if self.context {
            let dim = Style::default().fg(colors.context());
            return RubyStyles {
                reading: dim,
                face: dim,
                gloss: dim,
            };
        }
        RubyStyles {
            reading: Style::default().fg(colors.reading()),
            face: Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
            gloss: Style::default().fg(colors.gloss()),
        }
    }

    fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let colors = &self.theme.colors;
        if !self.revealed {
            let cue = if self.section.id == 0 { "[title]" } else { "• • •" };
            return vec![Line::from(Span::styled(
                cue,
                Style::default().fg(colors.accent_dim()),
            ))];
        }
        if self.opts.mode == StudyMode::Translation && !self.context {
            return vec![Line::from(Span::styled(
                self.section.translation.clone(),
                Style::default().fg(colors.fg()),
            ))];
        }

        let mut lines = ruby_lines(self.section, &self.opts, width, self.styles());
        if self.opts.glosses {
            lines.push(Line::from(Span::styled(
                self.section.translation.clone(),
                Style::default()
                    .fg(colors.gloss())
                    .add_modifier(Modifier::ITALIC),
            )));
        }
        lines
    }
}

impl Widget for SectionView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let alignment = if self.revealed {
            Alignment::Left
        } else {
            Alignment::Center
        };
        Paragraph::new(self.lines(area.width))
            .alignment(alignment)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Library;

    fn vow() -> Section {
        Library::bundled().get("four-great-vows").unwrap().sections[1].clone()
    }

    fn opts(mode: StudyMode) -> DisplayOptions {
        DisplayOptions {
            mode,
            simplified: false,
            kana: false,
            glosses: false,
        }
    }

    fn text(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>().trim_end().to_string())
            .collect()
    }

    #[test]
    fn test_chunk_reading_per_mode() {
        let s = vow();
        let first = &s.chunks[0];
        assert_eq!(opts(StudyMode::Readings).chunk_reading(&s, first), "shu jō");
        let kana = DisplayOptions { kana: true, ..opts(StudyMode::Kanji) };
        assert_eq!(kana.chunk_reading(&s, first), "しゅじょう");
        assert_eq!(opts(StudyMode::Mandarin).chunk_reading(&s, first), "zhòng shēng");
        assert_eq!(opts(StudyMode::Glosses).chunk_reading(&s, first), "multitude arise");
    }

    #[test]
    fn test_simplified_faces() {
        let s = vow();
        let o = DisplayOptions { simplified: true, ..opts(StudyMode::Readings) };
        let faces: String = s.chunks.iter().map(|c| o.chunk_face(&s, c)).collect();
        assert_eq!(faces, "衆生無辺誓願度");
    }

    #[test]
    fn test_ruby_lines_align_readings_over_faces() {
        let s = vow();
        let lines = ruby_lines(&s, &opts(StudyMode::Readings), 80, RubyStyles::default());
        let t = text(&lines);
        assert_eq!(t.len(), 2);
        assert!(t[0].starts_with("shu jō  mu"));
        assert!(t[1].starts_with("衆生    無"));
        for (reading, face) in lines[0].spans.iter().zip(&lines[1].spans) {
            assert_eq!(reading.width(), face.width());
        }
    }

    #[test]
    fn test_ruby_lines_wrap_and_glosses() {
        let s = vow();
        let o = DisplayOptions { glosses: true, ..opts(StudyMode::Readings) };
        let lines = ruby_lines(&s, &o, 20, RubyStyles::default());
        assert!(lines.len() > 3);
        assert_eq!(lines.len() % 3, 0);
        assert!(text(&lines)[2].starts_with("multitude arise"));
    }

    #[test]
    fn test_section_view_heights() {
        let s = vow();
        let theme = Theme::default();
        let hidden = SectionView::current(&s, opts(StudyMode::Readings), false, &theme);
        assert_eq!(hidden.height(80), 1);
        let shown = SectionView::current(&s, opts(StudyMode::Readings), true, &theme);
        assert_eq!(shown.height(80), 2);
        let translation = SectionView::current(&s, opts(StudyMode::Translation), true, &theme);
        assert_eq!(translation.height(80), 1);
        let glossed = DisplayOptions { glosses: true, ..opts(StudyMode::Readings) };
        let context = SectionView::context(&s, glossed, &theme);
        assert_eq!(context.height(80), 2);
    }
}
