use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::Span;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutTier {
    Wide,   // ≥100 cols: glosses under chunks, full context
    Medium, // 60-99 cols: context, no glosses
    Narrow, // <60 cols: current section only
}

impl LayoutTier {
    pub fn from_area(area: Rect) -> Self {
        if area.width >= 100 {
            LayoutTier::Wide
        } else if area.width >= 60 {
            LayoutTier::Medium
        } else {
            LayoutTier::Narrow
        }
    }

    pub fn show_progress_bar(&self, height: u16) -> bool {
        height >= 16 && *self != LayoutTier::Narrow
    }

    pub fn show_glosses(&self) -> bool {
        *self == LayoutTier::Wide
    }

    /// How many preceding sections fit above the current one.
    pub fn context_sections(&self, height: u16) -> usize {
        match self {
            LayoutTier::Narrow => 0,
            _ if height >= 36 => 4,
            _ if height >= 28 => 2,
            _ if height >= 20 => 1,
            _ => 0,
        }
    }
}

pub struct AppLayout {
    pub header: Rect,
    pub progress: Option<Rect>,
    pub main: Rect,
    pub footer: Rect,
    pub tier: LayoutTier,
}

impl AppLayout {
    pub fn new(area: Rect) -> Self {
        let tier = LayoutTier::from_area(area);

        if tier.show_progress_bar(area.height) {
            let vertical = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1),
                    Constraint::Length(3),
                    Constraint::Min(6),
                    Constraint::Length(2),
                ])
                .split(area);
            Self {
                header: vertical[0],
                progress: Some(vertical[1]),
                main: vertical[2],
                footer: vertical[3],
                tier,
            }
        } else {
            let vertical = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1),
                    Constraint::Min(4),
                    Constraint::Length(2),
                ])
                .split(area);
            Self {
                header: vertical[0],
                progress: None,
                main: vertical[1],
                footer: vertical[2],
                tier,
            }
        }
    }
}

/// Regions of the handwriting screen. The pad keeps a roughly square shape
/// on screen, which means twice as many columns as rows.
pub struct WritingLayout {
    pub header: Rect,
    pub cue: Rect,
    pub dots: Rect,
    pub pad: Rect,
    pub feedback: Rect,
    pub footer: Rect,
}

impl WritingLayout {
    pub fn new(area: Rect) -> Self {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Min(6),
                Constraint::Length(2),
                Constraint::Length(2),
            ])
            .split(area);

        let space = vertical[3];
        let side = space.height.min(space.width / 2).min(24);
        let pad = Rect::new(
            space.x + space.width.saturating_sub(side * 2) / 2,
            space.y + space.height.saturating_sub(side) / 2,
            (side * 2).min(space.width),
            side,
        );

        Self {
            header: vertical[0],
            cue: vertical[1],
            dots: vertical[2],
            pad,
            feedback: vertical[4],
            footer: vertical[5],
        }
    }
}

/// Greedily pack footer hints into lines no wider than `width` columns. A
/// hint wider than the line gets a line of its own.
pub fn pack_hint_lines(hints: &[&str], width: usize) -> Vec<String> {
    const INDENT: &str = "  ";
    const GAP: &str = "  ";
    if width == 0 {
        return Vec::new();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    for hint in hints.iter().copied().filter(|h| !h.is_empty()) {
        if line.is_empty() {
            line = format!("{INDENT}{hint}");
            continue;
        }
        let joined = format!("{line}{GAP}{hint}");
        if Span::raw(joined.as_str()).width() <= width {
            line = joined;
        } else {
            lines.push(std::mem::replace(&mut line, format!("{INDENT}{hint}")));
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// A popup rectangle centered in `area`, sized as a percentage of it but no
/// smaller than 48x12 unless `area` itself is.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let scale = |len: u16, percent: u16, min: u16| {
        (len.saturating_mul(percent.min(100)) / 100).max(min).min(len)
    };
    let width = scale(area.width, percent_x, 48);
    let height = scale(area.height, percent_y, 12);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
