use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::{Block, Widget};

use crate::ui::theme::Theme;

/// Position in the sutra, with an optional marker for the frontier.
pub struct ProgressBar<'a> {
    pub label: String,
    pub ratio: f64,
    pub marker: Option<f64>,
    pub theme: &'a Theme,
}

impl<'a> ProgressBar<'a> {
    pub fn new(label: &str, ratio: f64, theme: &'a Theme) -> Self {
        Self {
            label: label.to_string(),
            ratio: ratio.clamp(0.0, 1.0),
            marker: None,
            theme,
        }
    }

    /// Sections `current` of `last`, as the drill header shows them.
    pub fn sections(current: usize, last: usize, theme: &'a Theme) -> Self {
        let ratio = if last == 0 {
            1.0
        } else {
            current as f64 / last as f64
        };
        Self::new(&format!("Section {current} / {last}"), ratio, theme)
    }

    pub fn with_marker(mut self, ratio: f64) -> Self {
        self.marker = Some(ratio.clamp(0.0, 1.0));
        self
    }
}

impl Widget for ProgressBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(format!(" {} ", self.label))
            .border_style(Style::default().fg(colors.border()));
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let filled_width = (self.ratio * inner.width as f64).round() as u16;
        let marker_x = self
            .marker
            .map(|m| inner.x + ((m * inner.width as f64) as u16).min(inner.width - 1));

        for x in inner.x..inner.x + inner.width {
            let style = if x < inner.x + filled_width {
                Style::default().fg(colors.bg()).bg(colors.bar_filled())
            } else {
                Style::default().fg(colors.fg()).bg(colors.bar_empty())
            };
            buf[(x, inner.y)].set_style(style);
            if Some(x) == marker_x {
                buf[(x, inner.y)].set_symbol("▏").set_fg(colors.warning());
            }
        }

        let label = format!("{:.0}%", self.ratio * 100.0);
        let label_x = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        buf.set_string(label_x, inner.y, &label, Style::default().fg(colors.fg()));
    }
}
