use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine, Points};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::engine::CharStatus;
use crate::recognizer::normalize::CANVAS_SIZE;
use crate::recognizer::{Drawing, Point};
use crate::ui::theme::Theme;

/// Map a terminal cell inside the pad's border to pad coordinates
/// (origin top-left, `CANVAS_SIZE` on each axis). Cells outside give `None`.
pub fn cell_to_point(pad: Rect, column: u16, row: u16) -> Option<Point> {
    let inner = Block::bordered().inner(pad);
    if inner.width == 0
        || inner.height == 0
        || column < inner.x
        || row < inner.y
        || column >= inner.right()
        || row >= inner.bottom()
    {
        return None;
    }
    let x = (f64::from(column - inner.x) + 0.5) / f64::from(inner.width) * CANVAS_SIZE;
    let y = (f64::from(row - inner.y) + 0.5) / f64::from(inner.height) * CANVAS_SIZE;
    Some(Point::new(x, y))
}

/// The drawing surface: braille-resolution strokes inside a bordered box.
pub struct WritingPad<'a> {
    drawing: &'a Drawing,
    border: Color,
    title: String,
    theme: &'a Theme,
}

impl<'a> WritingPad<'a> {
    pub fn new(drawing: &'a Drawing, theme: &'a Theme) -> Self {
        Self {
            drawing,
            border: theme.colors.border_focused(),
            title: String::new(),
            theme,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn border(mut self, color: Color) -> Self {
        self.border = color;
        self
    }
}

impl Widget for WritingPad<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let ink = colors.ink();
        let guide = colors.accent_dim();
        let mid = CANVAS_SIZE / 2.0;
        let flip = |p: &Point| (p.x, CANVAS_SIZE - p.y);

        let mut block = Block::bordered().border_style(Style::default().fg(self.border));
        if !self.title.is_empty() {
            block = block.title(format!(" {} ", self.title));
        }

        Canvas::default()
            .block(block)
            .marker(Marker::Braille)
            .background_color(colors.bg())
            .x_bounds([0.0, CANVAS_SIZE])
            .y_bounds([0.0, CANVAS_SIZE])
            .paint(|ctx| {
                ctx.draw(&CanvasLine::new(mid, 0.0, mid, CANVAS_SIZE, guide));
                ctx.draw(&CanvasLine::new(0.0, mid, CANVAS_SIZE, mid, guide));
                ctx.layer();
                for stroke in self.drawing.strokes() {
                    if let [only] = stroke.as_slice() {
                        ctx.draw(&Points {
                            coords: &[flip(only)],
                            color: ink,
                        });
                        continue;
                    }
                    for pair in stroke.windows(2) {
                        let (x1, y1) = flip(&pair[0]);
                        let (x2, y2) = flip(&pair[1]);
                        ctx.draw(&CanvasLine::new(x1, y1, x2, y2, ink));
                    }
                }
            })
            .render(area, buf);
    }
}

/// One mark per character of the section being written.
pub struct StatusDots<'a> {
    statuses: &'a [CharStatus],
    theme: &'a Theme,
}

impl<'a> StatusDots<'a> {
    pub fn new(statuses: &'a [CharStatus], theme: &'a Theme) -> Self {
        Self { statuses, theme }
    }
}

impl Widget for StatusDots<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let spans: Vec<Span> = self
            .statuses
            .iter()
            .map(|status| {
                let (mark, color) = match status {
                    CharStatus::Pending => ("○ ", colors.context()),
                    CharStatus::Current => ("◉ ", colors.accent()),
                    CharStatus::Correct => ("● ", colors.success()),
                    CharStatus::Missed => ("✗ ", colors.error()),
                    CharStatus::Skipped => ("· ", colors.context()),
                };
                Span::styled(mark, Style::default().fg(color))
            })
            .collect();
        Paragraph::new(Line::from(spans))
            .alignment(ratatui::layout::Alignment::Center)
            .render(area, buf);
    }
}
