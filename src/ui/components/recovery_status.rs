use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use crate::engine::{Recovery, RewindKind};
use crate::ui::theme::Theme;

/// Pass dots and the "N more through section T" line shown while a window is
/// being repeated.
pub struct RecoveryStatus<'a> {
    recovery: Recovery,
    rewind: Option<RewindKind>,
    theme: &'a Theme,
}

impl<'a> RecoveryStatus<'a> {
    pub fn new(recovery: Recovery, rewind: Option<RewindKind>, theme: &'a Theme) -> Self {
        Self {
            recovery,
            rewind,
            theme,
        }
    }

    pub fn message(&self) -> String {
        let left = self.recovery.passes_left;
        let passes = if left == 1 { "pass" } else { "passes" };
        format!(
            "{left} more {passes} through section {} to continue",
            self.recovery.target
        )
    }

    fn dots(&self) -> String {
        let done = self.recovery.passes_done() as usize;
        let total = self.recovery.passes_total as usize;
        let mut dots = "●".repeat(done);
        dots.push_str(&"○".repeat(total.saturating_sub(done)));
        dots
    }
}

impl Widget for RecoveryStatus<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let (cue, cue_style) = match self.rewind {
            Some(RewindKind::Fail) => (" ↺ again ", Style::default().fg(colors.error())),
            Some(RewindKind::Success) => (" ✓ pass ", Style::default().fg(colors.success())),
            None => ("", Style::default()),
        };
        let line = Line::from(vec![
            Span::styled(
                format!(" {} ", self.dots()),
                Style::default()
                    .fg(colors.warning())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(self.message(), Style::default().fg(colors.fg())),
            Span::styled(cue, cue_style),
        ]);
        Paragraph::new(line).render(area, buf);
    }
}
