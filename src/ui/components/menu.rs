use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::content::SutraInfo;
use crate::ui::theme::Theme;

/// Entries on the home screen, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    Continue,
    Restart,
    Writing,
    NextSutra,
    Settings,
    Quit,
}

impl MenuAction {
    pub const ALL: [MenuAction; 6] = [
        MenuAction::Continue,
        MenuAction::Restart,
        MenuAction::Writing,
        MenuAction::NextSutra,
        MenuAction::Settings,
        MenuAction::Quit,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MenuAction::Continue => "Space",
            MenuAction::Restart => "0",
            MenuAction::Writing => "w",
            MenuAction::NextSutra => "n",
            MenuAction::Settings => "c",
            MenuAction::Quit => "q",
        }
    }
}

pub struct MenuItem {
    pub key: String,
    pub label: String,
    pub description: String,
}

pub struct Menu<'a> {
    pub title: String,
    pub subtitle: String,
    pub items: Vec<MenuItem>,
    pub selected: usize,
    pub theme: &'a Theme,
}

impl<'a> Menu<'a> {
    pub fn home(sutra: &SutraInfo, frontier: usize, selected: usize, theme: &'a Theme) -> Self {
        let last = sutra.total_sections().saturating_sub(1);
        let items = MenuAction::ALL
            .iter()
            .map(|&action| {
                let (label, description) = match action {
                    MenuAction::Continue => (
                        format!("Continue at section {frontier}"),
                        format!("{frontier} of {last} sections memorized"),
                    ),
                    MenuAction::Restart => (
                        "Recite from the beginning".to_string(),
                        "Start at the title; progress is kept".to_string(),
                    ),
                    MenuAction::Writing => (
                        "Writing test".to_string(),
                        "Draw each character of the current section".to_string(),
                    ),
                    MenuAction::NextSutra => (
                        "Switch sutra".to_string(),
                        "Cycle through the installed texts".to_string(),
                    ),
                    MenuAction::Settings => (
                        "Settings".to_string(),
                        "Mode, script, character form, speech, theme".to_string(),
                    ),
                    MenuAction::Quit => ("Quit".to_string(), String::new()),
                };
                MenuItem {
                    key: action.key().to_string(),
                    label,
                    description,
                }
            })
            .collect();

        Self {
            title: sutra.title_ja.clone(),
            subtitle: sutra.title_en.clone(),
            items,
            selected: selected.min(MenuAction::ALL.len() - 1),
            theme,
        }
    }

    pub fn next(selected: usize) -> usize {
        (selected + 1) % MenuAction::ALL.len()
    }

    pub fn prev(selected: usize) -> usize {
        if selected > 0 {
            selected - 1
        } else {
            MenuAction::ALL.len() - 1
        }
    }
}

impl Widget for &Menu<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        let title_lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                self.title.as_str(),
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                self.subtitle.as_str(),
                Style::default().fg(colors.fg()),
            )),
        ];
        Paragraph::new(title_lines)
            .alignment(Alignment::Center)
            .render(layout[0], buf);

        let menu_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                self.items
                    .iter()
                    .map(|_| Constraint::Length(2))
                    .collect::<Vec<_>>(),
            )
            .split(layout[2]);

        for (i, item) in self.items.iter().enumerate() {
            let is_selected = i == self.selected;
            let indicator = if is_selected { ">" } else { " " };

            let label_text = format!(" {indicator} [{}] {}", item.key, item.label);
            let label_style = if is_selected {
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors.fg())
            };

            let mut lines = vec![Line::from(Span::styled(label_text, label_style))];
            if !item.description.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("       {}", item.description),
                    Style::default().fg(colors.context()),
                )));
            }

            if i < menu_layout.len() {
                Paragraph::new(lines).render(menu_layout[i], buf);
            }
        }
    }
}
