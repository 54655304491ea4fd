use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sutradrill::app::{App, AppScreen};
use sutradrill::config::Config;
use sutradrill::content::Library;
use sutradrill::engine::{CheckOutcome, DrillEngine, DrillState};
use sutradrill::event::{AppEvent, EventHandler};
use sutradrill::store::{JsonStore, ProgressStore};
use sutradrill::ui;
use sutradrill::ui::components::menu::{Menu, MenuAction};
use sutradrill::ui::components::progress_bar::ProgressBar;
use sutradrill::ui::components::recovery_status::RecoveryStatus;
use sutradrill::ui::components::section_view::{DisplayOptions, SectionView};
use sutradrill::ui::components::writing_pad::{StatusDots, WritingPad, cell_to_point};
use sutradrill::ui::layout::{AppLayout, WritingLayout, pack_hint_lines};
use sutradrill::ui::theme::Theme;

#[derive(Parser)]
#[command(
    name = "sutradrill",
    version,
    about = "Terminal recitation drill for memorizing chanted sutras"
)]
struct Cli {
    #[arg(short, long, help = "Sutra id to drill (heart-sutra, four-great-vows, ...)")]
    sutra: Option<String>,

    #[arg(long, value_name = "FILE", help = "Add a sutra from a JSON file; its id is the file name")]
    content: Vec<PathBuf>,

    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(long, value_name = "DIR", help = "Directory for progress records")]
    data_dir: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Stroke reference patterns for the writing test")]
    patterns: Option<PathBuf>,

    #[arg(long, value_name = "FILE", conflicts_with_all = ["import", "reset"], help = "Write all progress to a JSON file and exit")]
    export: Option<PathBuf>,

    #[arg(long, value_name = "FILE", conflicts_with = "reset", help = "Load progress from an export file and exit")]
    import: Option<PathBuf>,

    #[arg(long, help = "Forget progress for the selected sutra and exit")]
    reset: bool,

    #[arg(long, value_name = "FILE", help = "Append logs to this file (RUST_LOG sets the level)")]
    log_file: Option<PathBuf>,
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        // The terminal belongs to the TUI.
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .init(),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "unreadable config, using defaults");
        Config::default()
    });

    let mut library = Library::bundled();
    for path in &cli.content {
        let sutra = library.load_file(path)?;
        info!(sutra = %sutra.id, sections = sutra.total_sections(), "loaded content file");
    }
    if library.is_empty() {
        bail!("no sutra content could be loaded");
    }

    if let Some(id) = cli.sutra {
        if library.get(&id).is_none() {
            bail!("unknown sutra {id:?}; available: {}", library.ids().join(", "));
        }
        config.sutra = id;
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(path) = cli.patterns {
        config.patterns_path = path.to_string_lossy().into_owned();
    }

    let mut themes = Theme::available_themes();
    if Theme::load(&config.theme).is_some() {
        themes.push(config.theme.clone());
    }
    let theme_names: Vec<&str> = themes.iter().map(String::as_str).collect();
    config.normalize(&library.ids(), &theme_names);

    let store = JsonStore::with_base_dir(PathBuf::from(&config.data_dir))
        .with_context(|| format!("opening data directory {}", config.data_dir))?;
    store.clean_stale_temp_files();
    let mut progress = ProgressStore::new(Box::new(store));

    if let Some(path) = &cli.export {
        progress.export_to(&library.ids(), path)?;
        println!("Exported progress to {}", path.display());
        return Ok(());
    }
    if let Some(path) = &cli.import {
        progress.import_from(path)?;
        println!("Imported progress from {}", path.display());
        return Ok(());
    }
    if cli.reset {
        let Some(sutra) = library.get(&config.sutra).cloned() else {
            bail!("unknown sutra {:?}", config.sutra);
        };
        let title = sutra.title_en.clone();
        DrillEngine::new(sutra, progress).reset_progress();
        println!("Reset progress for {title}");
        return Ok(());
    }

    let mut app = App::new(config, library, progress)?;
    app.config_path = Some(Config::config_path());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(Duration::from_millis(100));

    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        error!(error = %err, "exited with error");
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        let size = terminal.size()?;
        app.viewport = Rect::new(0, 0, size.width, size.height);
        terminal.draw(|frame| render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
            AppEvent::Tick | AppEvent::Resize(_, _) => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    if app.confirm_reset {
        match key.code {
            KeyCode::Char('y') => app.answer_reset(true),
            KeyCode::Char('n') | KeyCode::Esc => app.answer_reset(false),
            _ => {}
        }
        return;
    }

    match app.screen {
        AppScreen::Home => handle_home_key(app, key),
        AppScreen::Drill => handle_drill_key(app, key),
        AppScreen::Writing => handle_writing_key(app, key),
        AppScreen::Settings => handle_settings_key(app, key),
    }
}

fn handle_home_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Up | KeyCode::Char('k') => app.home_selected = Menu::prev(app.home_selected),
        KeyCode::Down | KeyCode::Char('j') => app.home_selected = Menu::next(app.home_selected),
        KeyCode::Enter => {
            if let Some(&action) = MenuAction::ALL.get(app.home_selected) {
                app.home_action(action);
            }
        }
        KeyCode::Char(' ') => app.home_action(MenuAction::Continue),
        KeyCode::Char('0') => app.home_action(MenuAction::Restart),
        KeyCode::Char('w') => app.home_action(MenuAction::Writing),
        KeyCode::Char('n') => app.home_action(MenuAction::NextSutra),
        KeyCode::Char('c') => app.home_action(MenuAction::Settings),
        KeyCode::Char('r') => app.request_reset(),
        _ => {}
    }
}

fn handle_drill_key(app: &mut App, key: KeyEvent) {
    let revealed = app.engine.state() == DrillState::Revealed;
    match key.code {
        KeyCode::Esc => app.go_home(),
        KeyCode::Char(' ') => app.advance(),
        KeyCode::Char('1') if revealed => app.assess(false),
        KeyCode::Char('2') if revealed => app.assess(true),
        KeyCode::Char('w') => app.begin_writing(),
        KeyCode::Char('c') => app.go_to_settings(),
        KeyCode::Char('r') => app.request_reset(),
        _ => {}
    }
}

fn handle_writing_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.go_home(),
        KeyCode::Enter | KeyCode::Char(' ') => app.writing_confirm(),
        KeyCode::Backspace | KeyCode::Char('u') => app.undo_stroke(),
        KeyCode::Delete | KeyCode::Char('x') => app.clear_drawing(),
        _ => {}
    }
}

fn handle_settings_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.leave_settings(),
        KeyCode::Up | KeyCode::Char('k') => app.settings_up(),
        KeyCode::Down | KeyCode::Char('j') => app.settings_down(),
        KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => app.settings_cycle_forward(),
        KeyCode::Left | KeyCode::Char('h') => app.settings_cycle_backward(),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.screen != AppScreen::Writing {
        return;
    }
    let pad = app.pad_rect();
    let point = cell_to_point(pad, mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(p) = point {
                app.pen_down(p);
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if let Some(p) = point {
                app.pen_move(p);
            }
        }
        MouseEventKind::Up(MouseButton::Left) => app.pen_up(),
        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    match app.screen {
        AppScreen::Home => render_home(frame, app),
        AppScreen::Drill => render_drill(frame, app),
        AppScreen::Writing => render_writing(frame, app),
        AppScreen::Settings => render_settings(frame, app),
    }
}

fn render_header(frame: &mut ratatui::Frame, area: Rect, app: &App, detail: &str) {
    let colors = &app.theme.colors;
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " sutradrill ",
            Style::default()
                .fg(colors.header_fg())
                .bg(colors.header_bg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            detail.to_string(),
            Style::default().fg(colors.header_fg()).bg(colors.header_bg()),
        ),
    ]))
    .style(Style::default().bg(colors.header_bg()));
    frame.render_widget(header, area);
}

fn render_footer(frame: &mut ratatui::Frame, area: Rect, app: &App, hints: &[&str]) {
    let colors = &app.theme.colors;
    if app.confirm_reset {
        let prompt = format!(
            "  Reset all progress for {}? [y] Yes  [n] No",
            app.engine.sutra().title_en
        );
        let footer = Paragraph::new(Line::from(Span::styled(
            prompt,
            Style::default()
                .fg(colors.warning())
                .add_modifier(Modifier::BOLD),
        )));
        frame.render_widget(footer, area);
        return;
    }
    let lines: Vec<Line> = pack_hint_lines(hints, area.width as usize)
        .into_iter()
        .map(|l| Line::from(Span::styled(l, Style::default().fg(colors.context()))))
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

fn sutra_summary(app: &App) -> String {
    let engine = &app.engine;
    format!(
        " {} | {} | {}/{} memorized | {} written",
        engine.sutra().title_en,
        app.config.mode.label(),
        engine.progress().frontier,
        engine.total_sections().saturating_sub(1),
        engine.writing_progress().len(),
    )
}

fn render_home(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(area);

    render_header(frame, layout[0], app, &sutra_summary(app));

    let menu_area = ui::layout::centered_rect(50, 80, layout[1]);
    frame.render_widget(&app.home_menu(), menu_area);

    if let Some(notice) = &app.notice {
        let line = Paragraph::new(Line::from(Span::styled(
            notice.as_str(),
            Style::default()
                .fg(colors.success())
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center);
        frame.render_widget(line, layout[2]);
    }

    render_footer(
        frame,
        layout[3],
        app,
        &[
            "[Space] Continue",
            "[0] From the start",
            "[w] Write",
            "[n] Next sutra",
            "[c] Settings",
            "[r] Reset",
            "[q] Quit",
        ],
    );
}

fn render_drill(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;
    let app_layout = AppLayout::new(area);
    let engine = &app.engine;

    render_header(frame, app_layout.header, app, &sutra_summary(app));

    let Some(run) = engine.run() else {
        return;
    };
    let last = engine.total_sections().saturating_sub(1);

    if let Some(progress_area) = app_layout.progress {
        let bar = ProgressBar::sections(run.section_id, last, &app.theme)
            .with_marker(engine.frontier_ratio());
        frame.render_widget(bar, progress_area);
    }

    let block = Block::bordered()
        .title(format!(" Section {} ", run.section_id))
        .border_style(Style::default().fg(colors.border()));
    let inner = block.inner(app_layout.main);
    frame.render_widget(block, app_layout.main);

    let recovery = engine.recovery();
    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(if recovery.is_some() { 1 } else { 0 }),
        ])
        .split(inner);

    let opts = DisplayOptions::from_config(&app.config, app_layout.tier);
    let previous = engine.previous_sections();
    let shown = app_layout.tier.context_sections(area.height).min(previous.len());
    let context = &previous[previous.len() - shown..];

    let Some(section) = engine.current_section() else {
        return;
    };
    let current = SectionView::current(section, opts, run.revealed, &app.theme);

    let width = body[0].width;
    let mut constraints: Vec<Constraint> = context
        .iter()
        .map(|s| Constraint::Length(SectionView::context(s, opts, &app.theme).height(width)))
        .collect();
    if !context.is_empty() {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(current.height(width)));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(body[0]);

    for (i, s) in context.iter().enumerate() {
        frame.render_widget(SectionView::context(s, opts, &app.theme), rows[i]);
    }
    if let Some(&current_area) = rows.last() {
        frame.render_widget(current, current_area);
    }

    if let Some(recovery) = recovery {
        let cue = engine.rewind_cue().map(|c| c.kind);
        frame.render_widget(RecoveryStatus::new(recovery, cue, &app.theme), body[1]);
    }

    let hints: &[&str] = if run.revealed {
        &["[1] Missed", "[2]/[Space] Got it", "[w] Write", "[c] Settings", "[r] Reset", "[Esc] Home"]
    } else {
        &["[Space] Reveal", "[w] Write", "[c] Settings", "[r] Reset", "[Esc] Home"]
    };
    render_footer(frame, app_layout.footer, app, hints);
}

fn render_writing(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;
    let layout = WritingLayout::new(area);

    render_header(frame, layout.header, app, &sutra_summary(app));

    let Some(session) = app.writing.as_ref() else {
        let message = match &app.writing_error {
            Some(e) => format!(
                "Handwriting is unavailable: {e}\nSet patterns_path in the config or pass --patterns."
            ),
            None => "No section to write.".to_string(),
        };
        let body = Paragraph::new(message)
            .style(Style::default().fg(colors.error()))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(body, ui::layout::centered_rect(60, 30, area));
        render_footer(frame, layout.footer, app, &["[Esc] Home"]);
        return;
    };

    let cue = session.reading_cue(app.config.kana());
    let dim = Style::default().fg(colors.context());
    let progress_text = match (session.is_finished(), session.expected_strokes()) {
        (true, _) => format!("Section {} done", session.section().id),
        (false, Some(n)) => format!(
            "Character {} of {} · {n} strokes",
            session.current_index() + 1,
            session.statuses().len()
        ),
        (false, None) => format!(
            "Character {} of {}",
            session.current_index() + 1,
            session.statuses().len()
        ),
    };
    let cue_lines = vec![
        Line::from(vec![
            Span::styled(cue.before, dim),
            Span::styled(
                cue.current,
                Style::default()
                    .fg(colors.reading())
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            ),
            Span::styled(cue.after, dim),
        ]),
        Line::from(Span::styled(progress_text, dim)),
    ];
    frame.render_widget(
        Paragraph::new(cue_lines).alignment(Alignment::Center),
        layout.cue,
    );

    frame.render_widget(StatusDots::new(session.statuses(), &app.theme), layout.dots);

    let border = match app.last_check {
        Some(CheckOutcome::Correct) => colors.success(),
        Some(CheckOutcome::Missed { .. }) => colors.error(),
        None => colors.border_focused(),
    };
    frame.render_widget(
        WritingPad::new(&app.drawing, &app.theme)
            .title(format!("{} strokes", app.drawing.stroke_count()))
            .border(border),
        layout.pad,
    );

    let target = session.target().map(String::from).unwrap_or_default();
    let feedback = match (&app.last_check, session.outcome()) {
        (_, Some(true)) => Line::from(Span::styled(
            "Section written correctly. [Enter] continue",
            Style::default().fg(colors.success()),
        )),
        (_, Some(false)) => Line::from(Span::styled(
            "Some characters were missed. [Enter] continue",
            Style::default().fg(colors.error()),
        )),
        (Some(CheckOutcome::Correct), None) => Line::from(Span::styled(
            format!("✓ {target}"),
            Style::default()
                .fg(colors.success())
                .add_modifier(Modifier::BOLD),
        )),
        (Some(CheckOutcome::Missed { candidates }), None) => {
            let read_as: String = candidates.iter().take(5).collect();
            let read_as = if read_as.is_empty() {
                "nothing".to_string()
            } else {
                read_as
            };
            Line::from(Span::styled(
                format!("✗ expected {target}, read as {read_as}"),
                Style::default().fg(colors.error()),
            ))
        }
        (None, None) => Line::from(""),
    };
    frame.render_widget(
        Paragraph::new(feedback).alignment(Alignment::Center),
        layout.feedback,
    );

    let hints: &[&str] = if session.is_checked() || session.is_finished() {
        &["[Enter] Next", "[Esc] Home"]
    } else {
        &["[Enter] Check", "[u] Undo stroke", "[x] Clear", "[Esc] Home"]
    };
    render_footer(frame, layout.footer, app, hints);
}

fn render_settings(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let centered = ui::layout::centered_rect(60, 80, area);

    let block = Block::bordered()
        .title(" Settings ")
        .border_style(Style::default().fg(colors.accent()))
        .style(Style::default().bg(colors.bg()));
    let inner = block.inner(centered);
    block.render(centered, frame.buffer_mut());

    let fields = app.settings_fields();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(fields.len() as u16 * 2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(inner);

    let header = Paragraph::new(Line::from(Span::styled(
        "  Use arrows to navigate, Enter/Right to change, ESC to save & exit",
        Style::default().fg(colors.context()),
    )));
    header.render(layout[0], frame.buffer_mut());

    let field_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(fields.iter().map(|_| Constraint::Length(2)).collect::<Vec<_>>())
        .split(layout[1]);

    for (i, (label, value)) in fields.iter().enumerate() {
        let is_selected = i == app.settings_selected;
        let indicator = if is_selected { " > " } else { "   " };

        let label_style = if is_selected {
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.fg())
        };
        let value_style = Style::default().fg(if is_selected {
            colors.reading()
        } else {
            colors.context()
        });

        let line = Line::from(vec![
            Span::styled(format!("{indicator}{label}:"), label_style),
            Span::styled(format!("  < {value} >"), value_style),
        ]);
        if let Some(&field_area) = field_layout.get(i) {
            Paragraph::new(line).render(field_area, frame.buffer_mut());
        }
    }

    let footer = Paragraph::new(Line::from(Span::styled(
        "  [ESC] Save & back  [Enter/arrows] Change value",
        Style::default().fg(colors.accent()),
    )));
    footer.render(layout[3], frame.buffer_mut());
}
