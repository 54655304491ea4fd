use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use ratatui::layout::Rect;
use tracing::{debug, info, warn};

use crate::config::{Config, KanjiForm, Script, StudyMode};
use crate::content::{Library, Section};
use crate::engine::{CheckOutcome, DrillEngine, DrillState, Transition, WritingSession};
use crate::recognizer::{Drawing, PatternRecognizer, Point, Recognizer};
use crate::speech::{self, CommandSpeaker, NullSpeaker, Speaker};
use crate::store::ProgressStore;
use crate::ui::components::menu::{Menu, MenuAction};
use crate::ui::layout::WritingLayout;
use crate::ui::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    Home,
    Drill,
    Writing,
    Settings,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsField {
    Mode,
    Script,
    KanjiForm,
    Speech,
    Glosses,
    Theme,
    Sutra,
}

impl SettingsField {
    pub const ALL: [SettingsField; 7] = [
        SettingsField::Mode,
        SettingsField::Script,
        SettingsField::KanjiForm,
        SettingsField::Speech,
        SettingsField::Glosses,
        SettingsField::Theme,
        SettingsField::Sutra,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SettingsField::Mode => "Study mode",
            SettingsField::Script => "Reading script",
            SettingsField::KanjiForm => "Character form",
            SettingsField::Speech => "Speak on reveal",
            SettingsField::Glosses => "Glosses",
            SettingsField::Theme => "Theme",
            SettingsField::Sutra => "Sutra",
        }
    }
}

fn cycle<T: PartialEq + Clone>(items: &[T], current: &T, forward: bool) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    let i = items.iter().position(|x| x == current).unwrap_or(0);
    let next = if forward {
        (i + 1) % items.len()
    } else {
        (i + items.len() - 1) % items.len()
    };
    items.get(next).cloned()
}

fn build_speaker(config: &Config) -> Box<dyn Speaker> {
    if !config.tts_enabled {
        return Box::new(NullSpeaker);
    }
    match config.tts_command.as_deref().and_then(CommandSpeaker::new) {
        Some(speaker) => Box::new(speaker),
        None => {
            warn!("speech is enabled but no tts_command is configured");
            Box::new(NullSpeaker)
        }
    }
}

fn load_recognizer(path: &Path) -> Result<Arc<dyn Recognizer>, String> {
    PatternRecognizer::load(path)
        .map(|r| Arc::new(r) as Arc<dyn Recognizer>)
        .map_err(|e| {
            warn!(path = %path.display(), error = %e, "stroke patterns unavailable");
            e.to_string()
        })
}

pub struct App {
    pub screen: AppScreen,
    pub config: Config,
    pub theme: Theme,
    pub library: Library,
    pub engine: DrillEngine,
    pub writing: Option<WritingSession>,
    pub drawing: Drawing,
    pub last_check: Option<CheckOutcome>,
    pub writing_error: Option<String>,
    pub notice: Option<String>,
    pub home_selected: usize,
    pub settings_selected: usize,
    pub confirm_reset: bool,
    pub viewport: Rect,
    pub should_quit: bool,
    /// Where the config is written when settings close; `None` keeps it in memory.
    pub config_path: Option<PathBuf>,
    settings_return: AppScreen,
    speaker: Box<dyn Speaker>,
    recognizer: Option<Result<Arc<dyn Recognizer>, String>>,
}

impl App {
    pub fn new(config: Config, library: Library, store: ProgressStore) -> Result<Self> {
        let Some(sutra) = library
            .get(&config.sutra)
            .or_else(|| library.sutras().first())
            .cloned()
        else {
            bail!("no sutras available");
        };
        let theme = Theme::load(&config.theme).unwrap_or_default();
        let speaker = build_speaker(&config);
        let engine = DrillEngine::new(sutra, store);

        Ok(Self {
            screen: AppScreen::Home,
            config,
            theme,
            library,
            engine,
            writing: None,
            drawing: Drawing::new(),
            last_check: None,
            writing_error: None,
            notice: None,
            home_selected: 0,
            settings_selected: 0,
            confirm_reset: false,
            viewport: Rect::default(),
            should_quit: false,
            config_path: None,
            settings_return: AppScreen::Home,
            speaker,
            recognizer: None,
        })
    }

    pub fn with_speaker(mut self, speaker: Box<dyn Speaker>) -> Self {
        self.speaker = speaker;
        self
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.recognizer = Some(Ok(recognizer));
        self
    }

    pub fn home_menu(&self) -> Menu<'_> {
        Menu::home(
            self.engine.sutra(),
            self.engine.progress().frontier,
            self.home_selected,
            &self.theme,
        )
    }

    pub fn home_action(&mut self, action: MenuAction) {
        self.notice = None;
        match action {
            MenuAction::Continue => self.start(Some(self.engine.progress().frontier)),
            MenuAction::Restart => self.start(None),
            MenuAction::Writing => {
                self.engine.start_drill(Some(self.engine.progress().frontier));
                self.begin_writing();
            }
            MenuAction::NextSutra => self.next_sutra(),
            MenuAction::Settings => self.go_to_settings(),
            MenuAction::Quit => self.should_quit = true,
        }
    }

    pub fn start(&mut self, from: Option<usize>) {
        self.engine.start_drill(from);
        if self.engine.run().is_none() {
            return;
        }
        if self.config.mode == StudyMode::Writing {
            self.begin_writing();
        } else {
            self.screen = AppScreen::Drill;
        }
    }

    pub fn reveal(&mut self) {
        if !self.engine.reveal() || !self.config.tts_enabled {
            return;
        }
        let said = self
            .engine
            .current_section()
            .and_then(|s| speech::utterance(s, self.config.mode));
        if let Some((text, lang)) = said {
            self.speaker.speak(&text, lang);
        }
    }

    /// Space on the drill screen: reveal, or pass once revealed.
    pub fn advance(&mut self) {
        match self.engine.state() {
            DrillState::Presenting => self.reveal(),
            DrillState::Revealed => self.assess(true),
            DrillState::Idle => {}
        }
    }

    pub fn assess(&mut self, got_it: bool) {
        let transition = self.engine.assess(got_it);
        self.after_transition(transition);
    }

    fn after_transition(&mut self, transition: Transition) {
        if transition == Transition::Completed {
            let title = self.engine.sutra().title_en.clone();
            info!(sutra = %self.engine.sutra().id, "recited to the end");
            self.notice = Some(format!("{title} recited to the end"));
            self.writing = None;
            self.screen = AppScreen::Home;
        }
    }

    pub fn go_home(&mut self) {
        self.engine.go_home();
        self.writing = None;
        self.drawing.clear();
        self.last_check = None;
        self.confirm_reset = false;
        self.screen = AppScreen::Home;
    }

    pub fn request_reset(&mut self) {
        self.confirm_reset = true;
    }

    pub fn answer_reset(&mut self, confirmed: bool) {
        self.confirm_reset = false;
        if confirmed {
            self.engine.reset_progress();
            self.go_home();
            self.notice = Some("Progress reset".to_string());
        }
    }

    pub fn next_sutra(&mut self) {
        let ids: Vec<String> = self.library.ids().iter().map(|s| s.to_string()).collect();
        if let Some(id) = cycle(&ids, &self.engine.sutra().id, true) {
            self.switch_sutra(&id);
        }
    }

    pub fn switch_sutra(&mut self, id: &str) {
        let Some(sutra) = self.library.get(id).cloned() else {
            warn!(sutra = id, "unknown sutra");
            return;
        };
        self.writing = None;
        self.engine.load_sutra(sutra);
        self.config.sutra = id.to_string();
    }

    // Writing test

    fn recognizer(&mut self) -> Result<Arc<dyn Recognizer>, String> {
        let path = PathBuf::from(&self.config.patterns_path);
        self.recognizer
            .get_or_insert_with(|| load_recognizer(&path))
            .clone()
    }

    /// Open a handwriting session over the run's section.
    pub fn begin_writing(&mut self) {
        self.drawing.clear();
        self.last_check = None;
        self.screen = AppScreen::Writing;

        let section: Option<Section> = self
            .engine
            .run()
            .and_then(|_| self.engine.current_section().cloned());
        let Some(section) = section else {
            self.writing = None;
            return;
        };
        match self.recognizer() {
            Ok(recognizer) => {
                self.writing_error = None;
                debug!(section = section.id, "writing session started");
                self.writing = Some(WritingSession::new(
                    section,
                    recognizer,
                    self.config.simplified(),
                ));
            }
            Err(e) => {
                self.writing = None;
                self.writing_error = Some(e);
            }
        }
    }

    /// Enter on the writing screen: check the drawing, then move on, then
    /// hand the section result to the drill once every character is done.
    pub fn writing_confirm(&mut self) {
        let Some(session) = self.writing.as_mut() else {
            return;
        };
        if session.is_finished() {
            self.finish_writing();
        } else if !session.is_checked() {
            if self.drawing.is_empty() {
                return;
            }
            self.last_check = session.check(&self.drawing);
        } else {
            session.next();
            self.drawing.clear();
            self.last_check = None;
        }
    }

    fn finish_writing(&mut self) {
        let Some(session) = self.writing.take() else {
            return;
        };
        let got_it = session.outcome().unwrap_or(false);
        let section_id = session.section().id;

        self.engine.reveal();
        let transition = self.engine.assess(got_it);
        if got_it {
            self.engine.mark_written(section_id);
        }
        info!(section = section_id, got_it, "writing test finished");
        self.drawing.clear();
        self.last_check = None;

        self.after_transition(transition);
        if transition == Transition::Completed {
            return;
        }
        if self.config.mode == StudyMode::Writing {
            self.begin_writing();
        } else {
            self.screen = AppScreen::Drill;
        }
    }

    pub fn pad_rect(&self) -> Rect {
        WritingLayout::new(self.viewport).pad
    }

    fn accepts_ink(&self) -> bool {
        self.writing
            .as_ref()
            .is_some_and(|s| !s.is_finished() && !s.is_checked())
    }

    pub fn pen_down(&mut self, p: Point) {
        if self.accepts_ink() {
            self.drawing.pen_down(p);
        }
    }

    pub fn pen_move(&mut self, p: Point) {
        if self.accepts_ink() {
            self.drawing.pen_move(p);
        }
    }

    pub fn pen_up(&mut self) {
        self.drawing.pen_up();
    }

    pub fn undo_stroke(&mut self) {
        if self.accepts_ink() {
            self.drawing.undo();
        }
    }

    pub fn clear_drawing(&mut self) {
        if self.accepts_ink() {
            self.drawing.clear();
        }
    }

    // Settings

    pub fn go_to_settings(&mut self) {
        if self.screen != AppScreen::Settings {
            self.settings_return = self.screen;
        }
        self.settings_selected = 0;
        self.screen = AppScreen::Settings;
    }

    pub fn leave_settings(&mut self) {
        if let Some(path) = &self.config_path
            && let Err(e) = self.config.save_to(path)
        {
            warn!(path = %path.display(), error = %e, "could not save settings");
        }
        self.screen = match self.settings_return {
            AppScreen::Drill if self.engine.run().is_some() => AppScreen::Drill,
            _ => AppScreen::Home,
        };
    }

    pub fn settings_fields(&self) -> Vec<(&'static str, String)> {
        SettingsField::ALL
            .iter()
            .map(|&field| {
                let value = match field {
                    SettingsField::Mode => self.config.mode.label().to_string(),
                    SettingsField::Script => match self.config.script {
                        Script::Romaji => "Romaji".to_string(),
                        Script::Kana => "Kana".to_string(),
                    },
                    SettingsField::KanjiForm => match self.config.kanji_form {
                        KanjiForm::Traditional => "Traditional".to_string(),
                        KanjiForm::Simplified => "Simplified".to_string(),
                    },
                    SettingsField::Speech => on_off(self.config.tts_enabled),
                    SettingsField::Glosses => on_off(self.config.show_glosses),
                    SettingsField::Theme => self.config.theme.clone(),
                    SettingsField::Sutra => self.engine.sutra().title_en.clone(),
                };
                (field.label(), value)
            })
            .collect()
    }

    pub fn settings_up(&mut self) {
        self.settings_selected = self.settings_selected.saturating_sub(1);
    }

    pub fn settings_down(&mut self) {
        self.settings_selected = (self.settings_selected + 1).min(SettingsField::ALL.len() - 1);
    }

    pub fn settings_cycle_forward(&mut self) {
        self.settings_cycle(true);
    }

    pub fn settings_cycle_backward(&mut self) {
        self.settings_cycle(false);
    }

    fn settings_cycle(&mut self, forward: bool) {
        let Some(&field) = SettingsField::ALL.get(self.settings_selected) else {
            return;
        };
        match field {
            SettingsField::Mode => {
                if let Some(mode) = cycle(&StudyMode::ALL, &self.config.mode, forward) {
                    self.config.mode = mode;
                }
            }
            SettingsField::Script => {
                self.config.script = match self.config.script {
                    Script::Romaji => Script::Kana,
                    Script::Kana => Script::Romaji,
                };
            }
            SettingsField::KanjiForm => {
                self.config.kanji_form = match self.config.kanji_form {
                    KanjiForm::Traditional => KanjiForm::Simplified,
                    KanjiForm::Simplified => KanjiForm::Traditional,
                };
            }
            SettingsField::Speech => {
                self.config.tts_enabled = !self.config.tts_enabled;
                self.speaker = build_speaker(&self.config);
            }
            SettingsField::Glosses => self.config.show_glosses = !self.config.show_glosses,
            SettingsField::Theme => {
                let themes = Theme::available_themes();
                if let Some(name) = cycle(&themes, &self.config.theme, forward)
                    && let Some(theme) = Theme::load(&name)
                {
                    self.theme = theme;
                    self.config.theme = name;
                }
            }
            SettingsField::Sutra => {
                let ids: Vec<String> =
                    self.library.ids().iter().map(|s| s.to_string()).collect();
                if let Some(id) = cycle(&ids, &self.engine.sutra().id, forward) {
                    self.switch_sutra(&id);
                    self.settings_return = AppScreen::Home;
                }
            }
        }
        debug!(field = field.label(), "setting changed");
    }
}

fn on_off(value: bool) -> String {
    if value { "On" } else { "Off" }.to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::speech::Lang;
    use crate::store::{DrillProgress, KeyValueStore, MemoryStore};

    /// One stroke reads as any known character, more strokes read as nothing.
    struct OneStroke;

    impl Recognizer for OneStroke {
        fn can_recognize(&self, ch: char) -> bool {
            ch != '四'
        }

        fn expected_strokes(&self, _ch: char) -> Option<usize> {
            Some(1)
        }

        fn recognize(&self, drawing: &Drawing) -> Vec<char> {
            if drawing.stroke_count() != 1 {
                return Vec::new();
            }
            "弘誓願衆生無邊度".chars().collect()
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(String, Lang)>>>);

    impl Speaker for Recorder {
        fn speak(&mut self, text: &str, lang: Lang) {
            if let Ok(mut said) = self.0.lock() {
                said.push((text.to_string(), lang));
            }
        }
    }

    fn app_with(config: Config) -> App {
        App::new(
            config,
            Library::bundled(),
            ProgressStore::new(Box::new(MemoryStore::new())),
        )
        .unwrap()
        .with_recognizer(Arc::new(OneStroke))
    }

    fn vows() -> App {
        let config = Config {
            sutra: "four-great-vows".to_string(),
            ..Config::default()
        };
        app_with(config)
    }

    fn section(app: &App) -> usize {
        app.engine.run().unwrap().section_id
    }

    fn stroke(app: &mut App, strokes: usize) {
        for i in 0..strokes {
            let y = 40.0 + 60.0 * i as f64;
            app.pen_down(Point::new(30.0, y));
            app.pen_move(Point::new(220.0, y));
            app.pen_up();
        }
    }

    #[test]
    fn test_space_reveals_then_passes() {
        let mut app = vows();
        app.home_action(MenuAction::Continue);
        assert_eq!(app.screen, AppScreen::Drill);
        assert_eq!(section(&app), 0);

        app.advance();
        assert_eq!(app.engine.state(), DrillState::Revealed);
        app.advance();
        assert_eq!(section(&app), 1);
        assert_eq!(app.engine.progress().frontier, 1);
    }

    #[test]
    fn test_completion_returns_home_with_notice() {
        let mut app = vows();
        app.start(Some(4));
        app.advance();
        app.advance();
        assert_eq!(app.screen, AppScreen::Home);
        assert_eq!(app.engine.state(), DrillState::Idle);
        assert!(app.notice.as_deref().unwrap().contains("Four Great Vows"));
    }

    #[test]
    fn test_miss_enters_recovery_and_home_keeps_frontier() {
        let mut app = vows();
        app.start(Some(0));
        app.advance();
        app.advance();
        app.reveal();
        app.assess(false);
        assert_eq!(app.engine.recovery().unwrap().target, 1);
        assert_eq!(section(&app), 0);

        app.go_home();
        assert_eq!(app.screen, AppScreen::Home);
        assert!(app.engine.recovery().is_none());
        assert_eq!(app.engine.progress().frontier, 1);
    }

    #[test]
    fn test_reset_needs_confirmation() {
        let mut app = vows();
        app.start(None);
        app.advance();
        app.advance();
        app.request_reset();
        app.answer_reset(false);
        assert_eq!(app.engine.progress().frontier, 1);
        assert!(!app.confirm_reset);

        app.request_reset();
        app.answer_reset(true);
        assert_eq!(app.engine.progress(), DrillProgress::default());
        assert_eq!(app.screen, AppScreen::Home);
    }

    #[test]
    fn test_reveal_speaks_kana_when_enabled() {
        let recorder = Recorder::default();
        let config = Config {
            sutra: "four-great-vows".to_string(),
            tts_enabled: true,
            ..Config::default()
        };
        let mut app = app_with(config).with_speaker(Box::new(recorder.clone()));
        app.start(Some(1));
        app.reveal();
        app.reveal();

        let said = recorder.0.lock().unwrap();
        assert_eq!(said.len(), 1);
        assert_eq!(said[0].1, Lang::Japanese);
        assert!(said[0].0.starts_with("しゅじょう"));
    }

    #[test]
    fn test_settings_cycle_mode_theme_and_sutra() {
        let mut app = vows();
        app.go_to_settings();
        app.settings_cycle_forward();
        assert_eq!(app.config.mode, StudyMode::Kanji);
        app.settings_cycle_backward();
        app.settings_cycle_backward();
        assert_eq!(app.config.mode, StudyMode::Writing);

        app.settings_selected = 5;
        let before = app.config.theme.clone();
        app.settings_cycle_forward();
        assert_ne!(app.config.theme, before);
        assert_eq!(app.theme.name, app.config.theme);

        app.settings_selected = 6;
        app.settings_cycle_forward();
        assert_eq!(app.engine.sutra().id, "heart-sutra");
        assert_eq!(app.config.sutra, "heart-sutra");

        let fields = app.settings_fields();
        assert_eq!(fields.len(), SettingsField::ALL.len());
        assert_eq!(fields[0], ("Study mode", "Writing".to_string()));

        app.leave_settings();
        assert_eq!(app.screen, AppScreen::Home);
    }

    #[test]
    fn test_settings_return_to_active_drill() {
        let mut app = vows();
        app.start(Some(2));
        app.go_to_settings();
        app.settings_selected = 1;
        app.settings_cycle_forward();
        assert_eq!(app.config.script, Script::Kana);
        app.leave_settings();
        assert_eq!(app.screen, AppScreen::Drill);
        assert_eq!(section(&app), 2);
    }

    #[test]
    fn test_writing_mode_checks_each_character_and_advances() {
        let config = Config {
            sutra: "four-great-vows".to_string(),
            mode: StudyMode::Writing,
            ..Config::default()
        };
        let mut app = app_with(config);
        app.start(Some(0));
        assert_eq!(app.screen, AppScreen::Writing);

        // 四 has no pattern and is skipped; 弘誓願 remain.
        for _ in 0..3 {
            stroke(&mut app, 1);
            app.writing_confirm();
            assert_eq!(app.last_check, Some(CheckOutcome::Correct));
            app.writing_confirm();
        }
        assert!(app.writing.as_ref().unwrap().is_finished());
        app.writing_confirm();

        assert_eq!(app.screen, AppScreen::Writing);
        assert_eq!(section(&app), 1);
        assert!(app.engine.writing_progress().contains(0));
        assert_eq!(app.engine.progress().frontier, 1);
        assert_eq!(app.writing.as_ref().unwrap().section().id, 1);
    }

    #[test]
    fn test_writing_miss_fails_the_section() {
        let mut app = vows();
        app.start(Some(1));
        app.begin_writing();
        stroke(&mut app, 2);
        app.writing_confirm();
        assert!(matches!(app.last_check, Some(CheckOutcome::Missed { .. })));
        app.writing_confirm();

        for _ in 1..7 {
            stroke(&mut app, 1);
            app.writing_confirm();
            app.writing_confirm();
        }
        assert_eq!(app.writing.as_ref().unwrap().outcome(), Some(false));
        app.writing_confirm();

        assert_eq!(app.screen, AppScreen::Drill);
        assert_eq!(app.engine.recovery().unwrap().target, 1);
        assert!(!app.engine.writing_progress().contains(1));
    }

    #[test]
    fn test_empty_drawing_is_not_checked() {
        let mut app = vows();
        app.start(Some(1));
        app.begin_writing();
        app.writing_confirm();
        assert!(app.last_check.is_none());
        assert!(!app.writing.as_ref().unwrap().is_checked());
    }

    #[test]
    fn test_missing_patterns_is_a_writing_screen_error() {
        let config = Config {
            sutra: "four-great-vows".to_string(),
            patterns_path: "/nonexistent/ref-patterns.json".to_string(),
            ..Config::default()
        };
        let mut app = App::new(
            config,
            Library::bundled(),
            ProgressStore::new(Box::new(MemoryStore::new())),
        )
        .unwrap();
        app.home_action(MenuAction::Writing);
        assert_eq!(app.screen, AppScreen::Writing);
        assert!(app.writing.is_none());
        assert!(app.writing_error.is_some());

        app.go_home();
        app.home_action(MenuAction::Continue);
        assert_eq!(app.screen, AppScreen::Drill);
    }

    #[test]
    fn test_next_sutra_keeps_progress_per_sutra() {
        let mut app = vows();
        app.start(None);
        app.advance();
        app.advance();
        app.go_home();
        app.home_action(MenuAction::NextSutra);
        assert_eq!(app.engine.sutra().id, "heart-sutra");
        assert_eq!(app.engine.progress().frontier, 0);
        app.home_action(MenuAction::NextSutra);
        assert_eq!(app.engine.progress().frontier, 1);
        assert!(
            app.engine
                .store()
                .raw()
                .get("drill-progress/four-great-vows")
                .is_some()
        );
    }

    #[test]
    fn test_unknown_configured_sutra_falls_back() {
        let config = Config {
            sutra: "lotus".to_string(),
            ..Config::default()
        };
        let app = app_with(config);
        assert_eq!(app.engine.sutra().id, "heart-sutra");
    }

    #[test]
    fn test_empty_library_is_an_error() {
        let result = App::new(
            Config::default(),
            Library::default(),
            ProgressStore::new(Box::new(MemoryStore::new())),
        );
        assert!(result.is_err());
    }
}
