use std::process::{Child, Command, Stdio};

use tracing::{debug, warn};

use crate::config::StudyMode;
use crate::content::Section;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lang {
    Japanese,
    Mandarin,
}

impl Lang {
    pub fn code(self) -> &'static str {
        match self {
            Lang::Japanese => "ja-JP",
            Lang::Mandarin => "zh-CN",
        }
    }
}

pub trait Speaker {
    fn speak(&mut self, text: &str, lang: Lang);
}

/// Speech disabled.
pub struct NullSpeaker;

impl Speaker for NullSpeaker {
    fn speak(&mut self, _text: &str, _lang: Lang) {}
}

/// What to say when a section is revealed in the given mode, if anything.
pub fn utterance(section: &Section, mode: StudyMode) -> Option<(String, Lang)> {
    let lang = match mode {
        StudyMode::Readings | StudyMode::Kanji => Lang::Japanese,
        StudyMode::Mandarin => Lang::Mandarin,
        _ => return None,
    };
    let text = section
        .chunks
        .iter()
        .map(|c| match lang {
            Lang::Japanese => c.ja_kana.as_str(),
            Lang::Mandarin => c.zh.as_str(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    Some((text, lang))
}

/// Runs an external TTS program. Each whitespace-separated word of the
/// template is one argument; `{lang}` and `{text}` are substituted inside
/// words, so `{text}` always stays a single argument.
pub struct CommandSpeaker {
    template: Vec<String>,
    current: Option<Child>,
}

impl CommandSpeaker {
    pub fn new(template: &str) -> Option<Self> {
        let template: Vec<String> = template.split_whitespace().map(str::to_string).collect();
        if template.is_empty() {
            return None;
        }
        Some(Self {
            template,
            current: None,
        })
    }

    pub fn command_line(&self, text: &str, lang: Lang) -> Vec<String> {
        self.template
            .iter()
            .map(|word| word.replace("{lang}", lang.code()).replace("{text}", text))
            .collect()
    }

    /// Stop the previous utterance so readings don't pile up.
    fn cancel(&mut self) {
        if let Some(mut child) = self.current.take() {
            if let Ok(None) = child.try_wait() {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&mut self, text: &str, lang: Lang) {
        self.cancel();
        let argv = self.command_line(text, lang);
        let Some((program, args)) = argv.split_first() else {
            return;
        };
        match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => {
                debug!(program, lang = lang.code(), "speaking");
                self.current = Some(child);
            }
            Err(e) => warn!(program, error = %e, "could not start speech command"),
        }
    }
}

impl Drop for CommandSpeaker {
    fn drop(&mut self) {
        self.cancel();
    }
}
