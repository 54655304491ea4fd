use std::sync::Arc;

use tracing::debug;

use crate::content::{Character, Section};
use crate::recognizer::{Drawing, Recognizer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharStatus {
    Pending,
    Current,
    Correct,
    Missed,
    Skipped,
}

/// The section's chunk readings split around the character being written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadingCue {
    pub before: String,
    pub current: String,
    pub after: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    Correct,
    Missed { candidates: Vec<char> },
}

/// Handwriting test over one section, character by character.
pub struct WritingSession {
    section: Section,
    recognizer: Arc<dyn Recognizer>,
    simplified: bool,
    index: usize,
    statuses: Vec<CharStatus>,
    candidates: Vec<char>,
    checked: bool,
    had_miss: bool,
}

impl WritingSession {
    pub fn new(section: Section, recognizer: Arc<dyn Recognizer>, simplified: bool) -> Self {
        let statuses = vec![CharStatus::Pending; section.characters.len()];
        let mut session = Self {
            section,
            recognizer,
            simplified,
            index: 0,
            statuses,
            candidates: Vec::new(),
            checked: false,
            had_miss: false,
        };
        session.settle();
        session
    }

    pub fn section(&self) -> &Section {
        &self.section
    }

    pub fn statuses(&self) -> &[CharStatus] {
        &self.statuses
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current_character(&self) -> Option<&Character> {
        self.section.characters.get(self.index)
    }

    /// The face the user is asked to write.
    pub fn target(&self) -> Option<char> {
        self.current_character().map(|c| c.display(self.simplified))
    }

    pub fn expected_strokes(&self) -> Option<usize> {
        let c = self.current_character()?;
        self.recognizer
            .expected_strokes(c.display(self.simplified))
            .or_else(|| {
                c.alternate(self.simplified)
                    .and_then(|alt| self.recognizer.expected_strokes(alt))
            })
    }

    /// Candidates from the last check of the current character.
    pub fn candidates(&self) -> &[char] {
        &self.candidates
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.statuses.len()
    }

    /// `Some(got_it)` once every character has been written or skipped.
    pub fn outcome(&self) -> Option<bool> {
        self.is_finished().then_some(!self.had_miss)
    }

    fn recognizable(&self, c: &Character) -> bool {
        self.recognizer.can_recognize(c.display(self.simplified))
            || c
                .alternate(self.simplified)
                .is_some_and(|alt| self.recognizer.can_recognize(alt))
    }

    /// Skip forward past characters the recognizer has no pattern for, then
    /// mark the next one current.
    fn settle(&mut self) {
        while let Some(c) = self.section.characters.get(self.index) {
            if self.recognizable(c) {
                self.statuses[self.index] = CharStatus::Current;
                return;
            }
            debug!(
                section = self.section.id,
                position = self.index,
                ch = %c.display(self.simplified),
                "no stroke pattern, skipping"
            );
            self.statuses[self.index] = CharStatus::Skipped;
            self.index += 1;
        }
    }

    /// Grade the drawing against the current character. Either form is
    /// accepted. Returns `None` if already checked or finished.
    pub fn check(&mut self, drawing: &Drawing) -> Option<CheckOutcome> {
        if self.checked {
            return None;
        }
        let c = self.current_character()?;
        let shown = c.display(self.simplified);
        let alternate = c.alternate(self.simplified);

        let candidates = self.recognizer.recognize(drawing);
        let correct = candidates
            .iter()
            .any(|&r| r == shown || Some(r) == alternate);
        debug!(
            section = self.section.id,
            position = self.index,
            target = %shown,
            correct,
            "checked drawing"
        );

        self.checked = true;
        self.candidates = candidates;
        if correct {
            self.statuses[self.index] = CharStatus::Correct;
            Some(CheckOutcome::Correct)
        } else {
            self.had_miss = true;
            self.statuses[self.index] = CharStatus::Missed;
            Some(CheckOutcome::Missed {
                candidates: self.candidates.clone(),
            })
        }
    }

    /// Move past a checked character. Returns true when the session is done.
    pub fn next(&mut self) -> bool {
        if !self.checked || self.is_finished() {
            return self.is_finished();
        }
        self.index += 1;
        self.checked = false;
        self.candidates.clear();
        self.settle();
        self.is_finished()
    }

    pub fn reading_cue(&self, kana: bool) -> ReadingCue {
        let reading = |i: usize| {
            let chunk = &self.section.chunks[i];
            if kana {
                chunk.ja_kana.as_str()
            } else {
                chunk.ja.as_str()
            }
        };
        let chunks = self.section.chunks.len();
        let join = |range: std::ops::Range<usize>| range.map(reading).collect::<Vec<_>>().join(" ");

        match self.section.chunk_at(self.index) {
            Some(i) => {
                let before = join(0..i);
                let after = join(i + 1..chunks);
                ReadingCue {
                    before: if before.is_empty() { before } else { before + " " },
                    current: reading(i).to_string(),
                    after: if after.is_empty() { after } else { format!(" {after}") },
                }
            }
            None => ReadingCue {
                before: join(0..chunks),
                ..ReadingCue::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::schema::expand_chunks;
    use crate::content::{CharKind, Chunk};
    use crate::recognizer::Point;

    /// Recognizes a fixed set; `recognize` answers with whatever the test
    /// queued for the drawing's stroke count.
    struct FakeRecognizer {
        known: Vec<char>,
        answers: Vec<(usize, Vec<char>)>,
    }

    impl Recognizer for FakeRecognizer {
        fn can_recognize(&self, ch: char) -> bool {
            self.known.contains(&ch)
        }

        fn expected_strokes(&self, ch: char) -> Option<usize> {
            self.known.contains(&ch).then_some(4)
        }

        fn recognize(&self, drawing: &Drawing) -> Vec<char> {
            self.answers
                .iter()
                .find(|(n, _)| *n == drawing.stroke_count())
                .map(|(_, a)| a.clone())
                .unwrap_or_default()
        }
    }

    fn ch(face: char, simplified: Option<char>, on: &str, kana: &str) -> Character {
        Character {
            face,
            simplified,
            kind: CharKind::Semantic,
            on: on.to_string(),
            kana: kana.to_string(),
            pinyin: String::new(),
            gloss: None,
        }
    }

    /// 色即是空 with 即是 as one chunk.
    fn section() -> Section {
        let characters = vec![
            ch('色', None, "shiki", "しき"),
            ch('即', None, "soku", "そく"),
            ch('是', None, "ze", "ぜ"),
            ch('空', None, "kū", "くう"),
        ];
        let authored = vec![Chunk {
            start: 1,
            end: 3,
            ja: "soku ze".to_string(),
            ja_kana: "そくぜ".to_string(),
            zh: "jí shì".to_string(),
        }];
        let chunks = expand_chunks(0, &characters, authored).unwrap();
        Section {
            id: 0,
            characters,
            chunks,
            translation: "form is emptiness".to_string(),
            sanskrit: None,
        }
    }

    fn strokes(n: usize) -> Drawing {
        Drawing::from_strokes(
            (0..n)
                .map(|i| vec![Point::new(0.0, i as f64), Point::new(5.0, i as f64)])
                .collect(),
        )
    }

    fn session(known: &str, answers: Vec<(usize, Vec<char>)>) -> WritingSession {
        let r = FakeRecognizer {
            known: known.chars().collect(),
            answers,
        };
        WritingSession::new(section(), Arc::new(r), false)
    }

    #[test]
    fn test_all_correct_gets_it() {
        let mut s = session("色即是空", vec![(1, vec!['色', '即', '是', '空'])]);
        assert_eq!(s.statuses()[0], CharStatus::Current);
        for i in 0..4 {
            assert_eq!(s.check(&strokes(1)), Some(CheckOutcome::Correct));
            assert_eq!(s.next(), i == 3);
        }
        assert_eq!(s.outcome(), Some(true));
        assert!(s.statuses().iter().all(|&st| st == CharStatus::Correct));
    }

    #[test]
    fn test_single_miss_fails_section() {
        let mut s = session(
            "色即是空",
            vec![(1, vec!['色', '即', '空']), (2, vec!['口'])],
        );
        s.check(&strokes(1));
        s.next();
        s.check(&strokes(1));
        s.next();
        assert_eq!(
            s.check(&strokes(2)),
            Some(CheckOutcome::Missed {
                candidates: vec!['口']
            })
        );
        assert_eq!(s.candidates(), &['口']);
        assert!(!s.next());
        assert!(s.candidates().is_empty());
        s.check(&strokes(1));
        assert!(s.next());
        assert_eq!(s.outcome(), Some(false));
        assert_eq!(s.statuses()[2], CharStatus::Missed);
    }

    #[test]
    fn test_unrecognizable_characters_are_skipped() {
        let mut s = session("即空", vec![(1, vec!['即', '空'])]);
        assert_eq!(s.current_index(), 1);
        assert_eq!(s.statuses()[0], CharStatus::Skipped);
        assert_eq!(s.target(), Some('即'));

        s.check(&strokes(1));
        s.next();
        assert_eq!(s.statuses()[2], CharStatus::Skipped);
        assert_eq!(s.current_index(), 3);
        s.check(&strokes(1));
        assert!(s.next());
        assert_eq!(s.outcome(), Some(true));
    }

    #[test]
    fn test_nothing_recognizable_finishes_immediately() {
        let s = session("", vec![]);
        assert!(s.is_finished());
        assert_eq!(s.outcome(), Some(true));
        assert!(s.statuses().iter().all(|&st| st == CharStatus::Skipped));
    }

    #[test]
    fn test_check_twice_and_next_unchecked_are_ignored() {
        let mut s = session("色即是空", vec![(1, vec!['色'])]);
        assert!(!s.next());
        assert_eq!(s.current_index(), 0);
        assert!(s.check(&strokes(1)).is_some());
        assert!(s.check(&strokes(1)).is_none());
        assert_eq!(s.outcome(), None);
    }

    #[test]
    fn test_alternate_form_is_recognized_and_accepted() {
        let characters = vec![ch('佛', Some('仏'), "butsu", "ぶつ")];
        let chunks = expand_chunks(0, &characters, Vec::new()).unwrap();
        let section = Section {
            id: 0,
            characters,
            chunks,
            translation: String::new(),
            sanskrit: None,
        };
        let r = FakeRecognizer {
            known: vec!['仏'],
            answers: vec![(1, vec!['仏'])],
        };
        let mut s = WritingSession::new(section, Arc::new(r), false);
        assert_eq!(s.target(), Some('佛'));
        assert_eq!(s.expected_strokes(), Some(4));
        assert_eq!(s.check(&strokes(1)), Some(CheckOutcome::Correct));
    }

    #[test]
    fn test_reading_cue_splits_around_current_chunk() {
        let mut s = session("色即是空", vec![(1, vec!['色', '即', '是', '空'])]);
        assert_eq!(
            s.reading_cue(false),
            ReadingCue {
                before: String::new(),
                current: "shiki".to_string(),
                after: " soku ze kū".to_string(),
            }
        );
        s.check(&strokes(1));
        s.next();
        s.check(&strokes(1));
        s.next();
        // still inside the 即是 chunk
        assert_eq!(
            s.reading_cue(true),
            ReadingCue {
                before: "しき ".to_string(),
                current: "そくぜ".to_string(),
                after: " くう".to_string(),
            }
        );
        s.check(&strokes(1));
        s.next();
        s.check(&strokes(1));
        s.next();
        assert_eq!(s.reading_cue(false).before, "shiki soku ze kū");
    }
}
