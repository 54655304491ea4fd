pub mod normalize;
pub mod patterns;

use std::path::PathBuf;

use thiserror::Error;

pub use patterns::PatternRecognizer;

/// Candidates returned by a recognizer, best first.
pub const MAX_CANDIDATES: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

pub type Stroke = Vec<Point>;

/// Strokes drawn by the user, in the order they were drawn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Drawing {
    strokes: Vec<Stroke>,
    pen_down: bool,
}

impl Drawing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_strokes(strokes: Vec<Stroke>) -> Self {
        Self {
            strokes: strokes.into_iter().filter(|s| !s.is_empty()).collect(),
            pen_down: false,
        }
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn pen_down(&mut self, p: Point) {
        self.strokes.push(vec![p]);
        self.pen_down = true;
    }

    /// Extend the open stroke. Repeated points are dropped.
    pub fn pen_move(&mut self, p: Point) {
        if !self.pen_down {
            return;
        }
        if let Some(stroke) = self.strokes.last_mut()
            && stroke.last() != Some(&p)
        {
            stroke.push(p);
        }
    }

    pub fn pen_up(&mut self) {
        self.pen_down = false;
    }

    pub fn undo(&mut self) {
        self.strokes.pop();
        self.pen_down = false;
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.pen_down = false;
    }
}

#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("could not read stroke patterns from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("stroke patterns are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stroke pattern {index} is malformed: {reason}")]
    BadEntry { index: usize, reason: String },
    #[error("stroke pattern file has no entries")]
    Empty,
}

/// Handwritten character recognition against a fixed character set.
pub trait Recognizer: Send + Sync {
    fn can_recognize(&self, ch: char) -> bool;

    fn expected_strokes(&self, ch: char) -> Option<usize>;

    /// Ranked candidates, at most [`MAX_CANDIDATES`].
    fn recognize(&self, drawing: &Drawing) -> Vec<char>;
}
