use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::recognizer::normalize::preprocess;
use crate::recognizer::{Drawing, MAX_CANDIDATES, Point, Recognizer, RecognizerError, Stroke};

/// Candidates may differ from the drawing by at most this many strokes.
pub const STROKE_TOLERANCE: usize = 2;

/// Cost added per stroke of difference between drawing and candidate.
const STROKE_PENALTY: f64 = 60.0;

#[derive(Clone, Debug)]
struct Pattern {
    ch: char,
    stroke_count: usize,
    features: Vec<Stroke>,
}

/// Nearest-pattern recognizer over KanjiCanvas-style reference patterns.
pub struct PatternRecognizer {
    patterns: Vec<Pattern>,
    stroke_counts: HashMap<char, usize>,
}

impl PatternRecognizer {
    pub fn load(path: &Path) -> Result<Self, RecognizerError> {
        let json = fs::read_to_string(path).map_err(|source| RecognizerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let recognizer = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            patterns = recognizer.len(),
            "loaded stroke patterns"
        );
        Ok(recognizer)
    }

    /// Parse `[[char, stroke_count, [[[x, y], ...], ...]], ...]`.
    pub fn from_json(json: &str) -> Result<Self, RecognizerError> {
        let entries: Vec<Value> = serde_json::from_str(json)?;
        if entries.is_empty() {
            return Err(RecognizerError::Empty);
        }
        let patterns = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| parse_entry(index, entry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_patterns(patterns))
    }

    fn from_patterns(patterns: Vec<Pattern>) -> Self {
        let mut stroke_counts = HashMap::with_capacity(patterns.len());
        for p in &patterns {
            stroke_counts.entry(p.ch).or_insert(p.stroke_count);
        }
        Self {
            patterns,
            stroke_counts,
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn bad(index: usize, reason: impl Into<String>) -> RecognizerError {
    RecognizerError::BadEntry {
        index,
        reason: reason.into(),
    }
}

fn parse_entry(index: usize, entry: &Value) -> Result<Pattern, RecognizerError> {
    let fields = entry
        .as_array()
        .filter(|f| f.len() == 3)
        .ok_or_else(|| bad(index, "expected [char, stroke_count, strokes]"))?;

    let ch = fields[0]
        .as_str()
        .and_then(|s| {
            let mut chars = s.chars();
            chars.next().filter(|_| chars.next().is_none())
        })
        .ok_or_else(|| bad(index, "first field must be a single character"))?;
    let stroke_count = fields[1]
        .as_u64()
        .ok_or_else(|| bad(index, "stroke count must be a non-negative integer"))?
        as usize;

    let strokes = fields[2]
        .as_array()
        .ok_or_else(|| bad(index, "strokes must be an array"))?
        .iter()
        .map(|stroke| parse_stroke(index, stroke))
        .collect::<Result<Vec<Stroke>, _>>()?;
    if strokes.is_empty() || strokes.iter().any(|s| s.is_empty()) {
        return Err(bad(index, format!("{ch} has an empty stroke list")));
    }

    Ok(Pattern {
        ch,
        stroke_count,
        features: preprocess(&strokes),
    })
}

fn parse_stroke(index: usize, stroke: &Value) -> Result<Stroke, RecognizerError> {
    stroke
        .as_array()
        .ok_or_else(|| bad(index, "stroke must be an array of points"))?
        .iter()
        .map(|point| match point.as_array().map(Vec::as_slice) {
            Some([x, y]) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => Ok(Point::new(x, y)),
                _ => Err(bad(index, "point coordinates must be numbers")),
            },
            _ => Err(bad(index, "point must be [x, y]")),
        })
        .collect()
}

/// Mean distance between two feature sequences, pairing points by relative
/// position along each stroke.
fn stroke_distance(a: &[Point], b: &[Point]) -> f64 {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return f64::INFINITY;
    }
    let n = long.len();
    let m = short.len();
    let total: f64 = long
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let j = if n == 1 { 0 } else { i * (m - 1) / (n - 1) };
            p.distance(short[j])
        })
        .sum();
    total / n as f64
}

/// Each drawn stroke is charged the distance to its nearest reference stroke.
fn pattern_distance(drawn: &[Stroke], reference: &Pattern) -> f64 {
    let matched: f64 = drawn
        .iter()
        .map(|d| {
            reference
                .features
                .iter()
                .map(|r| stroke_distance(d, r))
                .fold(f64::INFINITY, f64::min)
        })
        .sum();
    let diff = drawn.len().abs_diff(reference.features.len());
    matched + diff as f64 * STROKE_PENALTY
}

impl Recognizer for PatternRecognizer {
    fn can_recognize(&self, ch: char) -> bool {
        self.stroke_counts.contains_key(&ch)
    }

    fn expected_strokes(&self, ch: char) -> Option<usize> {
        self.stroke_counts.get(&ch).copied()
    }

    fn recognize(&self, drawing: &Drawing) -> Vec<char> {
        if drawing.is_empty() {
            return Vec::new();
        }
        let drawn = preprocess(drawing.strokes());
        let count = drawing.stroke_count();

        let mut scored: Vec<(f64, char)> = self
            .patterns
            .iter()
            .filter(|p| p.features.len().abs_diff(count) <= STROKE_TOLERANCE)
            .map(|p| (pattern_distance(&drawn, p), p.ch))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut out = Vec::with_capacity(MAX_CANDIDATES);
        for (_, ch) in scored {
            if !out.contains(&ch) {
                out.push(ch);
                if out.len() == MAX_CANDIDATES {
                    break;
                }
            }
        }
        debug!(strokes = count, candidates = ?out, "recognized drawing");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATTERNS: &str = r#"[
        ["一", 1, [[[20, 128], [236, 128]]]],
        ["二", 2, [[[60, 80], [196, 80]], [[20, 190], [236, 190]]]],
        ["三", 3, [[[50, 50], [206, 50]], [[70, 128], [186, 128]], [[20, 210], [236, 210]]]],
        ["十", 2, [[[20, 128], [236, 128]], [[128, 20], [128, 236]]]],
        ["口", 3, [[[40, 40], [40, 216]], [[40, 40], [216, 40], [216, 216]], [[40, 216], [216, 216]]]]
    ]"#;

    fn recognizer() -> PatternRecognizer {
        PatternRecognizer::from_json(PATTERNS).unwrap()
    }

    fn drawing(strokes: &[&[(f64, f64)]]) -> Drawing {
        Drawing::from_strokes(
            strokes
                .iter()
                .map(|s| s.iter().map(|&(x, y)| Point::new(x, y)).collect())
                .collect(),
        )
    }

    #[test]
    fn test_lookup() {
        let r = recognizer();
        assert_eq!(r.len(), 5);
        assert!(r.can_recognize('二'));
        assert!(!r.can_recognize('空'));
        assert_eq!(r.expected_strokes('三'), Some(3));
        assert_eq!(r.expected_strokes('空'), None);
    }

    #[test]
    fn test_reference_drawing_ranks_itself_first() {
        let r = recognizer();
        let d = drawing(&[&[(60.0, 80.0), (196.0, 80.0)], &[(20.0, 190.0), (236.0, 190.0)]]);
        assert_eq!(r.recognize(&d).first(), Some(&'二'));

        let d = drawing(&[&[(20.0, 128.0), (236.0, 128.0)], &[(128.0, 20.0), (128.0, 236.0)]]);
        assert_eq!(r.recognize(&d).first(), Some(&'十'));
    }

    #[test]
    fn test_scaled_and_shifted_drawing_still_matches() {
        let r = recognizer();
        // 三 drawn small in a terminal-sized grid
        let d = drawing(&[
            &[(15.0, 15.0), (54.0, 15.0)],
            &[(20.0, 34.5), (49.0, 34.5)],
            &[(7.5, 55.0), (61.5, 55.0)],
        ]);
        assert_eq!(r.recognize(&d).first(), Some(&'三'));
    }

    #[test]
    fn test_stroke_tolerance_filters_candidates() {
        let r = recognizer();
        let one = drawing(&[&[(0.0, 0.0), (10.0, 0.0)]]);
        let got = r.recognize(&one);
        assert_eq!(got.first(), Some(&'一'));
        // 一 (1 stroke) may match 3-stroke patterns but nothing beyond that
        assert!(got.len() <= 5);

        let five = drawing(&[
            &[(0.0, 0.0), (10.0, 0.0)],
            &[(0.0, 2.0), (10.0, 2.0)],
            &[(0.0, 4.0), (10.0, 4.0)],
            &[(0.0, 6.0), (10.0, 6.0)],
            &[(0.0, 8.0), (10.0, 8.0)],
        ]);
        let got = r.recognize(&five);
        assert!(!got.contains(&'一'));
        assert!(!got.contains(&'二'));
        assert!(got.contains(&'三'));
    }

    #[test]
    fn test_empty_drawing_has_no_candidates() {
        assert!(recognizer().recognize(&Drawing::new()).is_empty());
    }

    #[test]
    fn test_malformed_patterns_are_rejected() {
        assert!(matches!(
            PatternRecognizer::from_json("[]"),
            Err(RecognizerError::Empty)
        ));
        assert!(matches!(
            PatternRecognizer::from_json("{"),
            Err(RecognizerError::Json(_))
        ));
        let err = PatternRecognizer::from_json(r#"[["一", 1, [[[0, 0]]]], ["ab", 1, [[[0, 0]]]]]"#)
            .err()
            .unwrap();
        assert!(matches!(err, RecognizerError::BadEntry { index: 1, .. }));
        assert!(
            PatternRecognizer::from_json(r#"[["一", 1, [[[0, "x"]]]]]"#).is_err()
        );
        assert!(PatternRecognizer::from_json(r#"[["一", 1, []]]"#).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = PatternRecognizer::load(Path::new("/nonexistent/ref-patterns.json"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("could not read stroke patterns"));
    }
}
