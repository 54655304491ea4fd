use std::f64::consts::FRAC_PI_2;

use crate::recognizer::{Point, Stroke};

/// Side of the square patterns are normalized into.
pub const CANVAS_SIZE: f64 = 256.0;

/// Distance between extracted feature points.
pub const FEATURE_INTERVAL: f64 = 20.0;

/// Aspect-ratio-adaptive target ratio for a pattern of the given extents.
fn adaptive_ratio(width: f64, height: f64) -> f64 {
    let (lo, hi) = if width < height {
        (width, height)
    } else {
        (height, width)
    };
    if hi <= 0.0 {
        return 1.0;
    }
    (FRAC_PI_2 * lo / hi).sin().sqrt()
}

/// Moment normalization: center the pattern's mass and scale each axis by its
/// spread, then fit the result into a [`CANVAS_SIZE`] square. The output is
/// invariant to translation and uniform scaling of the input.
pub fn moment_normalize(strokes: &[Stroke]) -> Vec<Stroke> {
    let points = || strokes.iter().flatten();
    let count = points().count();
    if count == 0 {
        return Vec::new();
    }
    let n = count as f64;

    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut sum_x, mut sum_y) = (0.0, 0.0);
    for p in points() {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
        sum_x += p.x;
        sum_y += p.y;
    }
    let (xc, yc) = (sum_x / n, sum_y / n);

    let ratio = adaptive_ratio(max_x - min_x, max_y - min_y);
    let (target_w, target_h) = if max_y - min_y > max_x - min_x {
        (ratio * CANVAS_SIZE, CANVAS_SIZE)
    } else {
        (CANVAS_SIZE, ratio * CANVAS_SIZE)
    };
    let x_offset = (CANVAS_SIZE - target_w) / 2.0;
    let y_offset = (CANVAS_SIZE - target_h) / 2.0;

    let mu20: f64 = points().map(|p| (p.x - xc).powi(2)).sum::<f64>() / n;
    let mu02: f64 = points().map(|p| (p.y - yc).powi(2)).sum::<f64>() / n;
    // A flat axis collapses to the center line.
    let scale = |mu: f64, size: f64| {
        if mu > f64::EPSILON {
            size / (4.0 * mu.sqrt())
        } else {
            0.0
        }
    };
    let alpha = scale(mu20, target_w);
    let beta = scale(mu02, target_h);

    strokes
        .iter()
        .map(|stroke| {
            stroke
                .iter()
                .map(|p| Point {
                    x: alpha * (p.x - xc) + target_w / 2.0 + x_offset,
                    y: beta * (p.y - yc) + target_h / 2.0 + y_offset,
                })
                .collect()
        })
        .collect()
}

/// Resample a stroke to points spaced [`FEATURE_INTERVAL`] apart along its
/// path. The first point is always kept; the end point is kept when the
/// leftover distance exceeds three quarters of an interval.
pub fn extract_features(stroke: &[Point]) -> Stroke {
    let Some(&first) = stroke.first() else {
        return Vec::new();
    };
    let mut features = vec![first];
    let mut carried = 0.0;
    let mut prev = first;

    for &p in &stroke[1..] {
        let mut segment = prev.distance(p);
        let mut from = prev;
        while carried + segment >= FEATURE_INTERVAL {
            let step = FEATURE_INTERVAL - carried;
            let t = step / segment;
            let emitted = Point {
                x: from.x + (p.x - from.x) * t,
                y: from.y + (p.y - from.y) * t,
            };
            features.push(emitted);
            segment -= step;
            from = emitted;
            carried = 0.0;
        }
        carried += segment;
        prev = p;
    }

    if carried > FEATURE_INTERVAL * 0.75 {
        features.push(prev);
    }
    features
}

/// Full preprocessing applied to both reference patterns and drawings.
pub fn preprocess(strokes: &[Stroke]) -> Vec<Stroke> {
    moment_normalize(strokes)
        .iter()
        .map(|s| extract_features(s))
        .collect()
}
