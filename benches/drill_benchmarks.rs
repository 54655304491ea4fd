use criterion::{Criterion, black_box, criterion_group, criterion_main};

use sutradrill::content::Library;
use sutradrill::engine::DrillEngine;
use sutradrill::recognizer::normalize::preprocess;
use sutradrill::recognizer::{Drawing, PatternRecognizer, Point, Recognizer, Stroke};
use sutradrill::store::{MemoryStore, ProgressStore};

fn engine() -> DrillEngine {
    let library = Library::bundled();
    let sutra = library.sutras()[0].clone();
    DrillEngine::new(sutra, ProgressStore::new(Box::new(MemoryStore::new())))
}

/// A wobbly stroke from `(x0, y0)` to `(x1, y1)` with `n` points.
fn stroke(x0: f64, y0: f64, x1: f64, y1: f64, n: usize) -> Stroke {
    (0..n)
        .map(|i| {
            let t = i as f64 / (n - 1) as f64;
            let wobble = (i as f64 * 0.7).sin() * 2.0;
            Point::new(x0 + (x1 - x0) * t + wobble, y0 + (y1 - y0) * t - wobble)
        })
        .collect()
}

/// Synthetic reference set: `count` characters with one to eight strokes.
fn pattern_json(count: usize) -> String {
    let entries: Vec<String> = (0..count)
        .map(|i| {
            let ch = char::from_u32(0x4E00 + i as u32).unwrap_or('一');
            let strokes = 1 + i % 8;
            let body: Vec<String> = (0..strokes)
                .map(|s| {
                    let offset = 20.0 + (s * 27 + i % 13) as f64;
                    if (i + s) % 2 == 0 {
                        format!("[[20,{offset}],[128,{offset}],[236,{offset}]]")
                    } else {
                        format!("[[{offset},20],[{offset},128],[{offset},236]]")
                    }
                })
                .collect();
            format!("[\"{ch}\",{strokes},[{}]]", body.join(","))
        })
        .collect();
    format!("[{}]", entries.join(","))
}

fn bench_engine(c: &mut Criterion) {
    c.bench_function("drill through the heart sutra", |b| {
        b.iter(|| {
            let mut e = engine();
            e.start_drill(None);
            while e.run().is_some() {
                e.reveal();
                e.assess(black_box(true));
            }
            e.progress()
        })
    });

    c.bench_function("recovery cycle (fail + 3 passes)", |b| {
        b.iter(|| {
            let mut e = engine();
            e.start_drill(Some(10));
            e.reveal();
            e.assess(false);
            while e.recovery().is_some() {
                e.reveal();
                e.assess(true);
            }
            e.run()
        })
    });
}

fn bench_recognizer(c: &mut Criterion) {
    let drawing = Drawing::from_strokes(vec![
        stroke(30.0, 60.0, 220.0, 64.0, 40),
        stroke(40.0, 130.0, 210.0, 128.0, 40),
        stroke(120.0, 20.0, 124.0, 236.0, 60),
        stroke(20.0, 200.0, 236.0, 204.0, 50),
    ]);

    c.bench_function("preprocess (4 strokes)", |b| {
        b.iter(|| preprocess(black_box(drawing.strokes())))
    });

    let recognizer = match PatternRecognizer::from_json(&pattern_json(2000)) {
        Ok(r) => r,
        Err(e) => panic!("synthetic patterns should parse: {e}"),
    };
    c.bench_function("recognize against 2000 patterns", |b| {
        b.iter(|| recognizer.recognize(black_box(&drawing)))
    });
}

criterion_group!(benches, bench_engine, bench_recognizer);
criterion_main!(benches);
