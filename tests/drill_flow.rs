use std::fs;
use std::path::Path;

use sutradrill::content::Library;
use sutradrill::engine::{DrillEngine, DrillState, Transition};
use sutradrill::recognizer::{Drawing, PatternRecognizer, Point, Recognizer};
use sutradrill::store::{JsonStore, ProgressStore};
use tempfile::TempDir;

fn store_at(dir: &Path) -> ProgressStore {
    ProgressStore::new(Box::new(JsonStore::with_base_dir(dir.to_path_buf()).unwrap()))
}

fn heart_engine(dir: &Path) -> DrillEngine {
    let library = Library::bundled();
    let sutra = library.get("heart-sutra").unwrap().clone();
    DrillEngine::new(sutra, store_at(dir))
}

fn pass(engine: &mut DrillEngine, got_it: bool) -> Transition {
    assert!(engine.reveal());
    engine.assess(got_it)
}

#[test]
fn frontier_survives_reopening_the_store() {
    let dir = TempDir::new().unwrap();
    let mut engine = heart_engine(dir.path());
    engine.start_drill(None);
    for _ in 0..3 {
        pass(&mut engine, true);
    }
    assert_eq!(engine.progress().frontier, 3);

    let on_disk = fs::read_to_string(dir.path().join("drill-progress_heart-sutra.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&on_disk).unwrap();
    assert_eq!(value["frontier"], 3);
    assert_eq!(value["version"], 1);

    let reopened = heart_engine(dir.path());
    assert_eq!(reopened.progress().frontier, 3);
    assert_eq!(reopened.state(), DrillState::Idle);
    assert_eq!(reopened.current_section().unwrap().id, 3);
}

#[test]
fn recovery_then_advance_over_a_real_sutra() {
    let dir = TempDir::new().unwrap();
    let mut engine = heart_engine(dir.path());
    engine.start_drill(Some(3));

    assert_eq!(pass(&mut engine, false), Transition::RecoveryStarted { target: 3 });
    assert_eq!(engine.window().unwrap().iter().collect::<Vec<_>>(), vec![1, 2, 3]);

    for remaining in (0..3).rev() {
        assert_eq!(pass(&mut engine, true), Transition::WindowStep { to: 2 });
        assert_eq!(pass(&mut engine, true), Transition::WindowStep { to: 3 });
        let t = pass(&mut engine, true);
        if remaining > 0 {
            assert_eq!(t, Transition::PassCompleted { passes_left: remaining });
        } else {
            assert_eq!(t, Transition::RecoveryCleared { to: 4 });
        }
    }
    assert_eq!(engine.run().unwrap().section_id, 4);
    assert_eq!(heart_engine(dir.path()).progress().frontier, 4);
}

#[test]
fn legacy_record_is_read_and_rewritten() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("drill-progress_heart-sutra.json");
    fs::write(&path, r#"{"currentSectionIndex":5}"#).unwrap();

    let mut engine = heart_engine(dir.path());
    assert_eq!(engine.progress().frontier, 5);

    engine.start_drill(Some(5));
    pass(&mut engine, true);
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["frontier"], 6);
    assert!(value.get("currentSectionIndex").is_none());
}

#[test]
fn corrupt_record_starts_over() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("drill-progress_heart-sutra.json"), "not json").unwrap();
    assert_eq!(heart_engine(dir.path()).progress().frontier, 0);
}

#[test]
fn export_then_import_into_a_fresh_store() {
    let source_dir = TempDir::new().unwrap();
    let mut engine = heart_engine(source_dir.path());
    engine.start_drill(None);
    pass(&mut engine, true);
    pass(&mut engine, true);
    engine.mark_written(1);

    let export_path = source_dir.path().join("export.json");
    engine
        .store()
        .export_to(&["heart-sutra", "four-great-vows"], &export_path)
        .unwrap();
    let bundle: serde_json::Value = serde_json::from_str(&fs::read_to_string(&export_path).unwrap()).unwrap();
    assert_eq!(bundle["sutradrill_export_version"], 1);
    assert_eq!(bundle["drill"]["heart-sutra"]["frontier"], 2);

    let target_dir = TempDir::new().unwrap();
    let mut target = store_at(target_dir.path());
    target.import_from(&export_path).unwrap();
    assert_eq!(target.load_drill("heart-sutra").frontier, 2);
    assert!(target.load_writing("heart-sutra").contains(1));
    assert_eq!(target.load_drill("four-great-vows").frontier, 0);
}

#[test]
fn import_rejects_unknown_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.json");
    fs::write(
        &path,
        r#"{"sutradrill_export_version":99,"exported_at":"2026-01-01T00:00:00Z","drill":{},"writing":{}}"#,
    )
    .unwrap();
    let mut store = store_at(dir.path());
    assert!(store.import_from(&path).is_err());
}

#[test]
fn reset_clears_drill_and_writing_records() {
    let dir = TempDir::new().unwrap();
    let mut engine = heart_engine(dir.path());
    engine.start_drill(None);
    pass(&mut engine, true);
    engine.mark_written(0);
    engine.reset_progress();

    let reopened = heart_engine(dir.path());
    assert_eq!(reopened.progress().frontier, 0);
    assert!(reopened.writing_progress().is_empty());
}

#[test]
fn content_file_adds_a_sutra() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short-verse.json");
    fs::write(
        &path,
        r#"{
  "titleJa": "偈",
  "titleEn": "Short Verse",
  "sections": [
    {"id": 0, "characters": [
      {"char": "偈", "type": "n", "on": "ge", "kana": "げ", "pinyin": "jì"}
    ], "translation": "Verse"},
    {"id": 1, "characters": [
      {"char": "色", "type": "s", "on": "shiki", "kana": "しき", "pinyin": "sè", "gloss": "form"},
      {"char": "空", "type": "s", "on": "kū", "kana": "くう", "pinyin": "kōng", "gloss": "empty"}
    ], "chunks": [{"start": 0, "end": 2, "ja": "shiki kū", "jaKana": "しきくう", "zh": "sè kōng"}],
    "translation": "Form is emptiness"}
  ]
}"#,
    )
    .unwrap();

    let mut library = Library::bundled();
    let sutra = library.load_file(&path).unwrap();
    assert_eq!(sutra.id, "short-verse");
    assert_eq!(sutra.total_sections(), 2);
    assert!(library.ids().contains(&"short-verse"));

    let bad = dir.path().join("bad.json");
    fs::write(&bad, r#"{"titleJa":"x","titleEn":"x","sections":[{"id":1,"characters":[],"translation":""}]}"#)
        .unwrap();
    assert!(library.load_file(&bad).is_err());
    assert!(library.get("bad").is_none());
}

#[test]
fn pattern_file_recognizes_its_own_strokes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ref-patterns.json");
    fs::write(
        &path,
        r#"[
  ["一", 1, [[[20, 128], [236, 128]]]],
  ["十", 2, [[[20, 128], [236, 128]], [[128, 20], [128, 236]]]],
  ["二", 2, [[[60, 80], [196, 80]], [[20, 180], [236, 180]]]]
]"#,
    )
    .unwrap();

    let recognizer = PatternRecognizer::load(&path).unwrap();
    assert_eq!(recognizer.len(), 3);
    assert!(recognizer.can_recognize('十'));
    assert_eq!(recognizer.expected_strokes('二'), Some(2));

    let cross = Drawing::from_strokes(vec![
        vec![Point::new(30.0, 100.0), Point::new(200.0, 102.0)],
        vec![Point::new(115.0, 20.0), Point::new(117.0, 190.0)],
    ]);
    assert_eq!(recognizer.recognize(&cross).first(), Some(&'十'));

    assert!(PatternRecognizer::load(&dir.path().join("missing.json")).is_err());
}
