use image::GrayImage;
use indicatif::ProgressBar;
use plate_ocr_bench::{
    config::{EvaluatorConfig, GeneratorConfig},
    create_rng,
    dataset::generate_dataset_with_progress,
    evaluator::Evaluator,
    manifest::{ManifestEntry, read_manifest},
    ocr::{Fragments, OcrEngine, TextFragment},
    plate_text::is_plate_text,
    report::format_report,
};
use smallvec::smallvec;
use std::{collections::VecDeque, path::Path};

/// Replays canned answers in call order and records what it was shown.
struct ScriptedEngine {
    answers: VecDeque<Fragments>,
    seen: Vec<(u32, u32)>,
}

impl ScriptedEngine {
    fn new(answers: Vec<Fragments>) -> Self {
        Self {
            answers: answers.into(),
            seen: Vec::new(),
        }
    }
}

impl OcrEngine for ScriptedEngine {
    fn recognize(&mut self, image: &GrayImage) -> anyhow::Result<Fragments> {
        self.seen.push(image.dimensions());
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn generate(dir: &Path, count: u32, seed: u64) -> Vec<ManifestEntry> {
    let config = GeneratorConfig {
        output_dir: dir.to_path_buf(),
        count,
        seed: Some(seed),
        ..GeneratorConfig::default()
    };
    let mut rng = create_rng(config.seed);
    let summary = generate_dataset_with_progress(&config, &mut rng, ProgressBar::hidden()).unwrap();
    assert_eq!(summary.images_written, count);
    read_manifest(&summary.manifest_path).unwrap()
}

fn evaluator_config(dir: &Path) -> EvaluatorConfig {
    EvaluatorConfig {
        dataset_dir: dir.to_path_buf(),
        ..EvaluatorConfig::default()
    }
}

fn one(text: &str) -> Fragments {
    smallvec![TextFragment::new(text, 0.9)]
}

#[test]
fn test_generate_then_evaluate() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = generate(dir.path(), 4, 42);
    assert!(manifest.iter().all(|e| is_plate_text(&e.ground_truth)));

    let truth: Vec<&str> = manifest.iter().map(|e| e.ground_truth.as_str()).collect();
    let mut substituted = truth[1].to_string();
    substituted.replace_range(7..8, if &truth[1][7..8] == "0" { "1" } else { "0" });
    let split = [
        TextFragment::new(truth[3][..4].to_lowercase(), 0.8),
        TextFragment::new(format!(" {} ", &truth[3][4..]), 0.7),
    ];

    let engine = ScriptedEngine::new(vec![
        one(truth[0]),
        one(&substituted),
        Fragments::new(),
        split.into_iter().collect(),
    ]);
    let mut evaluator = Evaluator::new(engine, evaluator_config(dir.path())).without_progress();
    let run = evaluator.run(&manifest).unwrap();

    assert!(run.skipped.is_empty());
    let distances: Vec<usize> = run.records.iter().map(|r| r.edit_distance).collect();
    assert_eq!(distances, vec![0, 1, 8, 0]);
    assert_eq!(run.records[3].prediction, truth[3]);

    let report = &run.report;
    assert_eq!(report.total_images, 4);
    assert_eq!(report.true_positive_count, 3);
    assert_eq!(report.exact_match_count, 2);
    assert_eq!(report.total_ground_truth_chars, 32);
    assert!((report.recall - 0.75).abs() < 1e-12);
    assert!((report.character_error_rate - 9.0 / 32.0).abs() < 1e-12);
    assert!((report.word_error_rate - 0.5).abs() < 1e-12);

    let engine = evaluator.into_engine();
    // every image reached the engine binarized, cropped and upscaled
    assert!(engine.seen.iter().all(|&dims| dims == (600, 144)));

    let text = format_report(report, chrono::Local::now());
    assert!(text.contains("Total images: 4"));
    assert!(text.contains("PAR (Plate Accuracy):     50.00%"));
}

#[test]
fn test_missing_image_is_skipped_not_missed() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = generate(dir.path(), 3, 5);
    std::fs::remove_file(dir.path().join(&manifest[1].file_name)).unwrap();

    let engine = ScriptedEngine::new(vec![
        one(&manifest[0].ground_truth),
        one(&manifest[2].ground_truth),
    ]);
    let mut evaluator = Evaluator::new(engine, evaluator_config(dir.path())).without_progress();
    let run = evaluator.run(&manifest).unwrap();

    assert_eq!(run.skipped.len(), 1);
    assert_eq!(run.skipped[0].file_name, manifest[1].file_name);
    assert_eq!(run.report.total_images, 2);
    assert_eq!(run.report.false_negative_count, 0);
    assert_eq!(run.report.exact_match_count, 2);
}

#[test]
fn test_same_seed_reproduces_dataset() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let a = generate(first.path(), 3, 1234);
    let b = generate(second.path(), 3, 1234);
    assert_eq!(a, b);

    for entry in &a {
        let bytes_a = std::fs::read(first.path().join(&entry.file_name)).unwrap();
        let bytes_b = std::fs::read(second.path().join(&entry.file_name)).unwrap();
        assert_eq!(bytes_a, bytes_b, "{} differs", entry.file_name);
    }
}
