use crate::{
    PlateError,
    config::EvaluatorConfig,
    image::load_plate_image,
    manifest::ManifestEntry,
    metrics::{EvaluationRecord, MetricsAccumulator, MetricsReport},
    normalize::normalize_plate_text,
    ocr::{OcrEngine, join_fragments},
    preprocess::Preprocessor,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

/// An image that produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedImage {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct EvaluationRun {
    pub records: Vec<EvaluationRecord>,
    pub skipped: Vec<SkippedImage>,
    pub elapsed: Duration,
    pub report: MetricsReport,
}

pub struct Evaluator<E: OcrEngine> {
    engine: E,
    preprocessor: Preprocessor,
    config: EvaluatorConfig,
    show_progress: bool,
}

impl<E: OcrEngine> Evaluator<E> {
    pub fn new(engine: E, config: EvaluatorConfig) -> Self {
        Self {
            engine,
            preprocessor: Preprocessor::new(config.preprocess.clone()),
            config,
            show_progress: true,
        }
    }

    /// Disables the terminal progress bar, for tests and non-interactive runs.
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Fails with [`PlateError::Configuration`] before touching any image when
    /// the preprocessing settings are unusable.
    pub fn run(&mut self, manifest: &[ManifestEntry]) -> Result<EvaluationRun, PlateError> {
        self.config.validate()?;
        info!(
            engine = self.engine.name(),
            images = manifest.len(),
            dataset_dir = ?self.config.dataset_dir,
            "Starting evaluation"
        );

        let progress = if self.show_progress {
            ProgressBar::new(manifest.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut records = Vec::with_capacity(manifest.len());
        let mut skipped = Vec::new();
        let mut accumulator = MetricsAccumulator::new();

        let start = Instant::now();
        for entry in manifest {
            progress.set_message(entry.file_name.clone());
            match self.evaluate_entry(entry) {
                Ok(record) => {
                    debug!(
                        "{} | {} | {}",
                        record.ground_truth, record.prediction, record.edit_distance
                    );
                    accumulator.push(&record);
                    records.push(record);
                }
                Err(reason) => {
                    warn!(file_name = %entry.file_name, %reason, "Skipping image");
                    skipped.push(SkippedImage {
                        file_name: entry.file_name.clone(),
                        reason,
                    });
                }
            }
            progress.inc(1);
        }
        let elapsed = start.elapsed();
        progress.finish_with_message("done");

        info!(
            evaluated = records.len(),
            skipped = skipped.len(),
            ?elapsed,
            "Evaluation finished"
        );

        let report = accumulator.finish(elapsed)?;
        Ok(EvaluationRun {
            records,
            skipped,
            elapsed,
            report,
        })
    }

    /// Per-image failures come back as a reason string so one bad image
    /// never aborts the batch.
    fn evaluate_entry(&mut self, entry: &ManifestEntry) -> Result<EvaluationRecord, String> {
        let path: PathBuf = self.config.dataset_dir.join(&entry.file_name);
        let image = load_plate_image(&path).map_err(|e| e.to_string())?;
        let binary = self
            .preprocessor
            .process(&image)
            .map_err(|e| format!("Preprocessing failed: {e}"))?;
        let fragments = self
            .engine
            .recognize(&binary)
            .map_err(|e| format!("{} failed: {e}", self.engine.name()))?;

        let prediction = normalize_plate_text(&join_fragments(&fragments));
        let ground_truth = if self.config.normalize_ground_truth {
            normalize_plate_text(&entry.ground_truth)
        } else {
            entry.ground_truth.clone()
        };
        Ok(EvaluationRecord::new(
            entry.file_name.clone(),
            ground_truth,
            prediction,
        ))
    }
}
