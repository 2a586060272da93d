use crate::{
    PlateError,
    config::GeneratorConfig,
    distortion::DistortionPipeline,
    font::PlateFont,
    image::save_jpeg,
    manifest::ManifestWriter,
    plate_text::PlateTextSampler,
    render::PlateRenderer,
};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{debug, info};

const LOG_EVERY: u32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSummary {
    pub output_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub images_written: u32,
    pub builtin_font: bool,
    pub elapsed: Duration,
}

pub fn image_file_name(id: u32) -> String {
    format!("placa_{id:03}.jpg")
}

/// Writes `config.count` plates and their manifest into `config.output_dir`.
/// The manifest row of an image is only written after the image itself.
pub fn generate_dataset<R: Rng + ?Sized>(
    config: &GeneratorConfig,
    rng: &mut R,
) -> anyhow::Result<GenerationSummary> {
    generate_dataset_with_progress(config, rng, ProgressBar::new(config.count as u64))
}

pub fn generate_dataset_with_progress<R: Rng + ?Sized>(
    config: &GeneratorConfig,
    rng: &mut R,
    progress: ProgressBar,
) -> anyhow::Result<GenerationSummary> {
    config.validate()?;
    std::fs::create_dir_all(&config.output_dir).map_err(PlateError::from)?;

    let font = PlateFont::resolve(config.font.as_deref());
    let builtin_font = font.is_builtin();
    let renderer = PlateRenderer::new(config.layout.clone(), font);
    let distortion = DistortionPipeline::new(config.distortion.clone(), config.layout.background);
    let manifest_path = config.manifest_path();
    let mut manifest = ManifestWriter::create(&manifest_path)?;
    let mut sampler = PlateTextSampler::new();

    info!(
        count = config.count,
        output_dir = ?config.output_dir,
        builtin_font,
        "Generating plate dataset"
    );

    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    for _ in 0..config.count {
        let record = sampler.next_record(rng);
        let mut image = renderer.render(&record.text);
        let applied = distortion.apply(&mut image, rng);

        let file_name = image_file_name(record.id);
        save_jpeg(&image, &config.output_dir.join(&file_name), config.jpeg_quality)?;
        manifest.append(&file_name, &record.text)?;
        debug!(%file_name, text = %record.text, ?applied, "Plate written");

        progress.set_message(record.text);
        progress.inc(1);
        if record.id % LOG_EVERY == 0 {
            info!("Generated {}/{} plates", record.id, config.count);
        }
    }
    let images_written = manifest.rows() as u32;
    manifest.finish()?;
    let elapsed = start.elapsed();
    progress.finish_with_message("done");

    info!(
        images_written,
        ?elapsed,
        manifest = ?manifest_path,
        "Dataset generation finished"
    );

    Ok(GenerationSummary {
        output_dir: config.output_dir.clone(),
        manifest_path,
        images_written,
        builtin_font,
        elapsed,
    })
}
