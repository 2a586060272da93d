use crate::{
    LogLevel,
    config::{EvaluatorConfig, GeneratorConfig, load_config},
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author = "Plate OCR Bench", version=env!("CARGO_PKG_VERSION"), about = "Generates a synthetic license plate dataset with ground truth")]
pub struct GeneratorCli {
    /// Directory the images and ground_truth.txt are written to
    /// Default: dataset_placas
    #[clap(long)]
    pub output_dir: Option<PathBuf>,
    /// Number of plates to generate. Default is 500.
    #[clap(long)]
    pub count: Option<u32>,
    /// Seed for a reproducible dataset, random if not given
    #[clap(long)]
    pub seed: Option<u64>,
    /// TrueType font used for the plate text.
    /// If not given or not loadable the built-in bitmap font is used.
    #[clap(long)]
    pub font: Option<PathBuf>,
    /// JPEG quality 1-100. Default is 75.
    #[clap(long)]
    pub jpeg_quality: Option<u8>,
    /// JSON configuration file, flags given on the command line take precedence
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Sets the level of logging
    #[clap(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
    /// If log_path is set, then stdout logging will be disabled and it will log to file
    #[clap(long)]
    pub log_path: Option<PathBuf>,
}

impl GeneratorCli {
    pub fn into_config(self) -> anyhow::Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => GeneratorConfig::default(),
        };
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(count) = self.count {
            config.count = count;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.font.is_some() {
            config.font = self.font;
        }
        if let Some(jpeg_quality) = self.jpeg_quality {
            config.jpeg_quality = jpeg_quality;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Parser, Debug)]
#[command(author = "Plate OCR Bench", version=env!("CARGO_PKG_VERSION"), about = "Evaluates an OCR model against a plate dataset")]
pub struct EvaluatorCli {
    /// Dataset directory holding the images and ground_truth.txt
    /// Default: dataset_placas
    #[clap(long)]
    pub dataset_dir: Option<PathBuf>,
    /// Path to the ONNX text recognition model
    #[clap(long)]
    pub model: PathBuf,
    /// Character dictionary of the model, one symbol per line
    #[clap(long)]
    pub dict: PathBuf,
    /// Intra thread parallelism max is cpu cores - 1
    #[clap(long, default_value_t = 192)]
    pub intra_threads: usize,
    /// Where the text report is written. Default: plate_ocr_report.txt
    #[clap(long)]
    pub report: Option<PathBuf>,
    /// Also write the metrics as JSON
    #[clap(long)]
    pub report_json: Option<PathBuf>,
    /// Normalize the manifest labels like the predictions
    #[clap(long, default_value_t = false)]
    pub normalize_ground_truth: bool,
    /// JSON configuration file, flags given on the command line take precedence
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Sets the level of logging
    #[clap(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
    /// If log_path is set, then stdout logging will be disabled and it will log to file
    #[clap(long)]
    pub log_path: Option<PathBuf>,
}

impl EvaluatorCli {
    pub fn to_config(&self) -> anyhow::Result<EvaluatorConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => EvaluatorConfig::default(),
        };
        if let Some(dataset_dir) = &self.dataset_dir {
            config.dataset_dir = dataset_dir.clone();
        }
        if let Some(report) = &self.report {
            config.report_path = report.clone();
        }
        if self.report_json.is_some() {
            config.report_json_path = self.report_json.clone();
        }
        if self.normalize_ground_truth {
            config.normalize_ground_truth = true;
        }
        config.validate()?;
        Ok(config)
    }
}
