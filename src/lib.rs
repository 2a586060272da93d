use clap::ValueEnum;
use std::path::PathBuf;
use tracing::{Level, info};
pub mod cli;
pub mod config;
pub mod dataset;
pub mod distortion;
pub mod error;
pub mod evaluator;
pub mod font;
pub mod image;
pub mod manifest;
pub mod metrics;
pub mod normalize;
pub mod ocr;
pub mod plate_text;
pub mod preprocess;
pub mod render;
pub mod report;

pub use error::PlateError;

pub static MANIFEST_FILE_NAME: &str = "ground_truth.txt";
pub static DEFAULT_DATASET_DIR: &str = "dataset_placas";
pub static DEFAULT_REPORT_FILE_NAME: &str = "plate_ocr_report.txt";

/// Builds the `StdRng` used by both pipelines: seeded when reproducibility is
/// requested, otherwise from OS entropy.
pub fn create_rng(seed: Option<u64>) -> rand::rngs::StdRng {
    use rand::SeedableRng;
    match seed {
        Some(seed) => {
            info!(seed, "Using seeded random generator");
            rand::rngs::StdRng::seed_from_u64(seed)
        }
        None => rand::rngs::StdRng::from_entropy(),
    }
}

pub fn init_logging(
    log_level: LogLevel,
    log_path: Option<PathBuf>,
    log_file_name: &str,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_string(log_level)));

    let guard = if let Some(log_directory) = log_path {
        std::fs::create_dir_all(&log_directory)?;
        println!(
            "Logging into: {}",
            log_directory.join(log_file_name).display()
        );

        let file_appender = tracing_appender::rolling::daily(&log_directory, log_file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .try_init()
            .map_err(|_| anyhow::anyhow!("Logging already initialized"))?;

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|_| anyhow::anyhow!("Logging already initialized"))?;

        None
    };

    info!(?log_level, "Logging initialized");
    Ok(guard)
}

fn level_to_filter_string(log_level: LogLevel) -> String {
    match log_level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
    .to_string()
}

#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    ValueEnum,
    Debug,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}
