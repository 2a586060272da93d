//! Pipeline configuration
//!
//! Settings for the generator and the evaluator, stored as JSON. Every default
//! matches the reference plate recipe so an empty config file reproduces it.

use crate::{DEFAULT_DATASET_DIR, DEFAULT_REPORT_FILE_NAME, MANIFEST_FILE_NAME, PlateError};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};

/// Geometry and colours of a rendered plate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateLayout {
    pub width: u32,
    pub height: u32,
    pub background: [u8; 3],
    /// Colour of the header band at the top of the plate
    pub band_color: [u8; 3],
    /// Last row covered by the header band (inclusive)
    pub band_bottom: u32,
    pub header_text: String,
    pub header_color: [u8; 3],
    pub header_size: f32,
    /// Top edge of the header caption
    pub header_y: i32,
    pub text_color: [u8; 3],
    pub text_size: f32,
    /// Downward shift of the plate text from the vertical centre
    pub text_y_offset: i32,
}

impl Default for PlateLayout {
    fn default() -> Self {
        Self {
            width: 300,
            height: 100,
            background: [255, 255, 255],
            band_color: [0, 56, 147],
            band_bottom: 25,
            header_text: "ECUADOR".to_string(),
            header_color: [255, 255, 255],
            header_size: 14.0,
            header_y: 5,
            text_color: [0, 0, 0],
            text_size: 60.0,
            text_y_offset: 10,
        }
    }
}

/// Random ranges of the capture simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistortionConfig {
    /// Rotation is drawn from [-max, +max] degrees
    pub max_rotation_degrees: f32,
    pub blur_probability: f64,
    pub blur_sigma_min: f32,
    pub blur_sigma_max: f32,
    pub noise_count_min: u32,
    pub noise_count_max: u32,
    pub noise_gray_min: u8,
    pub noise_gray_max: u8,
}

impl Default for DistortionConfig {
    fn default() -> Self {
        Self {
            max_rotation_degrees: 4.0,
            blur_probability: 0.7,
            blur_sigma_min: 0.5,
            blur_sigma_max: 1.2,
            noise_count_min: 50,
            noise_count_max: 400,
            noise_gray_min: 50,
            noise_gray_max: 200,
        }
    }
}

/// Fixed recipe applied to every image before it reaches the OCR engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Fraction of the image height removed from the top
    pub header_crop_fraction: f32,
    pub upscale_factor: u32,
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid is `clahe_tiles x clahe_tiles`
    pub clahe_tiles: u32,
    pub blur_sigma: f32,
    /// Side of the adaptive threshold neighbourhood, odd
    pub threshold_block_size: u32,
    /// Constant subtracted from the local mean
    pub threshold_offset: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            header_crop_fraction: 0.28,
            upscale_factor: 2,
            clahe_clip_limit: 3.0,
            clahe_tiles: 8,
            blur_sigma: 0.8,
            threshold_block_size: 61,
            threshold_offset: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub output_dir: PathBuf,
    pub count: u32,
    /// Fixed seed for a reproducible dataset
    pub seed: Option<u64>,
    /// TrueType font; the built-in bitmap font is used when absent
    pub font: Option<PathBuf>,
    pub jpeg_quality: u8,
    pub layout: PlateLayout,
    pub distortion: DistortionConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_DATASET_DIR),
            count: 500,
            seed: None,
            font: None,
            jpeg_quality: 75,
            layout: PlateLayout::default(),
            distortion: DistortionConfig::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(MANIFEST_FILE_NAME)
    }

    pub fn validate(&self) -> Result<(), PlateError> {
        let layout = &self.layout;
        if layout.width == 0 || layout.height == 0 {
            return Err(PlateError::Configuration(format!(
                "Plate size must be non-zero, got {}x{}",
                layout.width, layout.height
            )));
        }
        if layout.width > u16::MAX as u32 || layout.height > u16::MAX as u32 {
            return Err(PlateError::Configuration(format!(
                "Plate size {}x{} exceeds the JPEG limit of {}",
                layout.width,
                layout.height,
                u16::MAX
            )));
        }
        if self.count == 0 {
            return Err(PlateError::Configuration(
                "Image count must be at least 1".to_string(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(PlateError::Configuration(format!(
                "JPEG quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        self.distortion.validate()
    }
}

impl DistortionConfig {
    pub fn validate(&self) -> Result<(), PlateError> {
        if !(self.max_rotation_degrees >= 0.0) {
            return Err(PlateError::Configuration(format!(
                "Rotation bound must be non-negative, got {}",
                self.max_rotation_degrees
            )));
        }
        if !(0.0..=1.0).contains(&self.blur_probability) {
            return Err(PlateError::Configuration(format!(
                "Blur probability must be in [0, 1], got {}",
                self.blur_probability
            )));
        }
        if !(self.blur_sigma_min > 0.0 && self.blur_sigma_min <= self.blur_sigma_max) {
            return Err(PlateError::Configuration(format!(
                "Blur sigma range [{}, {}] is invalid",
                self.blur_sigma_min, self.blur_sigma_max
            )));
        }
        if self.noise_count_min > self.noise_count_max {
            return Err(PlateError::Configuration(format!(
                "Noise count range [{}, {}] is invalid",
                self.noise_count_min, self.noise_count_max
            )));
        }
        if self.noise_gray_min > self.noise_gray_max {
            return Err(PlateError::Configuration(format!(
                "Noise gray range [{}, {}] is invalid",
                self.noise_gray_min, self.noise_gray_max
            )));
        }
        Ok(())
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<(), PlateError> {
        if !(0.0..1.0).contains(&self.header_crop_fraction) {
            return Err(PlateError::Configuration(format!(
                "Header crop fraction must be in [0, 1), got {}",
                self.header_crop_fraction
            )));
        }
        if self.upscale_factor == 0 || self.clahe_tiles == 0 {
            return Err(PlateError::Configuration(
                "Upscale factor and CLAHE tile count must be at least 1".to_string(),
            ));
        }
        if self.threshold_block_size < 3 || self.threshold_block_size % 2 == 0 {
            return Err(PlateError::Configuration(format!(
                "Threshold block size must be odd and at least 3, got {}",
                self.threshold_block_size
            )));
        }
        if !(self.blur_sigma > 0.0 && self.clahe_clip_limit > 0.0) {
            return Err(PlateError::Configuration(
                "Blur sigma and CLAHE clip limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub dataset_dir: PathBuf,
    pub manifest_file_name: String,
    /// Run labels through the normalizer as well, for manifests of unknown origin
    pub normalize_ground_truth: bool,
    pub preprocess: PreprocessConfig,
    pub report_path: PathBuf,
    pub report_json_path: Option<PathBuf>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from(DEFAULT_DATASET_DIR),
            manifest_file_name: MANIFEST_FILE_NAME.to_string(),
            normalize_ground_truth: false,
            preprocess: PreprocessConfig::default(),
            report_path: PathBuf::from(DEFAULT_REPORT_FILE_NAME),
            report_json_path: None,
        }
    }
}

impl EvaluatorConfig {
    pub fn manifest_path(&self) -> PathBuf {
        self.dataset_dir.join(&self.manifest_file_name)
    }

    pub fn validate(&self) -> Result<(), PlateError> {
        if self.manifest_file_name.is_empty() {
            return Err(PlateError::Configuration(
                "Manifest file name must not be empty".to_string(),
            ));
        }
        self.preprocess.validate()
    }
}

/// Load configuration from a JSON file
pub fn load_config<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)?;
    let config: T = serde_json::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a JSON file
pub fn save_config<T: Serialize>(config: &T, path: &Path) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
