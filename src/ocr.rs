use crate::image::Resizer;
use anyhow::{anyhow, bail};
use image::GrayImage;
use ndarray::Array4;
use ort::{session::Session, value::TensorRef};
use smallvec::SmallVec;
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{debug, info};

pub const RECOGNITION_INPUT_HEIGHT: u32 = 48;
pub const MIN_RECOGNITION_WIDTH: u32 = 16;
pub const MAX_RECOGNITION_WIDTH: u32 = 960;
const CTC_BLANK_INDEX: usize = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub confidence: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

pub type Fragments = SmallVec<[TextFragment; 4]>;

pub trait OcrEngine {
    /// Recognizes the text in a preprocessed image. An empty result means
    /// nothing was found.
    fn recognize(&mut self, image: &GrayImage) -> anyhow::Result<Fragments>;

    fn name(&self) -> &str;
}

impl<E: OcrEngine + ?Sized> OcrEngine for Box<E> {
    fn recognize(&mut self, image: &GrayImage) -> anyhow::Result<Fragments> {
        (**self).recognize(image)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Concatenates fragment texts in the order the engine returned them.
pub fn join_fragments(fragments: &[TextFragment]) -> String {
    fragments.iter().map(|f| f.text.as_str()).collect()
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    pub model: PathBuf,
    /// Character dictionary, one symbol per line
    pub dictionary: PathBuf,
    pub input_name: String,
    pub intra_threads: usize,
}

impl OnnxConfig {
    pub fn new(model: PathBuf, dictionary: PathBuf) -> Self {
        Self {
            model,
            dictionary,
            input_name: "x".to_string(),
            intra_threads: 2,
        }
    }
}

pub struct OnnxTextRecognizer {
    session: Session,
    input_name: String,
    model_name: String,
    dictionary: Vec<String>,
    resizer: Resizer,
    input: Array4<f32>,
}

impl OnnxTextRecognizer {
    pub fn new(config: &OnnxConfig) -> anyhow::Result<Self> {
        let dictionary = load_dictionary(&config.dictionary)?;
        let num_intra_threads = config
            .intra_threads
            .min(num_cpus::get_physical().saturating_sub(1))
            .max(1);

        let model_name = config
            .model
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow!("Invalid model path {:?}", config.model))?
            .to_string();
        info!(
            "Initializing recognizer with model: {:?} on CPU with {} intra threads and {} symbols",
            model_name,
            num_intra_threads,
            dictionary.len()
        );

        let session = Session::builder()?
            .with_intra_threads(num_intra_threads)?
            .commit_from_file(&config.model)?;

        Ok(Self {
            session,
            input_name: config.input_name.clone(),
            model_name,
            dictionary,
            resizer: Resizer::default(),
            input: Array4::zeros((1, 3, RECOGNITION_INPUT_HEIGHT as usize, MIN_RECOGNITION_WIDTH as usize)),
        })
    }

    fn prepare_input(&mut self, image: &GrayImage) -> anyhow::Result<()> {
        let width = recognition_width(image.width(), image.height())?;
        let resized = self
            .resizer
            .resize_gray(image, width, RECOGNITION_INPUT_HEIGHT)?;
        fill_recognition_input(&mut self.input, &resized);
        Ok(())
    }
}

/// Writes `image` into a `[1, 3, H, W]` tensor, the gray value replicated on
/// all three channels and scaled to `[-1, 1]`. The tensor is reallocated when
/// its shape does not match the image.
pub fn fill_recognition_input(input: &mut Array4<f32>, image: &GrayImage) {
    let shape = (1, 3, image.height() as usize, image.width() as usize);
    if input.dim() != shape {
        *input = Array4::zeros(shape);
    }
    for (x, y, pixel) in image.enumerate_pixels() {
        let value = (pixel.0[0] as f32 / 255.0 - 0.5) / 0.5;
        for c in 0..3 {
            input[[0, c, y as usize, x as usize]] = value;
        }
    }
}

impl OcrEngine for OnnxTextRecognizer {
    fn recognize(&mut self, image: &GrayImage) -> anyhow::Result<Fragments> {
        self.prepare_input(image)?;

        let inference_start_time = Instant::now();
        let tensor = TensorRef::from_array_view(self.input.view())?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])?;
        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| anyhow!("Model {} produced no outputs", self.model_name))?;
        let (shape, data) = output.try_extract_tensor::<f32>()?;
        if shape.len() != 3 {
            bail!("Expected a [1, T, C] output, got shape {:?}", &shape[..]);
        }
        let steps = shape[1] as usize;
        let classes = shape[2] as usize;
        let fragment = ctc_greedy_decode(data, steps, classes, &self.dictionary)?;
        debug!(inference_time = ?inference_start_time.elapsed(), text = %fragment.text, "Recognized");

        let mut fragments = Fragments::new();
        if !fragment.text.is_empty() {
            fragments.push(fragment);
        }
        Ok(fragments)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

/// Width for a fixed height of 48 keeping the aspect ratio.
pub fn recognition_width(width: u32, height: u32) -> anyhow::Result<u32> {
    if width == 0 || height == 0 {
        bail!("Cannot recognize text in a {width}x{height} image");
    }
    let scaled = (width as f32 * RECOGNITION_INPUT_HEIGHT as f32 / height as f32).round() as u32;
    Ok(scaled.clamp(MIN_RECOGNITION_WIDTH, MAX_RECOGNITION_WIDTH))
}

/// Reads one symbol per line and appends the space symbol.
pub fn load_dictionary(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read dictionary {path:?}: {e}"))?;
    Ok(parse_dictionary(&content))
}

pub fn parse_dictionary(content: &str) -> Vec<String> {
    let mut symbols: Vec<String> = content
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .filter(|line| !line.is_empty())
        .collect();
    symbols.push(" ".to_string());
    symbols
}

/// Greedy CTC decoding of a row-major `[steps, classes]` score matrix:
/// arg-max per step, repeats collapsed, blanks dropped. Class `i` maps to
/// `dictionary[i - 1]`. Confidence is the mean score of the kept steps.
pub fn ctc_greedy_decode(
    scores: &[f32],
    steps: usize,
    classes: usize,
    dictionary: &[String],
) -> anyhow::Result<TextFragment> {
    if classes == 0 || scores.len() < steps * classes {
        bail!(
            "Score buffer of {} values does not hold {steps}x{classes}",
            scores.len()
        );
    }

    let mut text = String::new();
    let mut kept_scores = Vec::new();
    let mut previous = None;
    for row in scores.chunks_exact(classes).take(steps) {
        let Some((index, &score)) = row
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };
        if index != CTC_BLANK_INDEX && previous != Some(index) {
            let symbol = dictionary
                .get(index - 1)
                .ok_or_else(|| anyhow!("Class {index} is outside the {} symbol dictionary", dictionary.len()))?;
            text.push_str(symbol);
            kept_scores.push(score);
        }
        previous = Some(index);
    }

    let confidence = if kept_scores.is_empty() {
        0.0
    } else {
        kept_scores.iter().sum::<f32>() / kept_scores.len() as f32
    };
    Ok(TextFragment { text, confidence })
}
