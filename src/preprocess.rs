use crate::{config::PreprocessConfig, image::Resizer};
use anyhow::bail;
use image::{GrayImage, Luma, RgbImage, imageops};
use imageproc::filter::gaussian_blur_f32;
use std::time::Instant;
use tracing::trace;

const HISTOGRAM_BINS: usize = 256;

/// Header crop, BT.601 grayscale, bilinear upscale, CLAHE, Gaussian blur and
/// Gaussian adaptive threshold. Output pixels are 0 or 255.
pub struct Preprocessor {
    config: PreprocessConfig,
    resizer: Resizer,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self {
            config,
            resizer: Resizer::default(),
        }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    pub fn process(&mut self, image: &RgbImage) -> anyhow::Result<GrayImage> {
        let start = Instant::now();
        let cropped = crop_header(image, self.config.header_crop_fraction)?;
        let gray = to_grayscale(&cropped);

        let factor = self.config.upscale_factor;
        let upscaled =
            self.resizer
                .resize_gray(&gray, gray.width() * factor, gray.height() * factor)?;

        let equalized = clahe(
            &upscaled,
            self.config.clahe_clip_limit,
            self.config.clahe_tiles,
        );
        let smoothed = gaussian_blur_f32(&equalized, self.config.blur_sigma);
        let binary = adaptive_threshold(
            &smoothed,
            self.config.threshold_block_size,
            self.config.threshold_offset,
        );
        trace!(preprocess_time = ?start.elapsed(), "Preprocessed {}x{} image", binary.width(), binary.height());
        Ok(binary)
    }
}

/// Drops the top `floor(h * fraction)` rows.
pub fn crop_header(image: &RgbImage, fraction: f32) -> anyhow::Result<RgbImage> {
    let (width, height) = image.dimensions();
    let rows = (height as f32 * fraction).floor() as u32;
    if width == 0 || rows >= height {
        bail!("Nothing left of a {width}x{height} image after cropping {rows} header rows");
    }
    Ok(imageops::crop_imm(image, 0, rows, width, height - rows).to_image())
}

/// ITU-R BT.601 luma
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Contrast limited adaptive histogram equalization on a `tiles x tiles`
/// grid. Each tile gets its own clipped-histogram mapping; pixels blend the
/// mappings of the four nearest tile centres.
pub fn clahe(image: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let tiles_x = tiles.clamp(1, width);
    let tiles_y = tiles.clamp(1, height);

    let bounds = |index: u32, count: u32, size: u32| (index * size / count, (index + 1) * size / count);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        let (y0, y1) = bounds(ty, tiles_y, height);
        for tx in 0..tiles_x {
            let (x0, x1) = bounds(tx, tiles_x, width);
            let mut histogram = [0u32; HISTOGRAM_BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    histogram[image.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            let area = (x1 - x0) * (y1 - y0);
            luts.push(clipped_mapping(&mut histogram, area, clip_limit));
        }
    }

    // Position of a pixel in tile-centre coordinates
    let tile_coordinate = |pos: u32, count: u32, size: u32| -> (usize, usize, f32) {
        let t = (pos as f32 + 0.5) * count as f32 / size as f32 - 0.5;
        let t = t.clamp(0.0, (count - 1) as f32);
        let low = t.floor() as usize;
        let high = (low + 1).min(count as usize - 1);
        (low, high, t - low as f32)
    };

    GrayImage::from_fn(width, height, |x, y| {
        let (left, right, wx) = tile_coordinate(x, tiles_x, width);
        let (top, bottom, wy) = tile_coordinate(y, tiles_y, height);
        let value = image.get_pixel(x, y).0[0] as usize;
        let lut = |row: usize, col: usize| luts[row * tiles_x as usize + col][value] as f32;

        let upper = lut(top, left) * (1.0 - wx) + lut(top, right) * wx;
        let lower = lut(bottom, left) * (1.0 - wx) + lut(bottom, right) * wx;
        let blended = upper * (1.0 - wy) + lower * wy;
        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Clips the histogram at `max(1, clip_limit * area / 256)`, spreads the
/// excess over all bins and returns the scaled cumulative mapping.
fn clipped_mapping(histogram: &mut [u32; HISTOGRAM_BINS], area: u32, clip_limit: f32) -> [u8; HISTOGRAM_BINS] {
    let limit = ((clip_limit * area as f32 / HISTOGRAM_BINS as f32) as u32).max(1);

    let mut excess = 0;
    for bin in histogram.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let batch = excess / HISTOGRAM_BINS as u32;
    let residual = (excess % HISTOGRAM_BINS as u32) as usize;
    for bin in histogram.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (HISTOGRAM_BINS / residual).max(1);
        for bin in histogram.iter_mut().step_by(step).take(residual) {
            *bin += 1;
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut mapping = [0u8; HISTOGRAM_BINS];
    let mut cumulative = 0u32;
    for (value, bin) in histogram.iter().enumerate() {
        cumulative += bin;
        mapping[value] = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    mapping
}

/// Gaussian adaptive threshold: 255 where the pixel is brighter than the
/// Gaussian-weighted local mean minus `offset`, else 0.
pub fn adaptive_threshold(image: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let local_mean = gaussian_blur_f32(image, block_sigma(block_size));
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = image.get_pixel(x, y).0[0] as f32;
        let mean = local_mean.get_pixel(x, y).0[0] as f32;
        if pixel > mean - offset {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Sigma of a Gaussian kernel spanning `block_size` pixels
fn block_sigma(block_size: u32) -> f32 {
    0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}
