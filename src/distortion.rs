use crate::config::DistortionConfig;
use image::{Rgb, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use rand::Rng;

/// Parameters drawn for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedDistortion {
    /// Counter-clockwise rotation in degrees
    pub rotation_degrees: f32,
    /// `None` when the blur stage was skipped
    pub blur_sigma: Option<f32>,
    pub noise_pixels: u32,
}

/// Capture simulation: rotation, optional Gaussian blur, then speckle noise.
/// Noise goes last so the speckles stay sharp.
pub struct DistortionPipeline {
    config: DistortionConfig,
    fill: Rgb<u8>,
}

impl DistortionPipeline {
    /// `background` fills the pixels uncovered by the rotation.
    pub fn new(config: DistortionConfig, background: [u8; 3]) -> Self {
        Self {
            config,
            fill: Rgb(background),
        }
    }

    pub fn apply<R: Rng + ?Sized>(&self, image: &mut RgbImage, rng: &mut R) -> AppliedDistortion {
        let max_angle = self.config.max_rotation_degrees;
        let rotation_degrees = rng.gen_range(-max_angle..=max_angle);
        rotate_in_place(image, rotation_degrees, self.fill);

        let blur_sigma = if rng.gen_bool(self.config.blur_probability) {
            let sigma = rng.gen_range(self.config.blur_sigma_min..=self.config.blur_sigma_max);
            *image = gaussian_blur_f32(image, sigma);
            Some(sigma)
        } else {
            None
        };

        let noise_pixels = add_speckle_noise(image, &self.config, rng);

        AppliedDistortion {
            rotation_degrees,
            blur_sigma,
            noise_pixels,
        }
    }
}

/// Rotates counter-clockwise about the centre keeping the canvas size.
fn rotate_in_place(image: &mut RgbImage, degrees: f32, fill: Rgb<u8>) {
    if degrees == 0.0 {
        return;
    }
    // imageproc rotates clockwise for positive angles
    *image = rotate_about_center(image, -degrees.to_radians(), Interpolation::Nearest, fill);
}

/// Overwrites random pixels with random gray levels. The same coordinate may
/// be hit more than once; the last draw wins.
fn add_speckle_noise<R: Rng + ?Sized>(
    image: &mut RgbImage,
    config: &DistortionConfig,
    rng: &mut R,
) -> u32 {
    let (width, height) = image.dimensions();
    let count = rng.gen_range(config.noise_count_min..=config.noise_count_max);
    if width == 0 || height == 0 {
        return 0;
    }
    for _ in 0..count {
        let x = rng.gen_range(0..width);
        let y = rng.gen_range(0..height);
        let gray = rng.gen_range(config.noise_gray_min..=config.noise_gray_max);
        image.put_pixel(x, y, Rgb([gray, gray, gray]));
    }
    count
}
