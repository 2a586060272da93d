use crate::PlateError;
use anyhow::bail;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions};
use image::{GrayImage, RgbImage};
use jpeg_encoder::{ColorType, Encoder};
use std::{path::Path, time::Instant};
use tracing::{debug, trace};
use zune_core::{colorspace::ColorSpace, options::DecoderOptions};
use zune_jpeg::JpegDecoder;

pub fn decode_jpeg(jpeg: &[u8]) -> anyhow::Result<RgbImage> {
    let options = DecoderOptions::default()
        .set_strict_mode(true)
        .set_use_unsafe(true)
        .jpeg_set_out_colorspace(ColorSpace::RGB);
    let mut decoder = JpegDecoder::new_with_options(jpeg, options);
    // We need to decode the headers first to get the output buffer size
    decoder.decode_headers()?;
    let output_buffer_size = decoder
        .output_buffer_size()
        .ok_or_else(|| anyhow::anyhow!("Failed to get decoder output buffer size"))?;
    let mut pixels = vec![0; output_buffer_size];
    decoder.decode_into(&mut pixels)?;
    let (width, height) = decoder
        .dimensions()
        .ok_or_else(|| anyhow::anyhow!("Failed to get image dimensions"))?;
    RgbImage::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| anyhow::anyhow!("Decoded buffer does not match {width}x{height}"))
}

/// Reads and decodes one dataset image. Any failure is reported as
/// [`PlateError::ImageRead`] so the caller can skip the record.
pub fn load_plate_image(path: &Path) -> Result<RgbImage, PlateError> {
    let read_error = |reason: String| PlateError::ImageRead {
        path: path.to_path_buf(),
        reason,
    };
    let name = path.to_string_lossy();
    if !is_jpeg(&name) {
        return Err(read_error("Image is not a JPEG file".to_string()));
    }
    let decode_start_time = Instant::now();
    let bytes = std::fs::read(path).map_err(|e| read_error(e.to_string()))?;
    let image = decode_jpeg(&bytes).map_err(|e| read_error(e.to_string()))?;
    trace!(
        decode_image_time = ?decode_start_time.elapsed(),
        "Decoded {}x{} image",
        image.width(),
        image.height()
    );
    Ok(image)
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> anyhow::Result<Vec<u8>> {
    let mut jpeg = Vec::new();
    let encoder = Encoder::new(&mut jpeg, quality);
    let (width, height) = jpeg_dimensions(image)?;
    encoder.encode(image.as_raw(), width, height, ColorType::Rgb)?;
    Ok(jpeg)
}

pub fn save_jpeg(image: &RgbImage, jpeg_file: &Path, quality: u8) -> anyhow::Result<()> {
    let encode_image_start_time = Instant::now();
    let encoder = Encoder::new_file(jpeg_file, quality)?;
    let (width, height) = jpeg_dimensions(image)?;
    encoder.encode(image.as_raw(), width, height, ColorType::Rgb)?;
    let encode_image_time = Instant::now().duration_since(encode_image_start_time);
    debug!(?encode_image_time, ?jpeg_file, "Image saved");
    Ok(())
}

fn jpeg_dimensions(image: &RgbImage) -> anyhow::Result<(u16, u16)> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || width > u16::MAX as u32 || height > u16::MAX as u32 {
        bail!("Cannot encode a {width}x{height} image as JPEG");
    }
    Ok((width as u16, height as u16))
}

pub fn is_jpeg(image_name: &str) -> bool {
    image_name.to_lowercase().ends_with(".jpg") || image_name.to_lowercase().ends_with(".jpeg")
}

/// Single channel resizer with linear interpolation, reused across images.
pub struct Resizer {
    resizer: fast_image_resize::Resizer,
    options: ResizeOptions,
}

impl Default for Resizer {
    fn default() -> Self {
        Self {
            resizer: fast_image_resize::Resizer::new(),
            options: ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        }
    }
}

impl Resizer {
    pub fn resize_gray(
        &mut self,
        original_image: &GrayImage,
        target_width: u32,
        target_height: u32,
    ) -> anyhow::Result<GrayImage> {
        trace!(
            "Resizing image from {}x{} to {}x{}",
            original_image.width(),
            original_image.height(),
            target_width,
            target_height
        );
        let src_image = fast_image_resize::images::ImageRef::new(
            original_image.width(),
            original_image.height(),
            original_image.as_raw(),
            PixelType::U8,
        )?;
        let mut dst_image =
            fast_image_resize::images::Image::new(target_width, target_height, PixelType::U8);

        self.resizer.resize(&src_image, &mut dst_image, &self.options)?;

        GrayImage::from_raw(target_width, target_height, dst_image.into_vec())
            .ok_or_else(|| anyhow::anyhow!("Failed to create resized image buffer"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_is_jpeg() {
        assert!(is_jpeg("placa_001.jpg"));
        assert!(is_jpeg("PLACA.JPEG"));
        assert!(!is_jpeg("placa.png"));
    }

    #[test]
    fn test_jpeg_roundtrip_keeps_size_and_colour() {
        let image = RgbImage::from_pixel(64, 32, Rgb([200, 40, 40]));
        let jpeg = encode_jpeg(&image, 90).unwrap();
        let decoded = decode_jpeg(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (64, 32));
        let p = decoded.get_pixel(30, 15).0;
        assert!((p[0] as i32 - 200).abs() < 12);
        assert!((p[1] as i32 - 40).abs() < 12);
    }

    #[test]
    fn test_load_missing_image_is_read_error() {
        let result = load_plate_image(Path::new("/nonexistent/placa_001.jpg"));
        assert!(matches!(result, Err(PlateError::ImageRead { .. })));
    }

    #[test]
    fn test_load_garbage_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();
        assert!(matches!(
            load_plate_image(&path),
            Err(PlateError::ImageRead { .. })
        ));
    }

    #[test]
    fn test_resize_gray_doubles_size() {
        let image = GrayImage::from_pixel(10, 6, Luma([120]));
        let mut resizer = Resizer::default();
        let resized = resizer.resize_gray(&image, 20, 12).unwrap();
        assert_eq!(resized.dimensions(), (20, 12));
        assert!(resized.pixels().all(|p| (p.0[0] as i32 - 120).abs() <= 1));
    }

    #[test]
    fn test_encode_rejects_empty_image() {
        let image = RgbImage::new(0, 0);
        assert!(encode_jpeg(&image, 75).is_err());
    }
}
