use crate::PlateError;
use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use std::path::Path;
use tracing::{info, warn};

const GLYPH_COLUMNS: u32 = 5;
const GLYPH_ROWS: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_COLUMNS + 1;

/// Font used to draw plate captions.
///
/// `Builtin` is a compiled-in 5x7 bitmap font covering `A-Z`, `0-9`, `-` and
/// space, used when no usable TrueType font is configured.
#[derive(Clone)]
pub enum PlateFont {
    TrueType(FontArc),
    Builtin,
}

impl std::fmt::Debug for PlateFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlateFont::TrueType(_) => write!(f, "PlateFont::TrueType"),
            PlateFont::Builtin => write!(f, "PlateFont::Builtin"),
        }
    }
}

impl PlateFont {
    pub fn load(path: &Path) -> Result<Self, PlateError> {
        let bytes = std::fs::read(path).map_err(|e| {
            PlateError::Configuration(format!("Failed to read font {}: {e}", path.display()))
        })?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| {
            PlateError::Configuration(format!("Failed to parse font {}: {e}", path.display()))
        })?;
        Ok(PlateFont::TrueType(font))
    }

    /// Loads the configured font, falling back to the built-in bitmap font
    /// when none is configured or loading fails.
    pub fn resolve(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("No font configured, using built-in bitmap font");
            return PlateFont::Builtin;
        };
        match PlateFont::load(path) {
            Ok(font) => {
                info!(font = %path.display(), "Using TrueType font");
                font
            }
            Err(e) => {
                warn!("{e}, falling back to built-in bitmap font");
                PlateFont::Builtin
            }
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, PlateFont::Builtin)
    }

    /// Width and height of the box `text` occupies when drawn at `size` px.
    pub fn measure(&self, text: &str, size: f32) -> (u32, u32) {
        match self {
            PlateFont::TrueType(font) => {
                imageproc::drawing::text_size(PxScale::from(size), font, text)
            }
            PlateFont::Builtin => {
                let glyphs = text.chars().count() as u32;
                if glyphs == 0 {
                    return (0, 0);
                }
                let unit = builtin_unit(size);
                (glyphs * GLYPH_ADVANCE * unit - unit, GLYPH_ROWS * unit)
            }
        }
    }

    /// Draws `text` with its top-left corner at `(x, y)`; anything outside
    /// the canvas is clipped.
    pub fn draw(&self, canvas: &mut RgbImage, text: &str, x: i32, y: i32, size: f32, color: Rgb<u8>) {
        match self {
            PlateFont::TrueType(font) => {
                imageproc::drawing::draw_text_mut(canvas, color, x, y, PxScale::from(size), font, text)
            }
            PlateFont::Builtin => {
                let unit = builtin_unit(size);
                for (index, c) in text.chars().enumerate() {
                    let origin_x = x + (index as u32 * GLYPH_ADVANCE * unit) as i32;
                    let bitmap = builtin_glyph(c);
                    for (row, bits) in bitmap.iter().enumerate() {
                        for column in 0..GLYPH_COLUMNS {
                            if bits & (1 << (GLYPH_COLUMNS - 1 - column)) == 0 {
                                continue;
                            }
                            imageproc::drawing::draw_filled_rect_mut(
                                canvas,
                                imageproc::rect::Rect::at(
                                    origin_x + (column * unit) as i32,
                                    y + (row as u32 * unit) as i32,
                                )
                                .of_size(unit, unit),
                                color,
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Pixel size of one bitmap cell for a requested font size.
fn builtin_unit(size: f32) -> u32 {
    ((size / 10.0).floor() as u32).max(1)
}

fn builtin_glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        _ => [0x00; 7],
    }
}
