use crate::{config::PlateLayout, font::PlateFont};
use image::{Rgb, RgbImage};
use tracing::trace;

/// Draws distortion-free plates: background, header band with its caption
/// and the centred plate identifier.
pub struct PlateRenderer {
    layout: PlateLayout,
    font: PlateFont,
}

impl PlateRenderer {
    pub fn new(layout: PlateLayout, font: PlateFont) -> Self {
        Self { layout, font }
    }

    pub fn layout(&self) -> &PlateLayout {
        &self.layout
    }

    pub fn font(&self) -> &PlateFont {
        &self.font
    }

    pub fn render(&self, plate_text: &str) -> RgbImage {
        let layout = &self.layout;
        let mut img = RgbImage::from_pixel(layout.width, layout.height, Rgb(layout.background));

        let band_height = (layout.band_bottom + 1).min(layout.height);
        if band_height > 0 {
            imageproc::drawing::draw_filled_rect_mut(
                &mut img,
                imageproc::rect::Rect::at(0, 0).of_size(layout.width, band_height),
                Rgb(layout.band_color),
            );
        }

        if !layout.header_text.is_empty() {
            let (header_w, _) = self.font.measure(&layout.header_text, layout.header_size);
            let header_x = centered(layout.width, header_w);
            self.font.draw(
                &mut img,
                &layout.header_text,
                header_x,
                layout.header_y,
                layout.header_size,
                Rgb(layout.header_color),
            );
        }

        let (text_w, text_h) = self.font.measure(plate_text, layout.text_size);
        let x = centered(layout.width, text_w);
        let y = centered(layout.height, text_h) + layout.text_y_offset;
        trace!(plate_text, x, y, text_w, text_h, "Placing plate text");
        self.font.draw(
            &mut img,
            plate_text,
            x,
            y,
            layout.text_size,
            Rgb(layout.text_color),
        );

        img
    }
}

fn centered(outer: u32, inner: u32) -> i32 {
    (outer as i32 - inner as i32) / 2
}
