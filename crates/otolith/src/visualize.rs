//! Review overlay rendering: detected rings and nucleus on the input image.
//!
//! Rendering is best effort. Any failure is logged and the report simply
//! omits the overlay; the numeric result is never blocked on it.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder, Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_circle_mut};

const RING_COLOR: Rgb<u8> = Rgb([235, 64, 52]);
const CENTER_COLOR: Rgb<u8> = Rgb([255, 214, 0]);

/// Draw the nucleus and ring circles over an RGB copy of the input.
pub(crate) fn render_overlay(gray: &GrayImage, center: [u32; 2], radii: &[f32]) -> RgbImage {
    let (w, h) = gray.dimensions();
    let mut canvas = RgbImage::new(w, h);
    for (x, y, p) in gray.enumerate_pixels() {
        let v = p[0];
        canvas.put_pixel(x, y, Rgb([v, v, v]));
    }

    let (cx, cy) = (center[0] as i32, center[1] as i32);
    for &r in radii {
        let r = r.round() as i32;
        if r > 0 {
            draw_hollow_circle_mut(&mut canvas, (cx, cy), r, RING_COLOR);
        }
    }
    draw_cross_mut(&mut canvas, CENTER_COLOR, cx, cy);
    canvas
}

/// Encode the overlay as PNG bytes; `None` (with a warning) on failure.
pub(crate) fn encode_png(overlay: &RgbImage) -> Option<Vec<u8>> {
    let (w, h) = overlay.dimensions();
    let mut bytes = Vec::new();
    match PngEncoder::new(&mut bytes).write_image(overlay.as_raw(), w, h, ExtendedColorType::Rgb8)
    {
        Ok(()) => Some(bytes),
        Err(e) => {
            tracing::warn!("overlay encoding failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_paints_rings_and_center() {
        let gray = GrayImage::from_pixel(100, 100, image::Luma([128]));
        let overlay = render_overlay(&gray, [50, 50], &[20.0]);
        assert_eq!(overlay.dimensions(), (100, 100));
        assert_eq!(*overlay.get_pixel(50, 50), CENTER_COLOR);
        assert_eq!(*overlay.get_pixel(70, 50), RING_COLOR);
        // Untouched pixels keep their grayscale value.
        assert_eq!(*overlay.get_pixel(5, 5), Rgb([128, 128, 128]));
    }

    #[test]
    fn png_encoding_round_trips() {
        let gray = GrayImage::from_pixel(32, 32, image::Luma([10]));
        let overlay = render_overlay(&gray, [16, 16], &[8.0]);
        let bytes = encode_png(&overlay).expect("in-memory encode");
        let decoded = image::load_from_memory(&bytes).expect("valid png").to_rgb8();
        assert_eq!(decoded.dimensions(), (32, 32));
    }
}
