//! Shared test utilities for synthetic otolith images.
//!
//! Detectors are exercised against rendered otoliths with known ring
//! geometry: a bright disk on a dark background, with darker annuli at
//! the requested radii. Gaussian blur approximates optical softness.

use image::{GrayImage, ImageBuffer, Luma};

const BACKGROUND: u8 = 15;
const DISK: u8 = 200;
const RING: u8 = 60;

/// Render a synthetic otolith: a bright disk carrying dark growth rings.
///
/// A pixel at distance `d` from `center` is background beyond
/// `disk_radius`, ring-dark within `ring_width / 2` of any entry of
/// `ring_radii`, and disk-bright otherwise.
pub(crate) fn draw_otolith_image(
    w: u32,
    h: u32,
    center: [u32; 2],
    disk_radius: f32,
    ring_radii: &[f32],
    ring_width: f32,
) -> GrayImage {
    let (cx, cy) = (center[0] as f32, center[1] as f32);
    GrayImage::from_fn(w, h, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let d = (dx * dx + dy * dy).sqrt();
        if d > disk_radius {
            return Luma([BACKGROUND]);
        }
        let on_ring = ring_radii
            .iter()
            .any(|&r| (d - r).abs() <= ring_width / 2.0);
        Luma([if on_ring { RING } else { DISK }])
    })
}

/// Render a uniform disk with no ring structure.
pub(crate) fn featureless_disk(
    w: u32,
    h: u32,
    center: [u32; 2],
    radius: f32,
    bg_pix: u8,
    disk_pix: u8,
) -> GrayImage {
    let (cx, cy) = (center[0] as f32, center[1] as f32);
    GrayImage::from_fn(w, h, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let d = (dx * dx + dy * dy).sqrt();
        Luma([if d <= radius { disk_pix } else { bg_pix }])
    })
}

/// Gaussian-blur a `GrayImage` via `imageproc`.
pub(crate) fn blur_gray(img: &GrayImage, sigma: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut f = ImageBuffer::<Luma<f32>, Vec<f32>>::new(w, h);
    for y in 0..h {
        for x in 0..w {
            f.put_pixel(x, y, Luma([img.get_pixel(x, y)[0] as f32 / 255.0]));
        }
    }
    let blurred = imageproc::filter::gaussian_blur_f32(&f, sigma);
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let v = blurred.get_pixel(x, y)[0].clamp(0.0, 1.0);
            out.put_pixel(x, y, Luma([(v * 255.0).round() as u8]));
        }
    }
    out
}
