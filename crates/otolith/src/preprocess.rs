//! Image preprocessing: local contrast enhancement and edge-preserving denoising.
//!
//! Otolith photographs are unevenly lit (ring contrast fades toward the
//! margin) and carry sensor/texture noise at the same spatial scale as the
//! thinnest annuli. Contrast is therefore equalized per tile with bilinear
//! blending between tile lookup tables, and noise is suppressed with a
//! bilateral filter so ring boundaries survive smoothing.

use image::GrayImage;

/// Configuration for the preprocessing stage.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Side length of the histogram-equalization tiles, in pixels.
    pub tile_size: u32,
    /// Histogram clip limit as a multiple of the uniform bin height.
    pub clip_limit: f32,
    /// Bilateral filter window size (pixels, odd).
    pub bilateral_window: u32,
    /// Bilateral filter intensity sigma.
    pub bilateral_sigma_color: f32,
    /// Bilateral filter spatial sigma.
    pub bilateral_sigma_spatial: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            tile_size: 32,
            clip_limit: 3.0,
            bilateral_window: 5,
            bilateral_sigma_color: 25.0,
            bilateral_sigma_spatial: 3.0,
        }
    }
}

/// Equalize local contrast, then denoise while preserving ring edges.
///
/// Output has the same dimensions as the input. Zero-sized inputs are
/// rejected upstream.
pub fn preprocess(gray: &GrayImage, config: &PreprocessConfig) -> GrayImage {
    let equalized = tile_equalize(gray, config.tile_size.max(8), config.clip_limit);
    imageproc::filter::bilateral_filter(
        &equalized,
        config.bilateral_window,
        config.bilateral_sigma_color,
        config.bilateral_sigma_spatial,
    )
}

/// Per-tile clipped histogram lookup table.
fn tile_lut(gray: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let n = ((x1 - x0) * (y1 - y0)).max(1);

    // Clip bins and redistribute the excess uniformly.
    let limit = ((clip_limit * n as f32 / 256.0).ceil() as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let bump = excess / 256;
    let mut rem = (excess % 256) as usize;
    for bin in hist.iter_mut() {
        *bin += bump;
        if rem > 0 {
            *bin += 1;
            rem -= 1;
        }
    }

    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    for (v, bin) in hist.iter().enumerate() {
        cdf += *bin;
        lut[v] = ((255.0 * cdf as f32 / n as f32).round() as u32).min(255) as u8;
    }
    lut
}

/// Tiled histogram equalization with bilinear interpolation between tiles.
fn tile_equalize(gray: &GrayImage, tile: u32, clip_limit: f32) -> GrayImage {
    let (w, h) = gray.dimensions();
    let nx = w.div_ceil(tile).max(1) as usize;
    let ny = h.div_ceil(tile).max(1) as usize;

    let mut luts = Vec::with_capacity(nx * ny);
    for ty in 0..ny as u32 {
        for tx in 0..nx as u32 {
            let x0 = tx * tile;
            let y0 = ty * tile;
            luts.push(tile_lut(gray, x0, y0, (x0 + tile).min(w), (y0 + tile).min(h), clip_limit));
        }
    }

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let gy = (y as f32 + 0.5) / tile as f32 - 0.5;
        let ty0 = (gy.floor().max(0.0) as usize).min(ny - 1);
        let ty1 = ((gy.floor() + 1.0).max(0.0) as usize).min(ny - 1);
        let fy = (gy - gy.floor()).clamp(0.0, 1.0);
        for x in 0..w {
            let gx = (x as f32 + 0.5) / tile as f32 - 0.5;
            let tx0 = (gx.floor().max(0.0) as usize).min(nx - 1);
            let tx1 = ((gx.floor() + 1.0).max(0.0) as usize).min(nx - 1);
            let fx = (gx - gx.floor()).clamp(0.0, 1.0);

            let v = gray.get_pixel(x, y)[0] as usize;
            let v00 = luts[ty0 * nx + tx0][v] as f32;
            let v10 = luts[ty0 * nx + tx1][v] as f32;
            let v01 = luts[ty1 * nx + tx0][v] as f32;
            let v11 = luts[ty1 * nx + tx1][v] as f32;
            let top = v00 * (1.0 - fx) + v10 * fx;
            let bot = v01 * (1.0 - fx) + v11 * fx;
            let blended = top * (1.0 - fy) + bot * fy;
            out.put_pixel(x, y, image::Luma([blended.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_preserves_dimensions() {
        let img = GrayImage::from_fn(97, 64, |x, y| image::Luma([((x + y) % 256) as u8]));
        let out = preprocess(&img, &PreprocessConfig::default());
        assert_eq!(out.dimensions(), (97, 64));
    }

    #[test]
    fn equalization_stretches_low_contrast() {
        // Narrow-band input (values 100..=110) should spread after equalization.
        let img = GrayImage::from_fn(64, 64, |x, _| image::Luma([100 + (x % 11) as u8]));
        let out = tile_equalize(&img, 32, 3.0);
        let (mut lo, mut hi) = (255u8, 0u8);
        for p in out.pixels() {
            lo = lo.min(p[0]);
            hi = hi.max(p[0]);
        }
        assert!(
            hi - lo > 30,
            "equalized range {}..{} should exceed the 10-level input range",
            lo,
            hi
        );
    }

    #[test]
    fn uniform_image_stays_uniform() {
        let img = GrayImage::from_pixel(48, 48, image::Luma([128]));
        let out = preprocess(&img, &PreprocessConfig::default());
        let first = out.get_pixel(0, 0)[0];
        assert!(out.pixels().all(|p| p[0] == first));
    }
}
