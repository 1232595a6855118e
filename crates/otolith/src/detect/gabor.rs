//! Oriented-texture ring detector (Gabor filter bank).
//!
//! Rings are locally oriented bands, so a bank of Gabor filters across
//! orientations and spatial frequencies responds wherever banded texture
//! exists regardless of its direction. Responses are evaluated only at ray
//! sample points (full-frame convolution with this bank would dominate the
//! pipeline's runtime), radially averaged, and peak-extracted.

use rayon::prelude::*;

use super::peaks::response_peak_radii;
use super::{finalize_radii, DetectorInputs, Method, MethodResult};
use crate::profile::max_sample_radius;

/// Configuration for the Gabor-texture detector.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GaborConfig {
    /// Number of evenly spaced orientations over [0, pi).
    pub n_orientations: usize,
    /// Spatial frequencies in cycles per pixel.
    pub frequencies: Vec<f32>,
    /// Spatial aspect ratio of the Gaussian envelope.
    pub gamma: f32,
    /// Envelope sigma cap, bounding the kernel footprint.
    pub max_sigma: f32,
    /// Rays along which the response is evaluated.
    pub n_rays: usize,
    /// Minimum spacing between candidate rings, in pixels.
    pub min_ring_spacing_px: usize,
    /// Peak prominence threshold as a multiple of the profile std-dev.
    pub prominence_factor: f32,
}

impl Default for GaborConfig {
    fn default() -> Self {
        Self {
            n_orientations: 8,
            frequencies: vec![0.08, 0.15, 0.25],
            gamma: 0.5,
            max_sigma: 3.0,
            n_rays: 180,
            min_ring_spacing_px: 3,
            prominence_factor: 0.25,
        }
    }
}

/// One quadrature Gabor kernel (cosine and sine parts share the envelope).
struct GaborKernel {
    half: i32,
    re: Vec<f32>,
    im: Vec<f32>,
}

fn build_kernel(theta: f32, frequency: f32, gamma: f32, max_sigma: f32) -> GaborKernel {
    let sigma = (0.5 / frequency).min(max_sigma).max(1.0);
    let half = (2.0 * sigma).ceil() as i32;
    let side = (2 * half + 1) as usize;
    let (st, ct) = theta.sin_cos();
    let two_sigma_sq = 2.0 * sigma * sigma;
    let omega = 2.0 * std::f32::consts::PI * frequency;

    let mut re = vec![0.0f32; side * side];
    let mut im = vec![0.0f32; side * side];
    for dy in -half..=half {
        for dx in -half..=half {
            let xr = dx as f32 * ct + dy as f32 * st;
            let yr = -(dx as f32) * st + dy as f32 * ct;
            let envelope = (-(xr * xr + gamma * gamma * yr * yr) / two_sigma_sq).exp();
            let idx = ((dy + half) * (2 * half + 1) + (dx + half)) as usize;
            re[idx] = envelope * (omega * xr).cos();
            im[idx] = envelope * (omega * xr).sin();
        }
    }
    GaborKernel { half, re, im }
}

/// Quadrature magnitude of one kernel centered at (x, y).
///
/// Out-of-bounds taps are skipped, which slightly dampens the response
/// near the frame; ray radii already keep a margin from the edges.
fn kernel_magnitude_at(image: &image::GrayImage, kernel: &GaborKernel, x: i32, y: i32) -> f32 {
    let (w, h) = image.dimensions();
    let side = 2 * kernel.half + 1;
    let mut acc_re = 0.0f32;
    let mut acc_im = 0.0f32;
    for dy in -kernel.half..=kernel.half {
        let py = y + dy;
        if py < 0 || py >= h as i32 {
            continue;
        }
        for dx in -kernel.half..=kernel.half {
            let px = x + dx;
            if px < 0 || px >= w as i32 {
                continue;
            }
            let v = image.get_pixel(px as u32, py as u32)[0] as f32 / 255.0;
            let idx = ((dy + kernel.half) * side + (dx + kernel.half)) as usize;
            acc_re += v * kernel.re[idx];
            acc_im += v * kernel.im[idx];
        }
    }
    (acc_re * acc_re + acc_im * acc_im).sqrt()
}

pub(crate) fn detect(inputs: &DetectorInputs, config: &GaborConfig) -> Result<MethodResult, String> {
    if config.n_orientations == 0 || config.frequencies.is_empty() {
        return Err("empty filter bank".to_string());
    }
    let max_r = max_sample_radius(inputs.image.dimensions(), inputs.center, 2.0).floor() as usize;
    if max_r < 5 || config.n_rays == 0 {
        return Err(format!("usable radius {} px is too small", max_r));
    }

    let mut bank = Vec::with_capacity(config.n_orientations * config.frequencies.len());
    for o in 0..config.n_orientations {
        let theta = std::f32::consts::PI * o as f32 / config.n_orientations as f32;
        for &f in &config.frequencies {
            bank.push(build_kernel(theta, f.max(0.01), config.gamma, config.max_sigma));
        }
    }

    let (cx, cy) = (inputs.center[0] as f32, inputs.center[1] as f32);
    let n_rays = config.n_rays;

    // Maximum bank response along each ray; rays are independent.
    let per_ray: Vec<Vec<f32>> = (0..n_rays)
        .into_par_iter()
        .map(|i| {
            let theta = 2.0 * std::f32::consts::PI * i as f32 / n_rays as f32;
            let (st, ct) = theta.sin_cos();
            (0..=max_r)
                .map(|r| {
                    let x = (cx + ct * r as f32).round() as i32;
                    let y = (cy + st * r as f32).round() as i32;
                    bank.iter()
                        .map(|k| kernel_magnitude_at(&inputs.image, k, x, y))
                        .fold(0.0f32, f32::max)
                })
                .collect()
        })
        .collect();

    let mut profile = vec![0.0f32; max_r + 1];
    for ray in &per_ray {
        for (acc, &v) in profile.iter_mut().zip(ray) {
            *acc += v;
        }
    }
    for v in profile.iter_mut() {
        *v /= n_rays as f32;
    }

    let radii = finalize_radii(
        response_peak_radii(&profile, config.min_ring_spacing_px, config.prominence_factor),
        max_r as f32,
    );
    let confidence = (radii.len() as f32 / 15.0).min(1.0) * 0.70;
    Ok(MethodResult {
        method: Method::GaborTexture,
        radii,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{radial_profile, RadialProfileConfig};
    use crate::test_utils::{blur_gray, draw_otolith_image};
    use image::GrayImage;

    fn inputs_for(image: GrayImage, center: [u32; 2]) -> DetectorInputs {
        let profile = radial_profile(&image, center, &RadialProfileConfig::default());
        let mask = GrayImage::from_pixel(image.width(), image.height(), image::Luma([255]));
        DetectorInputs {
            image,
            mask,
            center,
            profile,
        }
    }

    #[test]
    fn banded_texture_produces_candidates() {
        let img = draw_otolith_image(140, 140, [70, 70], 55.0, &[14.0, 28.0, 42.0], 3.0);
        let inputs = inputs_for(blur_gray(&img, 0.8), [70, 70]);
        // Lean bank to keep the test fast; coverage of the full bank is a
        // bench concern, not a unit-test concern.
        let config = GaborConfig {
            n_orientations: 4,
            frequencies: vec![0.10, 0.20],
            n_rays: 60,
            ..GaborConfig::default()
        };
        let result = detect(&inputs, &config).unwrap();
        assert!(!result.radii.is_empty());
        assert!(result.confidence <= 0.70);
    }

    #[test]
    fn empty_bank_is_an_error() {
        let img = GrayImage::from_pixel(64, 64, image::Luma([100]));
        let inputs = inputs_for(img, [32, 32]);
        let config = GaborConfig {
            frequencies: Vec::new(),
            ..GaborConfig::default()
        };
        assert!(detect(&inputs, &config).is_err());
    }
}
