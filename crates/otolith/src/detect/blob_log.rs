//! Multi-scale blob ring detector (Laplacian of Gaussian).
//!
//! LoG responses are computed at several scales, scale-normalized, and
//! collapsed with a pixel-wise maximum so both thin and diffuse annuli
//! contribute. The combined response is radially averaged and its peaks
//! become ring candidates.

use image::{GrayImage, ImageBuffer, Luma};
use rayon::prelude::*;

use super::peaks::response_peak_radii;
use super::{finalize_radii, response_radial_profile, DetectorInputs, Method, MethodResult};

type GrayF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Configuration for the multi-scale blob detector.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BlobLogConfig {
    /// Gaussian scales (sigma, pixels) of the LoG bank.
    pub sigmas: Vec<f32>,
    /// Rays used for radial averaging of the response.
    pub n_rays: usize,
    /// Minimum spacing between candidate rings, in pixels.
    pub min_ring_spacing_px: usize,
    /// Peak prominence threshold as a multiple of the profile std-dev.
    pub prominence_factor: f32,
}

impl Default for BlobLogConfig {
    fn default() -> Self {
        Self {
            sigmas: vec![1.0, 2.0, 3.0, 4.0, 5.0],
            n_rays: 360,
            min_ring_spacing_px: 3,
            prominence_factor: 0.25,
        }
    }
}

fn to_f32(gray: &GrayImage) -> GrayF32 {
    let (w, h) = gray.dimensions();
    let data: Vec<f32> = gray.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    GrayF32::from_raw(w, h, data).expect("buffer length matches dimensions")
}

/// Scale-normalized |LoG| response at one sigma.
fn log_response(img: &GrayF32, sigma: f32) -> Vec<f32> {
    let blurred = imageproc::filter::gaussian_blur_f32(img, sigma);
    let (w, h) = blurred.dimensions();
    let (w, h) = (w as usize, h as usize);
    let data = blurred.as_raw();
    let norm = sigma * sigma;

    let mut out = vec![0.0f32; w * h];
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let i = y * w + x;
            let lap = data[i - 1] + data[i + 1] + data[i - w] + data[i + w] - 4.0 * data[i];
            out[i] = (lap * norm).abs();
        }
    }
    out
}

pub(crate) fn detect(
    inputs: &DetectorInputs,
    config: &BlobLogConfig,
) -> Result<MethodResult, String> {
    if config.sigmas.is_empty() {
        return Err("no scales configured".to_string());
    }
    let fimg = to_f32(&inputs.image);

    let responses: Vec<Vec<f32>> = config
        .sigmas
        .par_iter()
        .map(|&sigma| log_response(&fimg, sigma.max(0.5)))
        .collect();

    // Pixel-wise maximum across scales.
    let mut combined = responses[0].clone();
    for resp in &responses[1..] {
        for (acc, &v) in combined.iter_mut().zip(resp) {
            if v > *acc {
                *acc = v;
            }
        }
    }
    let max = combined.iter().cloned().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return Ok(MethodResult::empty(Method::MultiScaleBlob));
    }
    for v in combined.iter_mut() {
        *v = *v / max * 255.0;
    }

    let profile = response_radial_profile(
        &combined,
        inputs.image.dimensions(),
        inputs.center,
        config.n_rays,
    );
    if profile.len() < 5 {
        return Err("radial extent too small for blob profiling".to_string());
    }

    let radii = finalize_radii(
        response_peak_radii(&profile, config.min_ring_spacing_px, config.prominence_factor),
        (profile.len() - 1) as f32,
    );
    let confidence = (radii.len() as f32 / 15.0).min(1.0) * 0.70;
    Ok(MethodResult {
        method: Method::MultiScaleBlob,
        radii,
        confidence,
    })
}
