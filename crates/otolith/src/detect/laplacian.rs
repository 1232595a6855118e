//! Laplacian-response ring detector.
//!
//! Annulus boundaries are intensity ridges/valleys, so the second
//! derivative responds strongly along them. The Laplacian magnitude is
//! normalized to 8-bit range and radially averaged; peaks of that profile
//! are ring candidates.

use super::peaks::response_peak_radii;
use super::{finalize_radii, response_radial_profile, DetectorInputs, Method, MethodResult};

/// Configuration for the Laplacian-response detector.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LaplacianConfig {
    /// Rays used for radial averaging of the response.
    pub n_rays: usize,
    /// Minimum spacing between candidate rings, in pixels.
    pub min_ring_spacing_px: usize,
    /// Peak prominence threshold as a multiple of the profile std-dev.
    pub prominence_factor: f32,
}

impl Default for LaplacianConfig {
    fn default() -> Self {
        Self {
            n_rays: 360,
            min_ring_spacing_px: 3,
            prominence_factor: 0.25,
        }
    }
}

pub(crate) fn detect(
    inputs: &DetectorInputs,
    config: &LaplacianConfig,
) -> Result<MethodResult, String> {
    let lap = imageproc::filter::laplacian_filter(&inputs.image);
    let mut resp: Vec<f32> = lap.iter().map(|&v| (v as f32).abs()).collect();

    let max = resp.iter().cloned().fold(0.0f32, f32::max);
    if max <= 0.0 {
        // Perfectly flat input; nothing to detect, but not a failure.
        return Ok(MethodResult::empty(Method::Laplacian));
    }
    for v in resp.iter_mut() {
        *v = *v / max * 255.0;
    }

    let profile =
        response_radial_profile(&resp, inputs.image.dimensions(), inputs.center, config.n_rays);
    if profile.len() < 5 {
        return Err("radial extent too small for Laplacian profiling".to_string());
    }

    let radii = finalize_radii(
        response_peak_radii(&profile, config.min_ring_spacing_px, config.prominence_factor),
        (profile.len() - 1) as f32,
    );
    let confidence = (radii.len() as f32 / 15.0).min(1.0) * 0.75;
    Ok(MethodResult {
        method: Method::Laplacian,
        radii,
        confidence,
    })
}
