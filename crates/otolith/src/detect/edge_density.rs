//! Edge-density ring detector.
//!
//! A Canny edge map turns annulus boundaries into thin circular arcs. For
//! each sampled radius the fraction of the circle lying on edge pixels is
//! measured; radii where that fraction peaks are ring candidates.

use imageproc::edges::canny;

use super::peaks::{self, find_peaks, smooth_3, PeakParams};
use super::{finalize_radii, DetectorInputs, Method, MethodResult};
use crate::profile::max_sample_radius;

/// Configuration for the edge-density detector.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EdgeDensityConfig {
    /// Canny low hysteresis threshold.
    pub canny_low: f32,
    /// Canny high hysteresis threshold.
    pub canny_high: f32,
    /// Radial step between sampled circles, in pixels.
    pub radial_step: usize,
    /// Minimum spacing between candidate rings, in pixels.
    pub min_ring_spacing_px: usize,
    /// Peak prominence threshold as a multiple of the curve std-dev.
    pub prominence_factor: f32,
    /// Smallest radius considered for ring candidates.
    pub min_radius_px: usize,
}

impl Default for EdgeDensityConfig {
    fn default() -> Self {
        Self {
            canny_low: 20.0,
            canny_high: 60.0,
            radial_step: 2,
            min_ring_spacing_px: 3,
            prominence_factor: 0.25,
            min_radius_px: 3,
        }
    }
}

pub(crate) fn detect(
    inputs: &DetectorInputs,
    config: &EdgeDensityConfig,
) -> Result<MethodResult, String> {
    let step = config.radial_step.max(1);
    let max_r = max_sample_radius(inputs.image.dimensions(), inputs.center, 2.0).floor() as usize;
    if max_r < config.min_radius_px + 2 * step {
        return Err(format!("usable radius {} px is too small", max_r));
    }

    let edges = canny(&inputs.image, config.canny_low, config.canny_high);
    let (w, h) = edges.dimensions();
    let (cx, cy) = (inputs.center[0] as f32, inputs.center[1] as f32);

    // Fraction of each ray-circle that lands on an edge pixel, restricted
    // to the otolith mask.
    let radii_px: Vec<usize> = (config.min_radius_px..=max_r).step_by(step).collect();
    let mut fractions = Vec::with_capacity(radii_px.len());
    for &r in &radii_px {
        let n_samples = ((2.0 * std::f32::consts::PI * r as f32).ceil() as usize).clamp(36, 360);
        let mut valid = 0u32;
        let mut hits = 0u32;
        for i in 0..n_samples {
            let theta = 2.0 * std::f32::consts::PI * i as f32 / n_samples as f32;
            let x = (cx + theta.cos() * r as f32).round();
            let y = (cy + theta.sin() * r as f32).round();
            if x < 0.0 || y < 0.0 || x >= w as f32 || y >= h as f32 {
                continue;
            }
            let (xi, yi) = (x as u32, y as u32);
            if inputs.mask.get_pixel(xi, yi)[0] == 0 {
                continue;
            }
            valid += 1;
            if edges.get_pixel(xi, yi)[0] > 0 {
                hits += 1;
            }
        }
        fractions.push(if valid > 0 {
            hits as f32 / valid as f32
        } else {
            0.0
        });
    }

    let smoothed = smooth_3(&fractions);
    let params = PeakParams {
        min_distance: config.min_ring_spacing_px.div_ceil(step).max(1),
        min_prominence: config.prominence_factor * peaks::std_dev(&smoothed),
    };
    let radii: Vec<f32> = find_peaks(&smoothed, &params)
        .into_iter()
        .map(|i| radii_px[i] as f32)
        .collect();
    let radii = finalize_radii(radii, max_r as f32);

    let confidence = (radii.len() as f32 / 15.0).min(1.0) * 0.8;
    Ok(MethodResult {
        method: Method::EdgeDensity,
        radii,
        confidence,
    })
}
