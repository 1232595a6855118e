//! Radial-profile peak detector.
//!
//! Rings show up as periodic oscillation of the mean radial profile. The
//! profile is Savitzky-Golay smoothed, then both local maxima and local
//! minima are extracted; whichever set is more regularly spaced (lower
//! spacing coefficient of variation) is taken as the ring set. Regular
//! spacing is also the confidence signal: annuli are approximately evenly
//! spaced, noise is not.

use super::peaks::{
    self, find_peaks, find_valleys, savgol_smooth, spacing_cv, PeakParams, INVALID_SPACING_CV,
};
use super::{finalize_radii, DetectorInputs, Method, MethodResult};

/// Configuration for the radial-profile peak detector.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ProfilePeaksConfig {
    /// Savitzky-Golay smoothing window (samples, odd).
    pub savgol_window: usize,
    /// Savitzky-Golay polynomial order.
    pub savgol_order: usize,
    /// Minimum spacing between candidate rings, in pixels.
    pub min_ring_spacing_px: usize,
    /// Peak prominence threshold as a multiple of the profile std-dev.
    pub prominence_factor: f32,
    /// Ring count at which the count term of the confidence saturates.
    pub saturation_ring_count: usize,
}

impl Default for ProfilePeaksConfig {
    fn default() -> Self {
        Self {
            savgol_window: 9,
            savgol_order: 3,
            min_ring_spacing_px: 5,
            prominence_factor: 0.25,
            saturation_ring_count: 20,
        }
    }
}

pub(crate) fn detect(
    inputs: &DetectorInputs,
    config: &ProfilePeaksConfig,
) -> Result<MethodResult, String> {
    let mean = &inputs.profile.mean;
    if !inputs.profile.is_usable() {
        return Err(format!("radial profile too short ({} samples)", mean.len()));
    }

    let smoothed = savgol_smooth(mean, config.savgol_window, config.savgol_order);
    let params = PeakParams {
        min_distance: config.min_ring_spacing_px.max(1),
        min_prominence: config.prominence_factor * peaks::std_dev(&smoothed),
    };

    let to_radii = |indices: Vec<usize>| -> Vec<f32> {
        indices
            .into_iter()
            .filter(|&i| i >= 3)
            .map(|i| i as f32)
            .collect()
    };
    let peak_radii = to_radii(find_peaks(&smoothed, &params));
    let valley_radii = to_radii(find_valleys(&smoothed, &params));

    let cv_peaks = spacing_cv(&peak_radii);
    let cv_valleys = spacing_cv(&valley_radii);
    if cv_peaks >= INVALID_SPACING_CV && cv_valleys >= INVALID_SPACING_CV {
        // Neither set has a valid spacing; report no rings rather than guess.
        return Ok(MethodResult::empty(Method::ProfilePeaks));
    }

    let (radii, cv) = if cv_valleys < cv_peaks {
        (valley_radii, cv_valleys)
    } else {
        (peak_radii, cv_peaks)
    };
    let radii = finalize_radii(radii, inputs.profile.max_radius);

    // Irregular spacing (CV above 1) is allowed to drag the score to zero.
    let count_term = (radii.len() as f32 / config.saturation_ring_count.max(1) as f32).min(1.0);
    let confidence = (0.6 * (1.0 - cv) + 0.4 * count_term).clamp(0.0, 1.0);

    Ok(MethodResult {
        method: Method::ProfilePeaks,
        radii,
        confidence,
    })
}
