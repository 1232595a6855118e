//! Gradient-magnitude ring detector.
//!
//! The simplest of the response-profile methods: Sobel gradient magnitude
//! peaks at every intensity transition, and annuli are exactly radial
//! intensity transitions. Radially averaging the magnitude and extracting
//! peaks gives a cheap, robust baseline for the ensemble.

use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use super::peaks::response_peak_radii;
use super::{finalize_radii, response_radial_profile, DetectorInputs, Method, MethodResult};

/// Configuration for the gradient-magnitude detector.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GradientMagConfig {
    /// Rays used for radial averaging of the response.
    pub n_rays: usize,
    /// Minimum spacing between candidate rings, in pixels.
    pub min_ring_spacing_px: usize,
    /// Peak prominence threshold as a multiple of the profile std-dev.
    pub prominence_factor: f32,
}

impl Default for GradientMagConfig {
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
    config: &GradientMagConfig,
) -> Result<MethodResult, String> {
    let gx = horizontal_sobel(&inputs.image);
    let gy = vertical_sobel(&inputs.image);

    let resp: Vec<f32> = gx
        .iter()
        .zip(gy.iter())
        .map(|(&x, &y)| {
            let (x, y) = (x as f32, y as f32);
            (x * x + y * y).sqrt()
        })
        .collect();

    let profile =
        response_radial_profile(&resp, inputs.image.dimensions(), inputs.center, config.n_rays);
    if profile.len() < 5 {
        return Err("radial extent too small for gradient profiling".to_string());
    }

    let radii = finalize_radii(
        response_peak_radii(&profile, config.min_ring_spacing_px, config.prominence_factor),
        (profile.len() - 1) as f32,
    );
    let confidence = (radii.len() as f32 / 15.0).min(1.0) * 0.75;
    Ok(MethodResult {
        method: Method::GradientMagnitude,
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
    fn ring_transitions_peak_in_gradient() {
        let img = draw_otolith_image(180, 180, [90, 90], 70.0, &[17.0, 34.0, 51.0], 2.5);
        let inputs = inputs_for(blur_gray(&img, 0.8), [90, 90]);
        let result = detect(&inputs, &GradientMagConfig::default()).unwrap();
        assert!(!result.radii.is_empty());
        assert!(result.confidence > 0.0 && result.confidence <= 0.75);
        for pair in result.radii.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn flat_image_has_no_gradient_rings() {
        let img = GrayImage::from_pixel(120, 120, image::Luma([77]));
        let inputs = inputs_for(img, [60, 60]);
        let result = detect(&inputs, &GradientMagConfig::default()).unwrap();
        assert!(result.radii.is_empty());
        assert_eq!(result.confidence, 0.0);
    }
}
