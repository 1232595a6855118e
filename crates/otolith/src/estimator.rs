//! High-level analysis API.
//!
//! [`AgeEstimator`] is the primary entry point: it wraps an
//! [`EstimatorConfig`] and runs the full pipeline on decoded grayscale
//! images. Create once, analyze many images; configuration is immutable
//! during a run, so one estimator can serve concurrent requests.

use std::sync::Arc;
use std::time::Duration;

use image::GrayImage;

use crate::detect::{run_detectors, DetectConfig, DetectorInputs, Method};
use crate::ensemble::{aggregate, EnsembleConfig};
use crate::growth::{analyze_growth, GrowthConfig};
use crate::preprocess::{preprocess, PreprocessConfig};
use crate::profile::{radial_profile, RadialProfileConfig};
use crate::segment::{segment, SegmentConfig};
use crate::shape::{centroid, morphometrics};
use crate::size::{estimate_size, SizeConfig};
use crate::visualize::{encode_png, render_overlay};
use crate::{AnalysisReport, EstimateError};

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub preprocess: PreprocessConfig,
    pub segment: SegmentConfig,
    pub profile: RadialProfileConfig,
    pub detect: DetectConfig,
    pub ensemble: EnsembleConfig,
    pub growth: GrowthConfig,
    pub size: SizeConfig,
    /// Per-run detector deadline. `None` waits for all detectors; with a
    /// deadline set, late detectors degrade to zero-confidence results.
    #[serde(skip)]
    pub detector_timeout: Option<Duration>,
}

/// Which detectors participate in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodSelection {
    /// All six detectors, fused.
    #[default]
    Ensemble,
    /// A single detector (its result is still reported through the same
    /// aggregation path).
    Single(Method),
}

/// Per-request options supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub method: MethodSelection,
    /// Calibration override; falls back to the configured default.
    pub mm_per_pixel: Option<f32>,
    /// Free-text scientific name for growth-parameter lookup.
    pub species: Option<String>,
    /// Render and attach the ring overlay.
    pub render_overlay: bool,
}

/// Primary analysis interface.
pub struct AgeEstimator {
    config: EstimatorConfig,
}

impl Default for AgeEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl AgeEstimator {
    /// Create an estimator with default configuration.
    pub fn new() -> Self {
        Self {
            config: EstimatorConfig::default(),
        }
    }

    /// Create with full config control.
    pub fn with_config(config: EstimatorConfig) -> Self {
        Self { config }
    }

    /// Access the current configuration.
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut EstimatorConfig {
        &mut self.config
    }

    /// Analyze an otolith image with default options (full ensemble).
    pub fn analyze(&self, image: &GrayImage) -> Result<AnalysisReport, EstimateError> {
        self.analyze_with(image, &AnalysisOptions::default())
    }

    /// Analyze an otolith image.
    ///
    /// The only fatal condition is an empty input grid. Every degradation
    /// past that point (segmentation fallback, failed detectors, too few
    /// rings) surfaces as explicit markers inside the report.
    pub fn analyze_with(
        &self,
        image: &GrayImage,
        options: &AnalysisOptions,
    ) -> Result<AnalysisReport, EstimateError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(EstimateError::EmptyImage { width, height });
        }
        tracing::info!("analyzing {}x{} otolith image", width, height);

        let preprocessed = preprocess(image, &self.config.preprocess);
        let segmentation = segment(&preprocessed, &self.config.segment);
        let morphometrics = morphometrics(&segmentation.mask);
        let center = centroid(&segmentation.mask);
        let profile = radial_profile(&preprocessed, center, &self.config.profile);

        let methods: Vec<Method> = match options.method {
            MethodSelection::Ensemble => Method::ALL.to_vec(),
            MethodSelection::Single(method) => vec![method],
        };

        let inputs = Arc::new(DetectorInputs {
            image: preprocessed,
            mask: segmentation.mask,
            center,
            profile,
        });
        let detect_config = Arc::new(self.config.detect.clone());
        let results = run_detectors(
            &inputs,
            &detect_config,
            &methods,
            self.config.detector_timeout,
        );

        // Growth works off the most trusted single ring set; the fused age
        // is a weighted count, not a ring sequence.
        let best = results
            .iter()
            .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap())
            .cloned();
        let age = aggregate(results, &self.config.ensemble);
        tracing::info!(
            "estimated age {} ({} confidence {:.2})",
            age.estimated_age,
            age.confidence_level.as_str(),
            age.confidence
        );

        let mut growth_config = self.config.growth.clone();
        if let Some(mm_per_pixel) = options.mm_per_pixel {
            growth_config.mm_per_pixel = mm_per_pixel;
        }
        let growth = analyze_growth(
            best.as_ref().map(|b| b.radii.as_slice()).unwrap_or(&[]),
            &growth_config,
        );

        let size = estimate_size(age.precise_age, options.species.as_deref(), &self.config.size);

        let visualization_png = if options.render_overlay {
            let radii = best.as_ref().map(|b| b.radii.as_slice()).unwrap_or(&[]);
            encode_png(&render_overlay(image, center, radii))
        } else {
            None
        };

        Ok(AnalysisReport {
            image_size: [width, height],
            age,
            growth,
            size,
            morphometrics,
            segmentation_fallback: segmentation.full_frame_fallback,
            visualization_png,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::ConfidenceLevel;
    use crate::growth::GrowthStatus;
    use crate::test_utils::{blur_gray, draw_otolith_image, featureless_disk};

    fn five_ring_image() -> GrayImage {
        let img = draw_otolith_image(
            220,
            220,
            [110, 110],
            60.0,
            &[10.0, 20.0, 30.0, 40.0, 50.0],
            2.5,
        );
        blur_gray(&img, 1.0)
    }

    #[test]
    fn empty_image_is_fatal() {
        let estimator = AgeEstimator::new();
        let err = estimator.analyze(&GrayImage::new(0, 0)).unwrap_err();
        assert!(matches!(err, EstimateError::EmptyImage { .. }));
    }

    #[test]
    fn five_clean_rings_age_within_one() {
        let estimator = AgeEstimator::new();
        let report = estimator.analyze(&five_ring_image()).unwrap();
        let age = report.age.estimated_age as i64;
        assert!(
            (4..=6).contains(&age),
            "estimated age {} for a five-ring otolith (per method: {:?})",
            age,
            report
                .age
                .per_method
                .iter()
                .map(|m| (m.method, m.ring_count(), m.confidence))
                .collect::<Vec<_>>()
        );
        assert!(
            report.age.confidence >= 0.5,
            "confidence {} below 0.5",
            report.age.confidence
        );
        assert!(!report.segmentation_fallback);
        assert_eq!(report.growth.status, GrowthStatus::Ok);
    }

    #[test]
    fn featureless_disk_reports_zero_age_very_low() {
        let img = blur_gray(&featureless_disk(200, 200, [100, 100], 70.0, 15, 190), 1.0);
        let estimator = AgeEstimator::new();
        let report = estimator.analyze(&img).unwrap();
        assert_eq!(
            report.age.estimated_age, 0,
            "per method: {:?}",
            report
                .age
                .per_method
                .iter()
                .map(|m| (m.method, m.ring_count(), m.confidence))
                .collect::<Vec<_>>()
        );
        assert_eq!(report.age.confidence_level, ConfidenceLevel::VeryLow);
    }

    #[test]
    fn repeat_runs_are_identical() {
        let estimator = AgeEstimator::new();
        let image = five_ring_image();
        let options = AnalysisOptions {
            render_overlay: true,
            ..AnalysisOptions::default()
        };
        let a = estimator.analyze_with(&image, &options).unwrap();
        let b = estimator.analyze_with(&image, &options).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn single_method_selection_reports_one_method() {
        let estimator = AgeEstimator::new();
        let options = AnalysisOptions {
            method: MethodSelection::Single(Method::GradientMagnitude),
            ..AnalysisOptions::default()
        };
        let report = estimator.analyze_with(&five_ring_image(), &options).unwrap();
        assert_eq!(report.age.per_method.len(), 1);
        assert_eq!(report.age.per_method[0].method, Method::GradientMagnitude);
    }

    #[test]
    fn overlay_is_attached_only_on_request() {
        let estimator = AgeEstimator::new();
        let image = five_ring_image();
        let without = estimator.analyze(&image).unwrap();
        assert!(without.visualization_png.is_none());

        let with = estimator
            .analyze_with(
                &image,
                &AnalysisOptions {
                    render_overlay: true,
                    ..AnalysisOptions::default()
                },
            )
            .unwrap();
        assert!(with.visualization_png.is_some());
    }

    #[test]
    fn calibration_override_scales_growth() {
        let estimator = AgeEstimator::new();
        let image = five_ring_image();
        let base = estimator
            .analyze_with(
                &image,
                &AnalysisOptions {
                    mm_per_pixel: Some(0.1),
                    ..AnalysisOptions::default()
                },
            )
            .unwrap();
        let doubled = estimator
            .analyze_with(
                &image,
                &AnalysisOptions {
                    mm_per_pixel: Some(0.2),
                    ..AnalysisOptions::default()
                },
            )
            .unwrap();
        if base.growth.status == GrowthStatus::Ok {
            assert!(
                (doubled.growth.total_growth_mm - 2.0 * base.growth.total_growth_mm).abs() < 1e-3
            );
        }
    }

    #[test]
    fn noisy_input_keeps_result_invariants() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(7);
        let mut img = five_ring_image();
        for p in img.pixels_mut() {
            let jitter: i16 = rng.random_range(-18..=18);
            p[0] = (p[0] as i16 + jitter).clamp(0, 255) as u8;
        }
        let report = AgeEstimator::new().analyze(&img).unwrap();
        assert!((0.0..=1.0).contains(&report.age.confidence));
        for method in &report.age.per_method {
            assert!((0.0..=1.0).contains(&method.confidence));
            for pair in method.radii.windows(2) {
                assert!(pair[0] < pair[1], "radii not strictly increasing");
            }
        }
    }

    #[test]
    fn center_stays_in_bounds_for_all_masks() {
        let estimator = AgeEstimator::new();
        for (w, h) in [(40u32, 40u32), (120, 60), (61, 121)] {
            let img = GrayImage::from_pixel(w, h, image::Luma([128]));
            let report = estimator.analyze(&img).unwrap();
            assert_eq!(report.image_size, [w, h]);
        }
    }
}
