//! Ring detection strategies and their concurrent execution harness.
//!
//! Six independent detectors share one contract: read the immutable input
//! bundle, return candidate ring radii plus a self-reported confidence.
//! Internal failures never cross a detector's boundary; the harness
//! converts errors, panics and timeouts into the zero-confidence result
//! for that method so no single strategy can abort the pipeline.

mod blob_log;
mod edge_density;
mod gabor;
mod gradient_mag;
mod laplacian;
pub(crate) mod peaks;
mod profile_peaks;

pub use blob_log::BlobLogConfig;
pub use edge_density::EdgeDensityConfig;
pub use gabor::GaborConfig;
pub use gradient_mag::GradientMagConfig;
pub use laplacian::LaplacianConfig;
pub use profile_peaks::ProfilePeaksConfig;

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use image::GrayImage;

use crate::profile::RadialProfile;

/// Ring detection strategy identifiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Peaks/valleys of the smoothed mean radial intensity profile.
    ProfilePeaks,
    /// Per-radius Canny edge density.
    EdgeDensity,
    /// Radially averaged Laplacian response.
    Laplacian,
    /// Multi-scale Laplacian-of-Gaussian blob response.
    MultiScaleBlob,
    /// Oriented Gabor filter bank response.
    GaborTexture,
    /// Radially averaged Sobel gradient magnitude.
    GradientMagnitude,
}

impl Method {
    /// All methods in their fixed reporting order.
    pub const ALL: [Method; 6] = [
        Method::ProfilePeaks,
        Method::EdgeDensity,
        Method::Laplacian,
        Method::MultiScaleBlob,
        Method::GaborTexture,
        Method::GradientMagnitude,
    ];

    /// Stable identifier used in reports and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Method::ProfilePeaks => "profile_peaks",
            Method::EdgeDensity => "edge_density",
            Method::Laplacian => "laplacian",
            Method::MultiScaleBlob => "multi_scale_blob",
            Method::GaborTexture => "gabor_texture",
            Method::GradientMagnitude => "gradient_magnitude",
        }
    }
}

/// One detector's candidate rings and self-reported confidence.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MethodResult {
    pub method: Method,
    /// Ring radii in pixels, strictly increasing.
    pub radii: Vec<f32>,
    /// Self-reported confidence in [0, 1]; 0 when no usable signal.
    pub confidence: f32,
}

impl MethodResult {
    /// The zero-confidence result a failed or timed-out detector degrades to.
    pub fn empty(method: Method) -> Self {
        Self {
            method,
            radii: Vec::new(),
            confidence: 0.0,
        }
    }

    /// Ring count, i.e. the age this method votes for.
    pub fn ring_count(&self) -> usize {
        self.radii.len()
    }
}

/// Per-detector configuration, aggregated for the harness.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    pub profile_peaks: ProfilePeaksConfig,
    pub edge_density: EdgeDensityConfig,
    pub laplacian: LaplacianConfig,
    pub blob_log: BlobLogConfig,
    pub gabor: GaborConfig,
    pub gradient_mag: GradientMagConfig,
}

/// Immutable inputs shared by all detectors of one request.
#[derive(Debug)]
pub(crate) struct DetectorInputs {
    /// Preprocessed intensity grid.
    pub image: GrayImage,
    /// Binary otolith mask, same dimensions.
    pub mask: GrayImage,
    /// Nucleus pixel position.
    pub center: [u32; 2],
    /// Radial profiles from the nucleus.
    pub profile: RadialProfile,
}

fn dispatch(
    method: Method,
    inputs: &DetectorInputs,
    config: &DetectConfig,
) -> Result<MethodResult, String> {
    match method {
        Method::ProfilePeaks => profile_peaks::detect(inputs, &config.profile_peaks),
        Method::EdgeDensity => edge_density::detect(inputs, &config.edge_density),
        Method::Laplacian => laplacian::detect(inputs, &config.laplacian),
        Method::MultiScaleBlob => blob_log::detect(inputs, &config.blob_log),
        Method::GaborTexture => gabor::detect(inputs, &config.gabor),
        Method::GradientMagnitude => gradient_mag::detect(inputs, &config.gradient_mag),
    }
}

/// Run the requested detectors on worker threads and join their results.
///
/// Results come back in the order of `methods` regardless of completion
/// order. A detector that errors, panics, or misses the deadline
/// contributes the zero-confidence result for its method; the join never
/// blocks past `timeout` once it is set.
pub(crate) fn run_detectors(
    inputs: &Arc<DetectorInputs>,
    config: &Arc<DetectConfig>,
    methods: &[Method],
    timeout: Option<Duration>,
) -> Vec<MethodResult> {
    let (tx, rx) = mpsc::channel::<MethodResult>();

    for &method in methods {
        let tx = tx.clone();
        let inputs = Arc::clone(inputs);
        let config = Arc::clone(config);
        let spawned = thread::Builder::new()
            .name(format!("ring-{}", method.name()))
            .spawn(move || {
                let result = match dispatch(method, &inputs, &config) {
                    Ok(r) => r,
                    Err(reason) => {
                        tracing::debug!("{}: no usable signal ({})", method.name(), reason);
                        MethodResult::empty(method)
                    }
                };
                let _ = tx.send(result);
            });
        if let Err(e) = spawned {
            tracing::warn!("failed to spawn {} worker: {}", method.name(), e);
        }
    }
    drop(tx);

    let deadline = timeout.map(|t| Instant::now() + t);
    let mut slots: Vec<Option<MethodResult>> = vec![None; methods.len()];
    let mut remaining = methods.len();
    while remaining > 0 {
        let received = match deadline {
            None => rx.recv().ok(),
            Some(d) => {
                let now = Instant::now();
                if now >= d {
                    None
                } else {
                    rx.recv_timeout(d - now).ok()
                }
            }
        };
        let Some(result) = received else { break };
        if let Some(pos) = methods.iter().position(|&m| m == result.method) {
            if slots[pos].is_none() {
                slots[pos] = Some(result);
                remaining -= 1;
            }
        }
    }

    methods
        .iter()
        .zip(slots)
        .map(|(&method, slot)| {
            slot.unwrap_or_else(|| {
                tracing::warn!(
                    "{} returned no result (deadline or worker failure), degrading to zero confidence",
                    method.name()
                );
                MethodResult::empty(method)
            })
        })
        .collect()
}

/// Enforce the strictly-increasing ring radii invariant.
///
/// Radii are clamped to `[0, max_radius]`, sorted, and near-duplicates
/// (within half a pixel) merged.
pub(crate) fn finalize_radii(mut radii: Vec<f32>, max_radius: f32) -> Vec<f32> {
    radii.retain(|r| r.is_finite() && *r >= 0.0 && *r <= max_radius);
    radii.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mut out: Vec<f32> = Vec::with_capacity(radii.len());
    for r in radii {
        match out.last() {
            Some(last) if r - last <= 0.5 => {}
            _ => out.push(r),
        }
    }
    out
}

/// Radially average a per-pixel response grid around `center`.
///
/// Rays are cast at `n_rays` angles with nearest-neighbor sampling; the
/// result is the mean response per integer radius.
pub(crate) fn response_radial_profile(
    resp: &[f32],
    dims: (u32, u32),
    center: [u32; 2],
    n_rays: usize,
) -> Vec<f32> {
    let (w, h) = dims;
    let max_r = crate::profile::max_sample_radius(dims, center, 2.0).floor() as usize;
    if max_r < 3 || n_rays == 0 || resp.len() != (w as usize) * (h as usize) {
        return Vec::new();
    }

    let stride = w as usize;
    let (cx, cy) = (center[0] as f32, center[1] as f32);
    let mut sum = vec![0.0f32; max_r + 1];
    let mut cnt = vec![0u32; max_r + 1];
    for i in 0..n_rays {
        let theta = 2.0 * std::f32::consts::PI * i as f32 / n_rays as f32;
        let (st, ct) = theta.sin_cos();
        for (r, (s, c)) in sum.iter_mut().zip(cnt.iter_mut()).enumerate() {
            let x = (cx + ct * r as f32).round();
            let y = (cy + st * r as f32).round();
            if x < 0.0 || y < 0.0 || x >= w as f32 || y >= h as f32 {
                break;
            }
            *s += resp[y as usize * stride + x as usize];
            *c += 1;
        }
    }
    sum.iter()
        .zip(&cnt)
        .map(|(s, &c)| if c > 0 { s / c as f32 } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::RadialProfileConfig;

    fn dummy_inputs(w: u32, h: u32) -> Arc<DetectorInputs> {
        let image = GrayImage::from_pixel(w, h, image::Luma([100]));
        let mask = GrayImage::from_pixel(w, h, image::Luma([255]));
        let center = [w / 2, h / 2];
        let profile = crate::profile::radial_profile(&image, center, &RadialProfileConfig::default());
        Arc::new(DetectorInputs {
            image,
            mask,
            center,
            profile,
        })
    }

    #[test]
    fn finalize_radii_sorts_and_dedups() {
        let out = finalize_radii(vec![30.0, 10.0, 10.2, 20.0, f32::NAN, -3.0, 900.0], 100.0);
        assert_eq!(out, vec![10.0, 20.0, 30.0]);
        for pair in out.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn all_results_come_back_in_method_order() {
        let inputs = dummy_inputs(64, 64);
        let config = Arc::new(DetectConfig::default());
        let results = run_detectors(&inputs, &config, &Method::ALL, None);
        assert_eq!(results.len(), Method::ALL.len());
        for (result, method) in results.iter().zip(Method::ALL) {
            assert_eq!(result.method, method);
            assert!((0.0..=1.0).contains(&result.confidence));
        }
    }

    #[test]
    fn zero_timeout_degrades_to_empty_results() {
        let inputs = dummy_inputs(64, 64);
        let config = Arc::new(DetectConfig::default());
        let results = run_detectors(&inputs, &config, &Method::ALL, Some(Duration::ZERO));
        assert!(results.iter().all(|r| r.confidence == 0.0));
    }

    #[test]
    fn response_profile_of_uniform_grid_is_flat() {
        let resp = vec![2.5f32; 64 * 64];
        let prof = response_radial_profile(&resp, (64, 64), [32, 32], 90);
        assert!(!prof.is_empty());
        assert!(prof.iter().all(|&v| (v - 2.5).abs() < 1e-4));
    }
}
