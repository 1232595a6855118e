//! otolith — pure-Rust age-estimation engine for otolith images.
//!
//! Infers a fish's age from a photograph of its otolith by detecting growth
//! rings with several independent classical image-processing techniques and
//! fusing their results into one estimate with an agreement-based confidence
//! score. The pipeline stages are:
//!
//! 1. **Preprocess** – tiled local contrast enhancement, edge-preserving
//!    bilateral smoothing.
//! 2. **Segment** – adaptive + Otsu thresholding, morphological cleanup,
//!    largest-connected-region selection (full-frame fallback on failure).
//! 3. **Center** – nucleus location via first-order image moments.
//! 4. **Profile** – radial intensity profiles cast from the nucleus,
//!    averaged into one mean profile.
//! 5. **Detect** – six independent ring detectors (radial-profile peaks,
//!    edge density, Laplacian response, multi-scale blob, Gabor texture,
//!    gradient magnitude), run concurrently.
//! 6. **Ensemble** – confidence-weighted fusion with agreement scoring.
//! 7. **Growth** – inter-ring increment trend and anomaly analysis.
//! 8. **Size** – von Bertalanffy length and allometric weight estimates.
//! 9. **Visualize** – optional annotated overlay for human review.
//!
//! # Public API
//! The stable surface is intentionally small:
//! - [`AgeEstimator`] and [`AnalysisOptions`] as primary entry points
//! - [`EstimatorConfig`] for advanced tuning
//! - the [`AnalysisReport`] result tree
//!
//! Low-level filtering and peak-finding internals are not part of the
//! public surface.

mod detect;
mod ensemble;
mod estimator;
mod growth;
mod preprocess;
mod profile;
mod segment;
mod shape;
mod size;
#[cfg(test)]
pub(crate) mod test_utils;
mod visualize;

pub use detect::{
    BlobLogConfig, DetectConfig, EdgeDensityConfig, GaborConfig, GradientMagConfig,
    LaplacianConfig, Method, MethodResult, ProfilePeaksConfig,
};
pub use ensemble::{AgeEstimate, AgeRange, ConfidenceLevel, EnsembleConfig};
pub use estimator::{AgeEstimator, AnalysisOptions, EstimatorConfig, MethodSelection};
pub use growth::{
    AnomalyKind, GrowthAnalysis, GrowthAnomaly, GrowthConfig, GrowthStatus, GrowthTrend,
};
pub use preprocess::PreprocessConfig;
pub use profile::RadialProfileConfig;
pub use segment::SegmentConfig;
pub use shape::Morphometrics;
pub use size::{AllometricParams, SizeConfig, SizeEstimate, VonBertalanffyParams};

/// Fatal analysis errors.
///
/// Everything else the pipeline can encounter (segmentation failure, short
/// radial profiles, detectors producing no usable signal) degrades to
/// explicit low-confidence markers inside [`AnalysisReport`] instead of
/// failing the request.
#[derive(Debug, thiserror::Error)]
pub enum EstimateError {
    /// The input grid has a zero dimension and cannot be analyzed.
    #[error("input image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// Full analysis result for a single otolith image.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisReport {
    /// Image dimensions [width, height].
    pub image_size: [u32; 2],
    /// Fused age estimate with per-method breakdown.
    pub age: AgeEstimate,
    /// Growth-increment analysis from the highest-confidence method's rings.
    pub growth: GrowthAnalysis,
    /// Expected body length/weight for the estimated age.
    pub size: SizeEstimate,
    /// Shape measurements of the segmented otolith region.
    pub morphometrics: Morphometrics,
    /// True when segmentation found no foreground region and the analysis
    /// ran against the full frame. Results should be treated as degraded.
    pub segmentation_fallback: bool,
    /// PNG-encoded overlay of the detected rings and center, when requested
    /// and rendering succeeded. Absence never indicates analysis failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization_png: Option<Vec<u8>>,
}
