//! Growth-increment analysis over detected ring radii.
//!
//! Consecutive ring spacings, scaled by the mm-per-pixel calibration, are
//! the fish's per-period growth increments. A least-squares line over the
//! increments classifies the growth trend (slowing growth with age is the
//! biological norm) and z-scores flag single anomalous periods.

/// Configuration for growth analysis.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Image calibration in millimetres per pixel.
    pub mm_per_pixel: f32,
    /// Absolute slope (mm per period) below which the trend is "stable".
    pub trend_slope_threshold: f32,
    /// |z| threshold for flagging an increment as anomalous.
    pub anomaly_z_threshold: f32,
    /// Minimum increments required to classify a trend.
    pub min_increments_for_trend: usize,
    /// Minimum increments required to attempt anomaly detection.
    pub min_increments_for_anomalies: usize,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            mm_per_pixel: 0.05,
            trend_slope_threshold: 0.1,
            anomaly_z_threshold: 2.0,
            min_increments_for_trend: 3,
            min_increments_for_anomalies: 5,
        }
    }
}

/// Whether enough rings were available for increment analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStatus {
    Ok,
    /// Fewer than two rings; increments cannot be computed.
    InsufficientRings,
}

/// Direction of the growth-increment trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthTrend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

/// Kind of a flagged growth anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    SlowGrowth,
    FastGrowth,
}

/// One anomalous growth period.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GrowthAnomaly {
    /// Increment index (0 = growth between the first two rings).
    pub index: usize,
    pub increment_mm: f32,
    pub z_score: f32,
    pub kind: AnomalyKind,
}

/// Growth record derived from one method's ring radii.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GrowthAnalysis {
    pub status: GrowthStatus,
    pub ring_count: usize,
    pub total_growth_mm: f32,
    pub mean_increment_mm: f32,
    pub std_increment_mm: f32,
    pub increments_mm: Vec<f32>,
    pub trend: GrowthTrend,
    pub anomalies: Vec<GrowthAnomaly>,
}

impl GrowthAnalysis {
    fn insufficient(ring_count: usize) -> Self {
        Self {
            status: GrowthStatus::InsufficientRings,
            ring_count,
            total_growth_mm: 0.0,
            mean_increment_mm: 0.0,
            std_increment_mm: 0.0,
            increments_mm: Vec::new(),
            trend: GrowthTrend::InsufficientData,
            anomalies: Vec::new(),
        }
    }
}

/// Analyze inter-ring growth increments.
///
/// `radii` must be sorted ascending (the detector invariant). Fewer than
/// two radii reports `InsufficientRings` rather than failing.
pub fn analyze_growth(radii: &[f32], config: &GrowthConfig) -> GrowthAnalysis {
    if radii.len() < 2 {
        return GrowthAnalysis::insufficient(radii.len());
    }

    let increments: Vec<f32> = radii
        .windows(2)
        .map(|w| (w[1] - w[0]) * config.mm_per_pixel)
        .collect();
    let mean = increments.iter().sum::<f32>() / increments.len() as f32;
    let std = (increments.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>()
        / increments.len() as f32)
        .sqrt();

    let trend = if increments.len() < config.min_increments_for_trend {
        GrowthTrend::InsufficientData
    } else {
        let slope = trend_slope(&increments);
        if slope < -config.trend_slope_threshold {
            GrowthTrend::Decreasing
        } else if slope > config.trend_slope_threshold {
            GrowthTrend::Increasing
        } else {
            GrowthTrend::Stable
        }
    };

    // A single outlier among five increments lands exactly on |z| = 2, and
    // rounding must not push such cases under the threshold.
    const Z_TOLERANCE: f32 = 1e-3;
    let mut anomalies = Vec::new();
    if increments.len() >= config.min_increments_for_anomalies && std > f32::EPSILON {
        for (index, &increment_mm) in increments.iter().enumerate() {
            let z_score = (increment_mm - mean) / std;
            if z_score.abs() + Z_TOLERANCE > config.anomaly_z_threshold {
                anomalies.push(GrowthAnomaly {
                    index,
                    increment_mm,
                    z_score,
                    kind: if z_score < 0.0 {
                        AnomalyKind::SlowGrowth
                    } else {
                        AnomalyKind::FastGrowth
                    },
                });
            }
        }
    }

    GrowthAnalysis {
        status: GrowthStatus::Ok,
        ring_count: radii.len(),
        total_growth_mm: increments.iter().sum(),
        mean_increment_mm: mean,
        std_increment_mm: std,
        increments_mm: increments,
        trend,
        anomalies,
    }
}

/// Least-squares slope of increments against their index.
fn trend_slope(increments: &[f32]) -> f32 {
    let n = increments.len() as f32;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = increments.iter().sum::<f32>() / n;
    let mut num = 0.0f32;
    let mut den = 0.0f32;
    for (i, &y) in increments.iter().enumerate() {
        let dx = i as f32 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    if den <= f32::EPSILON {
        0.0
    } else {
        num / den
    }
}
