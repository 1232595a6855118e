//! Ensemble fusion of per-method ring detections.
//!
//! Each method votes with its ring count, weighted by a configured trust
//! and its own self-reported confidence. The fused confidence combines
//! inter-method agreement with the mean per-method confidence: six
//! methods landing on the same age is strong evidence even when each is
//! individually mediocre.

use crate::detect::{Method, MethodResult};

/// Configuration for ensemble aggregation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Trust weight of the radial-profile method.
    pub profile_weight: f32,
    /// Trust weight of each remaining method.
    pub default_weight: f32,
    /// Methods below this confidence do not contribute.
    pub min_method_confidence: f32,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            profile_weight: 0.25,
            default_weight: 0.15,
            min_method_confidence: 0.1,
        }
    }
}

impl EnsembleConfig {
    /// Configured trust weight for a method.
    ///
    /// Weighted sums are divided by the total weight used, so the weights
    /// need not sum to exactly one.
    pub fn weight(&self, method: Method) -> f32 {
        match method {
            Method::ProfilePeaks => self.profile_weight,
            _ => self.default_weight,
        }
    }
}

/// Discrete confidence bands for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceLevel {
    /// Map a confidence in [0, 1] to its band.
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence >= 0.8 {
            ConfidenceLevel::High
        } else if confidence >= 0.5 {
            ConfidenceLevel::Medium
        } else if confidence >= 0.3 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::VeryLow
        }
    }

    /// Stable identifier used in reports and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::VeryLow => "very_low",
        }
    }
}

/// Spread of the contributing methods' ages.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct AgeRange {
    pub min: f32,
    pub max: f32,
    pub std: f32,
}

/// Fused age estimate with the per-method breakdown.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AgeEstimate {
    /// Rounded ensemble age in growth periods (commonly years).
    pub estimated_age: u32,
    /// Confidence-weighted fractional age.
    pub precise_age: f32,
    /// Fused confidence in [0, 1].
    pub confidence: f32,
    pub confidence_level: ConfidenceLevel,
    /// Spread of contributing ages; zeroed when nothing contributed.
    pub age_range: AgeRange,
    /// All per-method results in fixed method order.
    pub per_method: Vec<MethodResult>,
}

/// Fuse per-method results into one age estimate.
///
/// Methods contribute when they found at least one ring and cleared the
/// minimum confidence. No contributors is a valid outcome: age 0 with
/// zero confidence, not an error.
pub fn aggregate(results: Vec<MethodResult>, config: &EnsembleConfig) -> AgeEstimate {
    let mut weighted_sum = 0.0f32;
    let mut weight_total = 0.0f32;
    let mut ages: Vec<f32> = Vec::new();
    let mut confidences: Vec<f32> = Vec::new();

    for result in &results {
        let age = result.ring_count() as f32;
        if result.ring_count() == 0 || result.confidence <= config.min_method_confidence {
            continue;
        }
        let weight = config.weight(result.method) * result.confidence;
        weighted_sum += age * weight;
        weight_total += weight;
        ages.push(age);
        confidences.push(result.confidence);
    }

    if weight_total <= 0.0 {
        return AgeEstimate {
            estimated_age: 0,
            precise_age: 0.0,
            confidence: 0.0,
            confidence_level: ConfidenceLevel::VeryLow,
            age_range: AgeRange::default(),
            per_method: results,
        };
    }

    let precise_age = weighted_sum / weight_total;
    let estimated_age = precise_age.round().max(0.0) as u32;

    let mean_age = mean(&ages);
    let std_age = std_dev(&ages);
    let agreement = if ages.len() < 2 || mean_age <= f32::EPSILON {
        1.0
    } else {
        (1.0 - std_age / mean_age).max(0.0)
    };
    let confidence = (0.5 * agreement + 0.5 * mean(&confidences)).clamp(0.0, 1.0);

    let age_range = AgeRange {
        min: ages.iter().cloned().fold(f32::INFINITY, f32::min),
        max: ages.iter().cloned().fold(f32::NEG_INFINITY, f32::max),
        std: std_age,
    };

    AgeEstimate {
        estimated_age,
        precise_age,
        confidence,
        confidence_level: ConfidenceLevel::from_confidence(confidence),
        age_range,
        per_method: results,
    }
}

fn mean(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f32>() / data.len() as f32
}

fn std_dev(data: &[f32]) -> f32 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    (data.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / data.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(method: Method, rings: usize, confidence: f32) -> MethodResult {
        MethodResult {
            method,
            radii: (1..=rings).map(|i| i as f32 * 10.0).collect(),
            confidence,
        }
    }

    #[test]
    fn no_contributors_yields_zero_age_zero_confidence() {
        let results: Vec<MethodResult> = Method::ALL.iter().map(|&m| MethodResult::empty(m)).collect();
        let estimate = aggregate(results, &EnsembleConfig::default());
        assert_eq!(estimate.estimated_age, 0);
        assert_eq!(estimate.confidence, 0.0);
        assert_eq!(estimate.confidence_level, ConfidenceLevel::VeryLow);
        assert_eq!(estimate.per_method.len(), 6);
    }

    #[test]
    fn low_confidence_methods_are_excluded() {
        let results = vec![
            result(Method::ProfilePeaks, 5, 0.7),
            // Below the 0.1 floor: must not drag the age down.
            result(Method::EdgeDensity, 50, 0.05),
        ];
        let estimate = aggregate(results, &EnsembleConfig::default());
        assert_eq!(estimate.estimated_age, 5);
    }

    #[test]
    fn agreement_boosts_identical_votes() {
        let unanimous: Vec<MethodResult> = Method::ALL
            .iter()
            .map(|&m| result(m, 7, 0.6))
            .collect();
        let estimate = aggregate(unanimous, &EnsembleConfig::default());
        assert_eq!(estimate.estimated_age, 7);
        // Perfect agreement: 0.5 * 1.0 + 0.5 * 0.6.
        assert!((estimate.confidence - 0.8).abs() < 1e-5);
        assert_eq!(estimate.age_range.min, 7.0);
        assert_eq!(estimate.age_range.max, 7.0);
        assert!(estimate.age_range.std < 1e-6);
    }

    #[test]
    fn single_contributor_counts_as_full_agreement() {
        let estimate = aggregate(
            vec![result(Method::Laplacian, 4, 0.5)],
            &EnsembleConfig::default(),
        );
        assert_eq!(estimate.estimated_age, 4);
        assert!((estimate.confidence - 0.75).abs() < 1e-5);
    }

    #[test]
    fn weighted_age_follows_trust_and_confidence() {
        let results = vec![
            result(Method::ProfilePeaks, 4, 0.8), // weight 0.25 * 0.8 = 0.2
            result(Method::EdgeDensity, 8, 0.4),  // weight 0.15 * 0.4 = 0.06
        ];
        let estimate = aggregate(results, &EnsembleConfig::default());
        let expected = (4.0 * 0.2 + 8.0 * 0.06) / 0.26;
        assert!((estimate.precise_age - expected).abs() < 1e-5);
        assert_eq!(estimate.estimated_age, expected.round() as u32);
    }

    #[test]
    fn confidence_level_boundaries_are_exact() {
        use ConfidenceLevel::*;
        let cases = [
            (0.8, High),
            (0.79999, Medium),
            (0.5, Medium),
            (0.49999, Low),
            (0.3, Low),
            (0.29999, VeryLow),
            (0.0, VeryLow),
            (1.0, High),
        ];
        for (confidence, expected) in cases {
            assert_eq!(
                ConfidenceLevel::from_confidence(confidence),
                expected,
                "confidence {}",
                confidence
            );
        }
    }
}
