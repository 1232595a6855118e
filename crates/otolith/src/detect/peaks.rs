//! Shared profile smoothing and peak extraction helpers.
//!
//! All ring candidates come out of 1-D radial profiles, so every detector
//! funnels through the same peak finder: local maxima gated by a minimum
//! spacing (rings cannot be arbitrarily close) and a prominence threshold
//! scaled to the profile's own standard deviation (noise must not read as
//! rings).

/// Sentinel for "no valid ring spacing" in coefficient-of-variation terms.
pub(crate) const INVALID_SPACING_CV: f32 = 999.0;

pub(crate) fn mean(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f32>() / data.len() as f32
}

pub(crate) fn std_dev(data: &[f32]) -> f32 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    (data.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / data.len() as f32).sqrt()
}

/// Coefficient of variation of consecutive ring spacings.
///
/// Fewer than two radii (no spacing at all) or a degenerate mean spacing
/// yields [`INVALID_SPACING_CV`].
pub(crate) fn spacing_cv(radii: &[f32]) -> f32 {
    if radii.len() < 2 {
        return INVALID_SPACING_CV;
    }
    let diffs: Vec<f32> = radii.windows(2).map(|w| w[1] - w[0]).collect();
    let m = mean(&diffs);
    if m <= f32::EPSILON {
        return INVALID_SPACING_CV;
    }
    std_dev(&diffs) / m
}

/// 3-point moving-average smoothing; boundary samples are kept as-is.
///
/// No-op for curves with fewer than 5 samples.
pub(crate) fn smooth_3(data: &[f32]) -> Vec<f32> {
    let n = data.len();
    let mut out = data.to_vec();
    if n < 5 {
        return out;
    }
    for i in 1..(n - 1) {
        out[i] = (data[i - 1] + data[i] + data[i + 1]) / 3.0;
    }
    out
}

/// Savitzky-Golay smoothing: local least-squares polynomial fit.
///
/// `window` is rounded up to odd; boundaries are handled by reflection.
/// Falls back to the identity for curves shorter than the window.
pub(crate) fn savgol_smooth(data: &[f32], window: usize, order: usize) -> Vec<f32> {
    let window = if window % 2 == 0 { window + 1 } else { window };
    if window < 3 || data.len() < window {
        return data.to_vec();
    }
    let order = order.min(window - 1);
    let coeffs = savgol_coeffs(window, order);
    let half = (window / 2) as isize;
    let n = data.len();
    (0..n)
        .map(|i| {
            let mut acc = 0.0f32;
            for (k, &c) in coeffs.iter().enumerate() {
                let j = reflect(i as isize + k as isize - half, n);
                acc += c * data[j];
            }
            acc
        })
        .collect()
}

fn reflect(j: isize, n: usize) -> usize {
    let last = n as isize - 1;
    let mut j = j;
    if j < 0 {
        j = -j;
    }
    if j > last {
        j = 2 * last - j;
    }
    j.clamp(0, last) as usize
}

/// Center-point Savitzky-Golay convolution weights.
///
/// Solves the polynomial normal equations `G u = e0` directly; the system
/// is tiny (order+1 square), so a pivoted elimination in place is enough.
fn savgol_coeffs(window: usize, order: usize) -> Vec<f32> {
    let half = (window / 2) as i64;
    let m = order + 1;

    let mut g = vec![vec![0.0f64; m]; m];
    for (a, row) in g.iter_mut().enumerate() {
        for (b, cell) in row.iter_mut().enumerate() {
            *cell = (-half..=half).map(|x| (x as f64).powi((a + b) as i32)).sum();
        }
    }
    let mut rhs = vec![0.0f64; m];
    rhs[0] = 1.0;
    let u = solve_in_place(&mut g, &mut rhs);

    (-half..=half)
        .map(|x| {
            let mut w = 0.0f64;
            let mut xp = 1.0f64;
            for &uj in &u {
                w += uj * xp;
                xp *= x as f64;
            }
            w as f32
        })
        .collect()
}

/// Gaussian elimination with partial pivoting for a small dense system.
fn solve_in_place(a: &mut [Vec<f64>], b: &mut [f64]) -> Vec<f64> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().partial_cmp(&a[j][col].abs()).unwrap())
            .unwrap_or(col);
        a.swap(col, pivot);
        b.swap(col, pivot);
        let diag = a[col][col];
        if diag.abs() < 1e-12 {
            continue;
        }
        for row in (col + 1)..n {
            let factor = a[row][col] / diag;
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0f64; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in (row + 1)..n {
            acc -= a[row][k] * x[k];
        }
        x[row] = if a[row][row].abs() < 1e-12 {
            0.0
        } else {
            acc / a[row][row]
        };
    }
    x
}

/// Peak finding gates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PeakParams {
    /// Minimum index distance between kept peaks.
    pub min_distance: usize,
    /// Minimum topographic prominence.
    pub min_prominence: f32,
}

/// Indices of local maxima passing the prominence and spacing gates.
///
/// Candidates are ranked by height, then kept greedily under the
/// minimum-distance constraint; the result is sorted ascending.
pub(crate) fn find_peaks(data: &[f32], params: &PeakParams) -> Vec<usize> {
    if data.len() < 3 {
        return Vec::new();
    }
    let mut candidates: Vec<(usize, f32)> = Vec::new();
    for i in 1..(data.len() - 1) {
        if data[i] > data[i - 1] && data[i] >= data[i + 1] {
            let prom = prominence(data, i);
            if prom >= params.min_prominence {
                candidates.push((i, data[i]));
            }
        }
    }
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));

    let min_distance = params.min_distance.max(1);
    let mut kept: Vec<usize> = Vec::new();
    for (i, _) in candidates {
        if kept.iter().all(|&k| k.abs_diff(i) >= min_distance) {
            kept.push(i);
        }
    }
    kept.sort_unstable();
    kept
}

/// Indices of local minima passing the gates (peaks of the negated curve).
pub(crate) fn find_valleys(data: &[f32], params: &PeakParams) -> Vec<usize> {
    let negated: Vec<f32> = data.iter().map(|v| -v).collect();
    find_peaks(&negated, params)
}

/// Topographic prominence: height above the higher of the two minima
/// separating this peak from taller terrain on each side.
fn prominence(data: &[f32], i: usize) -> f32 {
    let peak = data[i];
    let mut left_min = peak;
    for j in (0..i).rev() {
        if data[j] > peak {
            break;
        }
        left_min = left_min.min(data[j]);
    }
    let mut right_min = peak;
    for v in &data[(i + 1)..] {
        if *v > peak {
            break;
        }
        right_min = right_min.min(*v);
    }
    peak - left_min.max(right_min)
}

/// Shared candidate extraction for the filtered-response detectors:
/// smooth the radial response, then keep prominent, well-spaced peaks.
///
/// Radii below 3 px are discarded; responses that close to the nucleus
/// carry no ring structure.
pub(crate) fn response_peak_radii(
    profile: &[f32],
    min_spacing_px: usize,
    prominence_factor: f32,
) -> Vec<f32> {
    if profile.len() < 5 {
        return Vec::new();
    }
    let smoothed = smooth_3(profile);
    let params = PeakParams {
        min_distance: min_spacing_px.max(1),
        min_prominence: prominence_factor * std_dev(&smoothed),
    };
    find_peaks(&smoothed, &params)
        .into_iter()
        .filter(|&i| i >= 3)
        .map(|i| i as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn savgol_preserves_linear_signals() {
        let data: Vec<f32> = (0..40).map(|i| 0.5 * i as f32 + 3.0).collect();
        let smoothed = savgol_smooth(&data, 9, 3);
        // Interior only: reflection padding bends the fit near the ends.
        for i in 4..36 {
            assert!(
                (data[i] - smoothed[i]).abs() < 1e-3,
                "{} vs {}",
                data[i],
                smoothed[i]
            );
        }
    }

    #[test]
    fn savgol_attenuates_single_sample_spike() {
        let mut data = vec![0.0f32; 31];
        data[15] = 10.0;
        let smoothed = savgol_smooth(&data, 9, 2);
        assert!(smoothed[15] < 5.0, "spike kept {}", smoothed[15]);
    }

    #[test]
    fn finds_periodic_peaks_with_spacing() {
        let data: Vec<f32> = (0..100)
            .map(|i| (2.0 * std::f32::consts::PI * i as f32 / 10.0).sin())
            .collect();
        let peaks = find_peaks(
            &data,
            &PeakParams {
                min_distance: 5,
                min_prominence: 0.5,
            },
        );
        assert!(
            (9..=10).contains(&peaks.len()),
            "expected ~10 peaks, got {:?}",
            peaks
        );
        for pair in peaks.windows(2) {
            assert!((pair[1] - pair[0]).abs_diff(10) <= 1);
        }
    }

    #[test]
    fn prominence_gate_rejects_ripple() {
        // Small ripple on a flat line plus one genuine peak.
        let mut data: Vec<f32> = (0..50).map(|i| if i % 2 == 0 { 0.0 } else { 0.05 }).collect();
        data[25] = 5.0;
        let peaks = find_peaks(
            &data,
            &PeakParams {
                min_distance: 1,
                min_prominence: 1.0,
            },
        );
        assert_eq!(peaks, vec![25]);
    }

    #[test]
    fn valleys_mirror_peaks() {
        let data: Vec<f32> = (0..60)
            .map(|i| (2.0 * std::f32::consts::PI * i as f32 / 12.0).cos())
            .collect();
        let valleys = find_valleys(
            &data,
            &PeakParams {
                min_distance: 6,
                min_prominence: 0.5,
            },
        );
        assert!(!valleys.is_empty());
        // Cosine minima sit at odd multiples of the half period.
        for v in &valleys {
            assert!(v % 12 == 6, "valley at {} is not a cosine minimum", v);
        }
    }

    #[test]
    fn spacing_cv_sentinels() {
        assert_eq!(spacing_cv(&[]), INVALID_SPACING_CV);
        assert_eq!(spacing_cv(&[5.0]), INVALID_SPACING_CV);
        assert!(spacing_cv(&[10.0, 20.0, 30.0]) < 1e-6);
        let irregular = spacing_cv(&[10.0, 12.0, 30.0, 31.0]);
        assert!(irregular > 0.5 && irregular < INVALID_SPACING_CV);
    }
}
