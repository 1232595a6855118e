//! Radial intensity profiling from the otolith nucleus.
//!
//! Rays are cast outward from the center at evenly spaced angles and the
//! preprocessed image is sampled at unit-pixel steps along each. Rays that
//! leave the frame early or end up too short are discarded; the survivors
//! are linearly resampled to a common length and averaged into the mean
//! profile consumed by the profile-peak detector.

use image::GrayImage;

/// Configuration for radial profile extraction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RadialProfileConfig {
    /// Number of evenly spaced rays.
    pub n_rays: usize,
    /// Safety margin subtracted from the nearest-edge distance, in pixels.
    pub edge_margin: f32,
    /// Rays with fewer samples than this are discarded.
    pub min_ray_samples: usize,
}

impl Default for RadialProfileConfig {
    fn default() -> Self {
        Self {
            n_rays: 360,
            edge_margin: 2.0,
            min_ray_samples: 10,
        }
    }
}

/// Per-ray samples and their length-normalized mean.
#[derive(Debug, Clone, Default)]
pub struct RadialProfile {
    /// Raw per-ray intensity samples (unit radius steps from the center).
    pub rays: Vec<Vec<f32>>,
    /// Mean profile over all usable rays, resampled to a common length.
    pub mean: Vec<f32>,
    /// Largest sampled radius, in pixels.
    pub max_radius: f32,
}

impl RadialProfile {
    /// Whether the mean profile carries enough samples to analyze.
    pub fn is_usable(&self) -> bool {
        self.mean.len() > 10
    }
}

/// Bilinearly sample a grayscale image at a sub-pixel position.
///
/// Returns `None` outside the interpolatable area.
pub(crate) fn bilinear_sample(img: &GrayImage, x: f32, y: f32) -> Option<f32> {
    let (w, h) = img.dimensions();
    if x < 0.0 || y < 0.0 {
        return None;
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    if x0 + 1 >= w || y0 + 1 >= h {
        return None;
    }
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let p00 = img.get_pixel(x0, y0)[0] as f32;
    let p10 = img.get_pixel(x0 + 1, y0)[0] as f32;
    let p01 = img.get_pixel(x0, y0 + 1)[0] as f32;
    let p11 = img.get_pixel(x0 + 1, y0 + 1)[0] as f32;
    let top = p00 * (1.0 - fx) + p10 * fx;
    let bot = p01 * (1.0 - fx) + p11 * fx;
    Some(top * (1.0 - fy) + bot * fy)
}

/// Largest radius safely sampleable from `center`, margin applied.
pub(crate) fn max_sample_radius(dims: (u32, u32), center: [u32; 2], margin: f32) -> f32 {
    let (w, h) = dims;
    let to_edge = (center[0].min(w.saturating_sub(1).saturating_sub(center[0])))
        .min(center[1].min(h.saturating_sub(1).saturating_sub(center[1])));
    (to_edge as f32 - margin).max(0.0)
}

/// Cast rays from `center` and build per-ray profiles plus the mean profile.
pub fn radial_profile(
    image: &GrayImage,
    center: [u32; 2],
    config: &RadialProfileConfig,
) -> RadialProfile {
    let max_radius = max_sample_radius(image.dimensions(), center, config.edge_margin);
    let n_steps = max_radius.floor() as usize + 1;
    if config.n_rays == 0 || n_steps <= 1 {
        return RadialProfile::default();
    }

    let (cx, cy) = (center[0] as f32, center[1] as f32);
    let mut rays: Vec<Vec<f32>> = Vec::with_capacity(config.n_rays);
    for i in 0..config.n_rays {
        let theta = 2.0 * std::f32::consts::PI * i as f32 / config.n_rays as f32;
        let (st, ct) = theta.sin_cos();
        let mut samples = Vec::with_capacity(n_steps);
        for r in 0..n_steps {
            match bilinear_sample(image, cx + ct * r as f32, cy + st * r as f32) {
                Some(v) => samples.push(v),
                None => break,
            }
        }
        if samples.len() >= config.min_ray_samples {
            rays.push(samples);
        }
    }

    if rays.is_empty() {
        return RadialProfile {
            rays,
            mean: Vec::new(),
            max_radius,
        };
    }

    let common_len = rays.iter().map(Vec::len).max().unwrap_or(0);
    let mut mean = vec![0.0f32; common_len];
    for ray in &rays {
        let resampled = resample_linear(ray, common_len);
        for (acc, v) in mean.iter_mut().zip(resampled) {
            *acc += v;
        }
    }
    for v in mean.iter_mut() {
        *v /= rays.len() as f32;
    }

    RadialProfile {
        rays,
        mean,
        max_radius,
    }
}

/// Linearly resample `data` to `target_len` samples over the same span.
fn resample_linear(data: &[f32], target_len: usize) -> Vec<f32> {
    if data.is_empty() || target_len == 0 {
        return Vec::new();
    }
    if data.len() == target_len || data.len() == 1 {
        let mut out = data.to_vec();
        out.resize(target_len, *data.last().unwrap_or(&0.0));
        return out;
    }
    let scale = (data.len() - 1) as f32 / (target_len - 1).max(1) as f32;
    (0..target_len)
        .map(|i| {
            let t = i as f32 * scale;
            let i0 = t.floor() as usize;
            let i1 = (i0 + 1).min(data.len() - 1);
            let f = t - i0 as f32;
            data[i0] * (1.0 - f) + data[i1] * f
        })
        .collect()
}
