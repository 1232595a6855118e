//! Mask moments, nucleus location and morphometric measurements.

use image::GrayImage;

/// Raw and central image moments of a binary mask.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    /// Central second moments.
    pub mu20: f64,
    pub mu02: f64,
    pub mu11: f64,
}

pub(crate) fn mask_moments(mask: &GrayImage) -> Moments {
    let mut m00 = 0.0f64;
    let mut m10 = 0.0f64;
    let mut m01 = 0.0f64;
    let mut m20 = 0.0f64;
    let mut m02 = 0.0f64;
    let mut m11 = 0.0f64;
    for (x, y, p) in mask.enumerate_pixels() {
        if p[0] == 0 {
            continue;
        }
        let (xf, yf) = (x as f64, y as f64);
        m00 += 1.0;
        m10 += xf;
        m01 += yf;
        m20 += xf * xf;
        m02 += yf * yf;
        m11 += xf * yf;
    }
    if m00 == 0.0 {
        return Moments::default();
    }
    let cx = m10 / m00;
    let cy = m01 / m00;
    Moments {
        m00,
        m10,
        m01,
        mu20: m20 - m00 * cx * cx,
        mu02: m02 - m00 * cy * cy,
        mu11: m11 - m00 * cx * cy,
    }
}

/// Otolith nucleus as the mask centroid, `cx = M10/M00`, `cy = M01/M00`.
///
/// An empty mask degenerates to the geometric image center.
pub(crate) fn centroid(mask: &GrayImage) -> [u32; 2] {
    let (w, h) = mask.dimensions();
    let m = mask_moments(mask);
    if m.m00 == 0.0 {
        return [w / 2, h / 2];
    }
    let cx = (m.m10 / m.m00).round().clamp(0.0, (w - 1) as f64) as u32;
    let cy = (m.m01 / m.m00).round().clamp(0.0, (h - 1) as f64) as u32;
    [cx, cy]
}

/// Shape measurements of the segmented otolith region, in pixels.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Morphometrics {
    /// Major axis of the equivalent ellipse.
    pub length_px: f32,
    /// Minor axis of the equivalent ellipse.
    pub width_px: f32,
    pub area_px: u32,
    pub perimeter_px: u32,
    /// `4*pi*A / P^2`; 1.0 for a perfect disk.
    pub circularity: f32,
    pub aspect_ratio: f32,
    pub major_axis_px: f32,
    pub minor_axis_px: f32,
}

/// Measure the mask's equivalent-ellipse geometry and boundary statistics.
pub fn morphometrics(mask: &GrayImage) -> Morphometrics {
    let m = mask_moments(mask);
    let area = m.m00;
    let perimeter = perimeter(mask);

    if area == 0.0 {
        return Morphometrics {
            length_px: 0.0,
            width_px: 0.0,
            area_px: 0,
            perimeter_px: 0,
            circularity: 0.0,
            aspect_ratio: 0.0,
            major_axis_px: 0.0,
            minor_axis_px: 0.0,
        };
    }

    // Eigenvalues of the normalized covariance matrix give the equivalent
    // ellipse; for a solid ellipse the variance along an axis is (a/2)^2.
    let sxx = m.mu20 / area;
    let syy = m.mu02 / area;
    let sxy = m.mu11 / area;
    let tr = sxx + syy;
    let det = ((sxx - syy) * (sxx - syy) + 4.0 * sxy * sxy).sqrt();
    let l1 = ((tr + det) / 2.0).max(0.0);
    let l2 = ((tr - det) / 2.0).max(0.0);
    let major = 4.0 * l1.sqrt();
    let minor = 4.0 * l2.sqrt();

    let circularity = if perimeter > 0 {
        (4.0 * std::f64::consts::PI * area / (perimeter as f64 * perimeter as f64)) as f32
    } else {
        0.0
    };

    Morphometrics {
        length_px: major as f32,
        width_px: minor as f32,
        area_px: area as u32,
        perimeter_px: perimeter,
        circularity,
        aspect_ratio: if minor > 1e-9 { (major / minor) as f32 } else { 0.0 },
        major_axis_px: major as f32,
        minor_axis_px: minor as f32,
    }
}

/// Boundary pixel count: foreground pixels touching background or the frame.
fn perimeter(mask: &GrayImage) -> u32 {
    let (w, h) = mask.dimensions();
    let mut count = 0u32;
    for (x, y, p) in mask.enumerate_pixels() {
        if p[0] == 0 {
            continue;
        }
        let at_frame = x == 0 || y == 0 || x == w - 1 || y == h - 1;
        let touches_bg = !at_frame
            && (mask.get_pixel(x - 1, y)[0] == 0
                || mask.get_pixel(x + 1, y)[0] == 0
                || mask.get_pixel(x, y - 1)[0] == 0
                || mask.get_pixel(x, y + 1)[0] == 0);
        if at_frame || touches_bg {
            count += 1;
        }
    }
    count
}
