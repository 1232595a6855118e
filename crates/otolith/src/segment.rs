//! Otolith segmentation: threshold selection, morphological cleanup and
//! largest-connected-region extraction.
//!
//! Illumination varies across the otolith, so a locally-adapting threshold
//! and a global Otsu threshold are both computed and whichever captures the
//! larger foreground area wins. When no foreground region survives cleanup
//! the mask degrades to the full frame and the report carries a quality
//! flag instead of aborting.

use image::{GrayImage, Luma};
use imageproc::contrast::{adaptive_threshold, otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};
use imageproc::region_labelling::{connected_components, Connectivity};

/// Configuration for the segmentation stage.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Block radius for the locally-adapting threshold, in pixels.
    pub adaptive_block_radius: u32,
    /// Structuring-element radius for the closing/opening pass.
    pub morph_radius: u8,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            adaptive_block_radius: 16,
            morph_radius: 2,
        }
    }
}

/// Binary otolith mask with segmentation quality metadata.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// 0/255 mask, same dimensions as the input.
    pub mask: GrayImage,
    /// Foreground pixel count of the final mask.
    pub area_px: u32,
    /// True when no foreground region was found and the mask covers the
    /// whole frame.
    pub full_frame_fallback: bool,
}

/// Segment the otolith from the background of a preprocessed image.
pub fn segment(gray: &GrayImage, config: &SegmentConfig) -> Segmentation {
    let (w, h) = gray.dimensions();

    let adaptive = adaptive_threshold(gray, config.adaptive_block_radius.max(1));
    let global = threshold(gray, otsu_level(gray), ThresholdType::Binary);

    // More captured area is used as a proxy for more captured structure.
    let candidate = if foreground_area(&adaptive) >= foreground_area(&global) {
        adaptive
    } else {
        global
    };

    // Closing fills small gaps between annuli, opening removes speckle.
    let closed = close(&candidate, Norm::LInf, config.morph_radius);
    let opened = open(&closed, Norm::LInf, config.morph_radius);

    match largest_component(&opened) {
        Some((mask, area_px)) => {
            tracing::debug!("segmented otolith region: {} px", area_px);
            Segmentation {
                mask,
                area_px,
                full_frame_fallback: false,
            }
        }
        None => {
            tracing::warn!("no foreground region found, falling back to full-frame mask");
            Segmentation {
                mask: GrayImage::from_pixel(w, h, Luma([255])),
                area_px: w * h,
                full_frame_fallback: true,
            }
        }
    }
}

pub(crate) fn foreground_area(mask: &GrayImage) -> u32 {
    mask.pixels().filter(|p| p[0] > 0).count() as u32
}

/// Keep only the largest connected foreground region.
///
/// Returns `None` when the mask has no foreground at all.
pub(crate) fn largest_component(mask: &GrayImage) -> Option<(GrayImage, u32)> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut areas: Vec<u32> = Vec::new();
    for p in labels.pixels() {
        let label = p[0] as usize;
        if label == 0 {
            continue;
        }
        if label >= areas.len() {
            areas.resize(label + 1, 0);
        }
        areas[label] += 1;
    }

    let (best_label, best_area) = areas
        .iter()
        .enumerate()
        .max_by_key(|(_, &area)| area)
        .filter(|(_, &area)| area > 0)?;

    let (w, h) = mask.dimensions();
    let mut out = GrayImage::new(w, h);
    for (x, y, p) in labels.enumerate_pixels() {
        if p[0] as usize == best_label {
            out.put_pixel(x, y, Luma([255]));
        }
    }
    Some((out, *best_area))
}
