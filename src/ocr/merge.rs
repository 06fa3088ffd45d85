use super::geom::RectPx;
use super::{NormBox, RawDetection, TextRegion};

/// A detection merges into the previous region only when its vertical center
/// sits within half its own height of the previous region's center.
const MERGE_CENTER_RATIO: f32 = 0.5;
/// ...and the horizontal gap between the previous region's right edge and
/// its left edge is under twice its own width.
const MERGE_GAP_RATIO: f32 = 2.0;

/// Consolidates raw OCR detections into pixel-space text regions.
///
/// Detections are taken top-to-bottom (descending normalized origin-Y) and
/// folded greedily: each one either merges into the last accumulated region
/// or starts a new one. Both thresholds are strict; boundary equality does
/// not merge. The fold is a single pass, not a clustering step, so input
/// order matters.
pub fn merge_detections(
    mut detections: Vec<RawDetection>,
    width: u32,
    height: u32,
) -> Vec<TextRegion> {
    detections.retain(|det| !det.text.trim().is_empty());
    detections.sort_by(|a, b| {
        b.bbox
            .y
            .partial_cmp(&a.bbox.y)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut regions: Vec<TextRegion> = Vec::new();
    for det in detections {
        let rect = to_pixel_rect(&det.bbox, width, height);
        if let Some(last) = regions.last_mut() {
            let center_dist = (last.rect.mid_y() - rect.mid_y()).abs();
            let gap = (last.rect.max_x() - rect.min_x()).abs();
            if center_dist < rect.h * MERGE_CENTER_RATIO && gap < rect.w * MERGE_GAP_RATIO {
                let text = format!("{} {}", last.original_text, det.text);
                *last = TextRegion::new(last.rect.union(&rect), text);
                continue;
            }
        }
        regions.push(TextRegion::new(rect, det.text));
    }
    regions
}

/// Converts a bottom-origin normalized box to a top-left-origin pixel rect.
fn to_pixel_rect(bbox: &NormBox, width: u32, height: u32) -> RectPx {
    let w = width as f32;
    let h = height as f32;
    RectPx {
        x: bbox.x * w,
        y: (1.0 - bbox.y - bbox.h) * h,
        w: bbox.w * w,
        h: bbox.h * h,
    }
}
