//! # Bubble Segmenter
//!
//! Binarizes the rectified sheet and keeps the external blobs whose bounding
//! box is roughly square and bubble-sized.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use tracing;

use super::types::Region;
use crate::preprocessing::{apply_otsu_threshold, ThresholdPolarity, ThresholdedImageResult};
use crate::scan_config::BubbleFilterConfig;

/// Output of the bubble segmenter.
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    /// Inverted Otsu binary of the sheet (255 = ink), reused for fill counting
    pub binary: ThresholdedImageResult,
    /// Accepted bubble candidates in contour enumeration order
    pub regions: Vec<Region>,
    /// External contours seen before size filtering
    pub contours_examined: usize,
    /// `(min, max)` side length in pixels applied to this sheet
    pub size_window: (f32, f32),
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Finds bubble candidates on a rectified sheet.
///
/// Never fails: a sheet without bubbles yields an empty region list, which
/// the grid reconstructor rejects.
pub fn segment_bubbles(sheet: &GrayImage, config: &BubbleFilterConfig) -> SegmentationResult {
    let start_time = std::time::Instant::now();

    let mut binary = apply_otsu_threshold(sheet, ThresholdPolarity::Inverted);
    if config.clear_border {
        let cleared = clear_border(&mut binary.image);
        binary.foreground_pixels -= cleared;
    }

    let size_window = config.size_window(sheet.width());

    let external: Vec<Vec<Point<i32>>> = find_contours::<i32>(&binary.image)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .collect();
    let contours_examined = external.len();

    let regions: Vec<Region> = external
        .into_iter()
        .filter_map(Region::from_contour)
        .filter(|region| {
            let bbox = region.bbox();
            config.accepts(bbox.width, bbox.height, size_window)
        })
        .collect();

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "omr_pipeline",
        "Bubbles segmented in {}ms: threshold={}, contours={}, accepted={}, window={:.1}-{:.1}px",
        processing_time.as_millis(),
        binary.threshold,
        contours_examined,
        regions.len(),
        size_window.0,
        size_window.1
    );

    SegmentationResult {
        binary,
        regions,
        contours_examined,
        size_window,
        processing_time_ms: processing_time.as_millis() as u32,
    }
}

/// Erases every foreground component (8-connected) touching the image border.
/// Returns the number of pixels cleared.
fn clear_border(binary: &mut GrayImage) -> u64 {
    let (width, height) = binary.dimensions();
    if width == 0 || height == 0 {
        return 0;
    }

    let mut stack: Vec<(u32, u32)> = Vec::new();
    for x in 0..width {
        stack.push((x, 0));
        stack.push((x, height - 1));
    }
    for y in 0..height {
        stack.push((0, y));
        stack.push((width - 1, y));
    }

    let mut cleared = 0u64;
    while let Some((x, y)) = stack.pop() {
        if binary.get_pixel(x, y)[0] == 0 {
            continue;
        }
        binary.put_pixel(x, y, Luma([0]));
        cleared += 1;

        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                if (dx, dy) != (0, 0)
                    && nx >= 0
                    && ny >= 0
                    && nx < width as i64
                    && ny < height as i64
                {
                    stack.push((nx as u32, ny as u32));
                }
            }
        }
    }
    cleared
}
