//! # Edge Map Module
//!
//! Builds the binary edge map the document localizer searches for the sheet
//! boundary: grayscale conversion, Gaussian smoothing, Canny hysteresis.

use image::{DynamicImage, GrayImage};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use tracing;

use super::types::EdgeMapResult;
use crate::scan_config::EdgeConfig;

/// Converts an image into a binary edge map of the same dimensions.
///
/// Thresholds are fixed rather than adaptive: the intended input is a
/// high-contrast printed sheet on a contrasting background. This stage never
/// fails; an image without usable edges simply yields an empty map and the
/// localizer reports the missing document.
///
/// # Examples
///
/// ```
/// use answer_sheet_scanner::preprocessing::build_edge_map;
/// use answer_sheet_scanner::scan_config::EdgeConfig;
/// use image::{DynamicImage, RgbImage};
///
/// let img = DynamicImage::ImageRgb8(RgbImage::new(64, 48));
/// let edges = build_edge_map(&img, &EdgeConfig::default());
/// assert_eq!(edges.image.dimensions(), (64, 48));
/// ```
pub fn build_edge_map(image: &DynamicImage, config: &EdgeConfig) -> EdgeMapResult {
    build_edge_map_from_gray(&image.to_luma8(), config)
}

/// Same as [`build_edge_map`] for an image already converted to grayscale.
pub fn build_edge_map_from_gray(gray: &GrayImage, config: &EdgeConfig) -> EdgeMapResult {
    let start_time = std::time::Instant::now();

    let blurred = gaussian_blur_f32(gray, config.blur_sigma);
    let edges = canny(&blurred, config.canny_low, config.canny_high);

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "omr_pipeline",
        "Edge map built in {}ms: sigma={:.2}, thresholds={}/{}, dimensions={}x{}",
        processing_time.as_millis(),
        config.blur_sigma,
        config.canny_low,
        config.canny_high,
        edges.width(),
        edges.height()
    );

    EdgeMapResult {
        image: edges,
        sigma: config.blur_sigma,
        processing_time_ms: processing_time.as_millis() as u32,
    }
}
