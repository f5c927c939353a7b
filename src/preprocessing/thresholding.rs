//! # Image Thresholding Module
//!
//! Binary thresholding with Otsu's method for automatic threshold selection.

use image::{GrayImage, Luma};
use tracing;

use super::types::{ThresholdPolarity, ThresholdedImageResult};

/// Applies Otsu's thresholding algorithm to convert an image to binary (0/255).
///
/// The threshold maximizes the between-class variance of the intensity
/// histogram. With [`ThresholdPolarity::Inverted`] pixels at or below the
/// threshold become foreground, which turns pencil marks on white paper into
/// white blobs on a black mask.
///
/// # Examples
///
/// ```
/// use answer_sheet_scanner::preprocessing::{apply_otsu_threshold, ThresholdPolarity};
/// use image::{GrayImage, Luma};
///
/// let mut img = GrayImage::from_pixel(4, 1, Luma([230]));
/// img.put_pixel(0, 0, Luma([10]));
/// let result = apply_otsu_threshold(&img, ThresholdPolarity::Inverted);
/// assert_eq!(result.image.get_pixel(0, 0)[0], 255);
/// assert_eq!(result.foreground_pixels, 1);
/// ```
pub fn apply_otsu_threshold(
    gray: &GrayImage,
    polarity: ThresholdPolarity,
) -> ThresholdedImageResult {
    let start_time = std::time::Instant::now();

    // Calculate histogram
    let mut histogram = [0u32; 256];
    let total_pixels = (gray.width() as u64 * gray.height() as u64) as f64;

    for pixel in gray.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let optimal_threshold = find_otsu_threshold(&histogram, total_pixels);

    let mut binary_img = GrayImage::new(gray.width(), gray.height());
    let mut foreground_pixels = 0u64;

    for (x, y, pixel) in gray.enumerate_pixels() {
        let is_foreground = match polarity {
            ThresholdPolarity::Normal => pixel[0] > optimal_threshold,
            ThresholdPolarity::Inverted => pixel[0] <= optimal_threshold,
        };
        if is_foreground {
            foreground_pixels += 1;
            binary_img.put_pixel(x, y, Luma([255u8]));
        }
    }

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "omr_pipeline",
        "Otsu thresholding completed in {}ms: threshold={}, polarity={:?}, foreground={}, dimensions={}x{}",
        processing_time.as_millis(),
        optimal_threshold,
        polarity,
        foreground_pixels,
        gray.width(),
        gray.height()
    );

    ThresholdedImageResult {
        image: binary_img,
        threshold: optimal_threshold,
        polarity,
        foreground_pixels,
        processing_time_ms: processing_time.as_millis() as u32,
    }
}

/// Finds the optimal threshold using Otsu's method by maximizing between-class variance.
///
/// Pixels `<= threshold` form the first class. The first threshold reaching the
/// maximum variance wins; a histogram with a single populated bin yields the
/// fallback of 128.
pub fn find_otsu_threshold(histogram: &[u32; 256], total_pixels: f64) -> u8 {
    let mut cumulative_sum = 0f64;
    let mut cumulative_weighted_sum = 0f64;

    let mut cumulative_sums = [0f64; 256];
    let mut cumulative_weighted_sums = [0f64; 256];

    for i in 0..256 {
        let pixel_count = histogram[i] as f64;
        cumulative_sum += pixel_count;
        cumulative_weighted_sum += (i as f64) * pixel_count;

        cumulative_sums[i] = cumulative_sum;
        cumulative_weighted_sums[i] = cumulative_weighted_sum;
    }

    let mut max_variance = 0f64;
    let mut optimal_threshold = 128u8; // Default fallback

    let total_weighted_sum = cumulative_weighted_sums[255];

    for threshold in 0..255 {
        let threshold_idx = threshold as usize;

        // Weight of background class (pixels <= threshold)
        let w0 = cumulative_sums[threshold_idx] / total_pixels;

        // Weight of foreground class (pixels > threshold)
        let w1 = 1.0 - w0;

        if w0 <= 0.0 || w1 <= 0.0 {
            continue;
        }

        let mu0 = cumulative_weighted_sums[threshold_idx] / cumulative_sums[threshold_idx];
        let mu1 = (total_weighted_sum - cumulative_weighted_sums[threshold_idx])
            / (cumulative_sums[255] - cumulative_sums[threshold_idx]);

        let variance = w0 * w1 * (mu0 - mu1).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = threshold as u8;
        }
    }

    optimal_threshold
}
