//! # Shared Types for Image Preprocessing
//!
//! Result types produced by the raster-level preprocessing operations.

use image::GrayImage;

/// Result of the edge map builder.
#[derive(Debug, Clone)]
pub struct EdgeMapResult {
    /// Binary edge map (255 = edge), same dimensions as the source
    pub image: GrayImage,
    /// Sigma used for Gaussian smoothing
    pub sigma: f32,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of image thresholding operation.
#[derive(Debug, Clone)]
pub struct ThresholdedImageResult {
    /// The thresholded binary image (255 = foreground)
    pub image: GrayImage,
    /// Optimal threshold value found by Otsu's method
    pub threshold: u8,
    /// Which side of the threshold became foreground
    pub polarity: ThresholdPolarity,
    /// Number of foreground pixels
    pub foreground_pixels: u64,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Which intensities become foreground after thresholding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdPolarity {
    /// Pixels brighter than the threshold become foreground
    Normal,
    /// Pixels at or below the threshold become foreground (dark ink on paper)
    Inverted,
}
