//! # Image Preprocessing Module
//!
//! Raster-level operations feeding the geometric stages of the scanner.
//!
//! The module is organized into focused sub-modules:
//! - `edges`: Gaussian smoothing and Canny edge map
//! - `thresholding`: Binary thresholding using Otsu's method
//! - `types`: Shared result types

pub mod edges;
pub mod thresholding;
pub mod types;

pub use types::{EdgeMapResult, ThresholdPolarity, ThresholdedImageResult};

pub use edges::{build_edge_map, build_edge_map_from_gray};
pub use thresholding::{apply_otsu_threshold, find_otsu_threshold};
