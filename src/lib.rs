//! # Answer Sheet Scanner
//!
//! Reads the marked options of a multiple-choice answer sheet from a photo:
//! the sheet is located, rectified to a top-down view, its bubbles are
//! segmented and arranged into question rows, and the most-filled bubble of
//! every row is reported.

pub mod config;
pub mod errors;
pub mod image_io;
pub mod observability;
pub mod observability_config;
pub mod omr;
pub mod pipeline;
pub mod preprocessing;
pub mod scan_config;
pub mod scan_errors;

// Re-export types for easier access
pub use omr::{AnswerKey, AnswerResult, GradeReport};
pub use pipeline::{ScanOutcome, ScanPipeline, ScanReport};
pub use scan_config::ScanConfig;
pub use scan_errors::ScanError;
