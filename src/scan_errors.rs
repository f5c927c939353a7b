//! # Scan Error Types Module
//!
//! This module defines the error types raised by the answer-sheet scanning pipeline.
//! Each variant corresponds to one failure kind of a pipeline stage; none of them
//! are recovered from inside the pipeline.

/// Custom error types for scan operations
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    /// Input image is missing, unreadable or not a supported format
    ImageLoad(String),
    /// No contour of the edge map approximates to a 4-vertex polygon
    DocumentNotFound { contours_examined: usize },
    /// The document quadrilateral cannot be mapped onto a rectangle
    DegenerateGeometry(String),
    /// The segmented bubbles cannot be partitioned into uniform rows
    BubbleGridMismatch {
        found: usize,
        options_per_row: usize,
        expected_questions: Option<usize>,
    },
    /// The answer key length does not match the number of detected questions
    AnswerKeyMismatch { expected: usize, actual: usize },
}

impl ScanError {
    /// Short machine-readable kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::ImageLoad(_) => "image_load",
            ScanError::DocumentNotFound { .. } => "document_not_found",
            ScanError::DegenerateGeometry(_) => "degenerate_geometry",
            ScanError::BubbleGridMismatch { .. } => "bubble_grid_mismatch",
            ScanError::AnswerKeyMismatch { .. } => "answer_key_mismatch",
        }
    }
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::ImageLoad(msg) => write!(f, "[IMAGE_LOAD] Failed to load image: {}", msg),
            ScanError::DocumentNotFound { contours_examined } => write!(
                f,
                "[DOCUMENT_NOT_FOUND] No 4-sided document boundary among {} contours",
                contours_examined
            ),
            ScanError::DegenerateGeometry(msg) => {
                write!(f, "[DEGENERATE_GEOMETRY] Cannot rectify document: {}", msg)
            }
            ScanError::BubbleGridMismatch {
                found,
                options_per_row,
                expected_questions,
            } => match expected_questions {
                Some(questions) => write!(
                    f,
                    "[BUBBLE_GRID] Found {} bubbles, expected {} rows of {}",
                    found, questions, options_per_row
                ),
                None => write!(
                    f,
                    "[BUBBLE_GRID] Found {} bubbles, not a non-zero multiple of {}",
                    found, options_per_row
                ),
            },
            ScanError::AnswerKeyMismatch { expected, actual } => write!(
                f,
                "[ANSWER_KEY] Answer key has {} entries but {} questions were detected",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for ScanError {}

impl From<image::ImageError> for ScanError {
    fn from(err: image::ImageError) -> Self {
        ScanError::ImageLoad(err.to_string())
    }
}
