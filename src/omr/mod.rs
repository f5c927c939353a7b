//! # Optical Mark Recognition
//!
//! The geometric stages of the scanner, in pipeline order:
//! - `localizer`: document boundary in the edge map
//! - `perspective`: top-down view of the document
//! - `segmentation`: bubble candidates on the rectified sheet
//! - `grid`: bubbles ordered into question rows
//! - `answers`: marked option per row
//!
//! plus `grading` against an answer key and `annotate` for visual checks.

pub mod annotate;
pub mod answers;
pub mod geometry;
pub mod grading;
pub mod grid;
pub mod localizer;
pub mod perspective;
pub mod segmentation;
pub mod types;

pub use geometry::{BoundingBox, Point2D, Quadrilateral};
pub use types::{AnswerResult, BubbleRow, DocumentOutline, Region, RowReading};

pub use annotate::render_overlay;
pub use answers::{extract_answers, read_row, select_marked};
pub use grading::{grade, AnswerKey, GradeReport, QuestionGrade};
pub use grid::reconstruct_grid;
pub use localizer::locate_document;
pub use perspective::{rectify, target_dimensions, RectifiedImage};
pub use segmentation::{segment_bubbles, SegmentationResult};
