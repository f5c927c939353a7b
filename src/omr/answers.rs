//! # Answer Extractor
//!
//! Picks the most-filled bubble of every row.

use image::GrayImage;
use tracing;

use super::types::{AnswerResult, BubbleRow, RowReading};

/// Index of the largest count, scanning left to right with a strict `>`.
///
/// The earliest bubble wins a tie, and a row without any ink selects 0.
/// Returns `None` only for an empty slice.
///
/// # Examples
///
/// ```
/// use answer_sheet_scanner::omr::select_marked;
///
/// assert_eq!(select_marked(&[10, 50, 50, 5, 0]), Some(1));
/// assert_eq!(select_marked(&[0, 0, 0]), Some(0));
/// assert_eq!(select_marked(&[]), None);
/// ```
pub fn select_marked(fill_counts: &[u32]) -> Option<usize> {
    let (mut best_index, mut best_count) = (0, *fill_counts.first()?);
    for (index, &count) in fill_counts.iter().enumerate().skip(1) {
        if count > best_count {
            best_index = index;
            best_count = count;
        }
    }
    Some(best_index)
}

/// Counts the ink inside every bubble of `row` and selects the marked one.
pub fn read_row(row: &BubbleRow, binary: &GrayImage) -> RowReading {
    let fill_counts: Vec<u32> = row
        .bubbles
        .iter()
        .map(|bubble| bubble.count_foreground(binary))
        .collect();

    RowReading {
        question: row.question,
        selected: select_marked(&fill_counts).unwrap_or(0),
        fill_counts,
    }
}

/// Reads every row of the grid against the thresholded sheet.
pub fn extract_answers(rows: &[BubbleRow], binary: &GrayImage) -> AnswerResult {
    let readings: Vec<RowReading> = rows.iter().map(|row| read_row(row, binary)).collect();

    for reading in &readings {
        if reading.is_blank() {
            tracing::warn!(
                target: "omr_pipeline",
                question = reading.question,
                "Row has no marked bubble, defaulting to the first option"
            );
        } else if reading.is_tied() {
            tracing::warn!(
                target: "omr_pipeline",
                question = reading.question,
                fill_counts = ?reading.fill_counts,
                "Several bubbles equally filled, keeping the leftmost"
            );
        }
    }

    AnswerResult { rows: readings }
}
