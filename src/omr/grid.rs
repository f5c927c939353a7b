//! # Grid Reconstructor
//!
//! Orders bubble regions into question rows: top to bottom, then left to right
//! within each row.

use tracing;

use super::types::{BubbleRow, Region};
use crate::scan_config::GridConfig;
use crate::scan_errors::ScanError;

/// Partitions `regions` into rows of `options_per_row` bubbles.
///
/// Regions are sorted by the top edge of their bounding box (left edge on
/// ties) and cut into consecutive chunks; each chunk is then sorted by its
/// left edge. The input order does not matter.
///
/// # Errors
///
/// Returns `ScanError::BubbleGridMismatch` when there are no regions, when
/// their count is not a multiple of `options_per_row`, or when the number of
/// rows differs from a configured `expected_questions`.
pub fn reconstruct_grid(
    mut regions: Vec<Region>,
    config: &GridConfig,
) -> Result<Vec<BubbleRow>, ScanError> {
    let found = regions.len();
    let per_row = config.options_per_row;

    let row_count_matches = config
        .expected_questions
        .map_or(true, |questions| questions * per_row == found);

    if found == 0 || per_row == 0 || found % per_row != 0 || !row_count_matches {
        tracing::debug!(
            target: "omr_pipeline",
            "Bubble grid rejected: found={}, options_per_row={}, expected_questions={:?}",
            found,
            per_row,
            config.expected_questions
        );
        return Err(ScanError::BubbleGridMismatch {
            found,
            options_per_row: per_row,
            expected_questions: config.expected_questions,
        });
    }

    regions.sort_by_key(|region| {
        let bbox = region.bbox();
        (bbox.y, bbox.x)
    });

    let mut rows = Vec::with_capacity(found / per_row);
    let mut remaining = regions.into_iter();
    for question in 0..found / per_row {
        let mut bubbles: Vec<Region> = remaining.by_ref().take(per_row).collect();
        bubbles.sort_by_key(|region| region.bbox().x);
        rows.push(BubbleRow { question, bubbles });
    }

    tracing::debug!(
        target: "omr_pipeline",
        "Bubble grid reconstructed: {} questions x {} options",
        rows.len(),
        per_row
    );

    Ok(rows)
}
