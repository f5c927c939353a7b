//! # Document Localizer
//!
//! Finds the answer sheet boundary in an edge map: the largest external
//! contour whose polygon approximation has exactly four vertices.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use tracing;

use super::geometry::{approximate_closed_polygon, closed_perimeter, polygon_area, BoundingBox};
use super::types::DocumentOutline;
use crate::scan_config::LocalizerConfig;
use crate::scan_errors::ScanError;

struct Candidate {
    index: usize,
    area: f64,
    bbox: BoundingBox,
    points: Vec<Point<i32>>,
}

/// Locates the document boundary in `edge_map`.
///
/// Contours are scanned by enclosed area, largest first, and the first one
/// approximating to a quadrilateral wins. Equal areas are ordered by the top
/// then left edge of their bounding box, then by contour enumeration order.
///
/// # Errors
///
/// Returns `ScanError::DocumentNotFound` when no contour approximates to four vertices.
pub fn locate_document(
    edge_map: &GrayImage,
    config: &LocalizerConfig,
) -> Result<DocumentOutline, ScanError> {
    let start_time = std::time::Instant::now();

    let mut candidates: Vec<Candidate> = find_contours::<i32>(edge_map)
        .into_iter()
        .enumerate()
        .filter(|(_, c)| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|(index, c)| {
            let bbox = BoundingBox::from_points(&c.points)?;
            Some(Candidate {
                index,
                area: polygon_area(&c.points),
                bbox,
                points: c.points,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.area
            .total_cmp(&a.area)
            .then(a.bbox.y.cmp(&b.bbox.y))
            .then(a.bbox.x.cmp(&b.bbox.x))
            .then(a.index.cmp(&b.index))
    });

    for (rank, candidate) in candidates.iter().enumerate() {
        if candidate.points.len() < 4 {
            continue;
        }
        let perimeter = closed_perimeter(&candidate.points);
        if perimeter <= 0.0 {
            continue;
        }

        let approx = simplify_closed(approximate_closed_polygon(
            &candidate.points,
            config.epsilon_ratio * perimeter,
        ));

        if let &[a, b, c, d] = approx.as_slice() {
            tracing::debug!(
                target: "omr_pipeline",
                "Document located in {}ms: rank={}, area={:.0}, candidates={}",
                start_time.elapsed().as_millis(),
                rank,
                candidate.area,
                candidates.len()
            );

            return Ok(DocumentOutline {
                vertices: [a.into(), b.into(), c.into(), d.into()],
                contour_area: candidate.area,
                rank,
            });
        }
    }

    tracing::debug!(
        target: "omr_pipeline",
        "No quadrilateral among {} external contours",
        candidates.len()
    );

    Err(ScanError::DocumentNotFound {
        contours_examined: candidates.len(),
    })
}

/// Drops consecutive duplicates and a closing vertex repeating the first.
fn simplify_closed(mut points: Vec<Point<i32>>) -> Vec<Point<i32>> {
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut};
    use imageproc::rect::Rect;

    fn sorted_vertices(outline: &DocumentOutline) -> Vec<(i32, i32)> {
        let mut v: Vec<(i32, i32)> = outline
            .vertices
            .iter()
            .map(|p| (p.x as i32, p.y as i32))
            .collect();
        v.sort();
        v
    }

    #[test]
    fn test_locates_rectangle_outline() {
        let mut edges = GrayImage::new(200, 160);
        draw_hollow_rect_mut(&mut edges, Rect::at(20, 15).of_size(150, 120), Luma([255]));

        let outline = locate_document(&edges, &LocalizerConfig::default())
            .expect("rectangle should be found");

        assert_eq!(
            sorted_vertices(&outline),
            vec![(20, 15), (20, 134), (169, 15), (169, 134)]
        );
        assert_eq!(outline.rank, 0);
    }

    #[test]
    fn test_largest_quadrilateral_wins_over_smaller_one() {
        let mut edges = GrayImage::new(300, 200);
        draw_hollow_rect_mut(&mut edges, Rect::at(10, 10).of_size(60, 40), Luma([255]));
        draw_hollow_rect_mut(&mut edges, Rect::at(100, 30).of_size(150, 120), Luma([255]));

        let outline = locate_document(&edges, &LocalizerConfig::default())
            .expect("rectangle should be found");

        assert_eq!(
            sorted_vertices(&outline),
            vec![(100, 30), (100, 149), (249, 30), (249, 149)]
        );
    }

    #[test]
    fn test_larger_circle_is_skipped_for_quadrilateral() {
        let mut edges = GrayImage::new(320, 200);
        draw_hollow_circle_mut(&mut edges, (90, 100), 80, Luma([255]));
        draw_hollow_rect_mut(&mut edges, Rect::at(200, 60).of_size(80, 60), Luma([255]));

        let outline = locate_document(&edges, &LocalizerConfig::default())
            .expect("rectangle should be found");

        assert_eq!(outline.rank, 1);
        assert_eq!(
            sorted_vertices(&outline),
            vec![(200, 60), (200, 119), (279, 60), (279, 119)]
        );
    }

    #[test]
    fn test_empty_edge_map_is_document_not_found() {
        let edges = GrayImage::new(64, 64);
        let result = locate_document(&edges, &LocalizerConfig::default());
        assert_eq!(
            result,
            Err(ScanError::DocumentNotFound {
                contours_examined: 0
            })
        );
    }

    #[test]
    fn test_only_round_contours_is_document_not_found() {
        let mut edges = GrayImage::new(300, 160);
        draw_hollow_circle_mut(&mut edges, (70, 80), 60, Luma([255]));
        draw_hollow_circle_mut(&mut edges, (220, 80), 50, Luma([255]));

        let result = locate_document(&edges, &LocalizerConfig::default());
        assert!(matches!(
            result,
            Err(ScanError::DocumentNotFound {
                contours_examined: 2
            })
        ));
    }

    #[test]
    fn test_simplify_closed_removes_repeated_start() {
        let points = vec![
            Point::new(0, 0),
            Point::new(5, 0),
            Point::new(5, 0),
            Point::new(5, 5),
            Point::new(0, 0),
        ];
        assert_eq!(
            simplify_closed(points),
            vec![Point::new(0, 0), Point::new(5, 0), Point::new(5, 5)]
        );
    }
}
