//! # Perspective Rectifier
//!
//! Maps the located document quadrilateral onto an axis-aligned rectangle so
//! the answer grid can be read in sheet coordinates.

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use tracing;

use super::geometry::{Point2D, Quadrilateral};
use crate::scan_config::RectifierConfig;
use crate::scan_errors::ScanError;

/// A top-down view of the document.
#[derive(Debug, Clone)]
pub struct RectifiedImage {
    pub image: GrayImage,
    /// Source corners in canonical order
    pub quadrilateral: Quadrilateral,
    pub width: u32,
    pub height: u32,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Output canvas size for `quad`: the longer of each pair of opposite sides,
/// floored to whole pixels.
pub fn target_dimensions(quad: &Quadrilateral) -> (u32, u32) {
    let width_bottom = quad.bottom_right().distance(&quad.bottom_left());
    let width_top = quad.top_right().distance(&quad.top_left());
    let height_right = quad.top_right().distance(&quad.bottom_right());
    let height_left = quad.top_left().distance(&quad.bottom_left());

    (
        width_bottom.max(width_top).floor() as u32,
        height_right.max(height_left).floor() as u32,
    )
}

/// Warps the region bounded by `corners` into a `width` x `height` image.
///
/// `corners` may arrive in any order. Output pixels are sampled bilinearly
/// through the inverse mapping; samples falling outside the source are black.
///
/// # Errors
///
/// Returns `ScanError::DegenerateGeometry` when two corners coincide, the
/// quadrilateral is too flat, the output would be narrower than
/// `min_side`, or no projective mapping exists.
///
/// # Examples
///
/// ```
/// use answer_sheet_scanner::omr::{rectify, Point2D};
/// use answer_sheet_scanner::scan_config::RectifierConfig;
/// use image::{GrayImage, Luma};
///
/// let img = GrayImage::from_pixel(120, 100, Luma([180]));
/// let corners = [
///     Point2D::new(90.0, 10.0),
///     Point2D::new(10.0, 10.0),
///     Point2D::new(10.0, 70.0),
///     Point2D::new(90.0, 70.0),
/// ];
/// let rectified = rectify(&img, corners, &RectifierConfig::default()).unwrap();
/// assert_eq!((rectified.width, rectified.height), (80, 60));
/// ```
pub fn rectify(
    gray: &GrayImage,
    corners: [Point2D; 4],
    config: &RectifierConfig,
) -> Result<RectifiedImage, ScanError> {
    let start_time = std::time::Instant::now();

    let quad = Quadrilateral::from_unordered(corners);
    check_geometry(&quad, config)?;

    let (width, height) = target_dimensions(&quad);
    if width < config.min_side || height < config.min_side {
        return Err(ScanError::DegenerateGeometry(format!(
            "target size {}x{} is below the {}px minimum",
            width, height, config.min_side
        )));
    }

    let (max_x, max_y) = ((width - 1) as f32, (height - 1) as f32);
    let source = quad.corners().map(|p| (p.x, p.y));
    let destination = [(0.0, 0.0), (max_x, 0.0), (max_x, max_y), (0.0, max_y)];

    let projection = Projection::from_control_points(source, destination).ok_or_else(|| {
        ScanError::DegenerateGeometry("no projective mapping for the corners".to_string())
    })?;

    let mut image = GrayImage::new(width, height);
    warp_into(
        gray,
        &projection,
        Interpolation::Bilinear,
        Luma([0u8]),
        &mut image,
    );

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "omr_pipeline",
        "Document rectified in {}ms: {}x{} from corners {:?}",
        processing_time.as_millis(),
        width,
        height,
        source
    );

    Ok(RectifiedImage {
        image,
        quadrilateral: quad,
        width,
        height,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

fn check_geometry(quad: &Quadrilateral, config: &RectifierConfig) -> Result<(), ScanError> {
    if !quad.has_distinct_corners() {
        return Err(ScanError::DegenerateGeometry(
            "corners do not form four distinct vertices".to_string(),
        ));
    }

    let perimeter = quad.perimeter();
    let compactness = if perimeter > 0.0 {
        quad.area() / (perimeter * perimeter)
    } else {
        0.0
    };
    if compactness < config.min_area_ratio {
        return Err(ScanError::DegenerateGeometry(format!(
            "quadrilateral is nearly collinear (area/perimeter² = {:.2e})",
            compactness
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn square_corners() -> [Point2D; 4] {
        [
            Point2D::new(250.0, 190.0),
            Point2D::new(50.0, 40.0),
            Point2D::new(50.0, 190.0),
            Point2D::new(250.0, 40.0),
        ]
    }

    #[test]
    fn test_rectified_size_matches_document() {
        let mut canvas = GrayImage::new(400, 300);
        draw_filled_rect_mut(&mut canvas, Rect::at(50, 40).of_size(201, 151), Luma([200]));

        let rectified = rectify(&canvas, square_corners(), &RectifierConfig::default())
            .expect("rectangle should rectify");

        assert!((rectified.width as i32 - 200).abs() <= 1);
        assert!((rectified.height as i32 - 150).abs() <= 1);
        assert_eq!(rectified.image.dimensions(), (rectified.width, rectified.height));
        assert_eq!(rectified.image.get_pixel(100, 75)[0], 200);
    }

    #[test]
    fn test_rectification_preserves_orientation() {
        let mut canvas = GrayImage::new(400, 300);
        draw_filled_rect_mut(&mut canvas, Rect::at(50, 40).of_size(201, 151), Luma([200]));
        draw_filled_rect_mut(&mut canvas, Rect::at(60, 50).of_size(20, 20), Luma([40]));

        let rectified = rectify(&canvas, square_corners(), &RectifierConfig::default())
            .expect("rectangle should rectify");

        assert_eq!(rectified.image.get_pixel(15, 15)[0], 40);
        assert_eq!(rectified.image.get_pixel(180, 130)[0], 200);
        assert_eq!(
            rectified.quadrilateral.top_left(),
            Point2D::new(50.0, 40.0)
        );
    }

    #[test]
    fn test_target_dimensions_use_longer_sides() {
        let quad = Quadrilateral::from_unordered([
            Point2D::new(0.0, 0.0),
            Point2D::new(100.0, 0.0),
            Point2D::new(90.0, 60.5),
            Point2D::new(10.0, 60.5),
        ]);
        let (width, height) = target_dimensions(&quad);
        assert_eq!(width, 100);
        assert_eq!(height, 61); // sqrt(10² + 60.5²) = 61.32
    }

    #[test]
    fn test_collinear_corners_are_degenerate() {
        let img = GrayImage::new(50, 50);
        let corners = [
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(20.0, 20.0),
            Point2D::new(30.0, 30.0),
        ];
        let result = rectify(&img, corners, &RectifierConfig::default());
        assert!(matches!(result, Err(ScanError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_sliver_is_degenerate() {
        let img = GrayImage::new(120, 20);
        let corners = [
            Point2D::new(0.0, 0.0),
            Point2D::new(100.0, 0.0),
            Point2D::new(100.0, 1.0),
            Point2D::new(0.0, 1.0),
        ];
        let result = rectify(&img, corners, &RectifierConfig::default());
        assert!(matches!(result, Err(ScanError::DegenerateGeometry(_))));
    }
}
