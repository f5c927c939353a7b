//! # Planar Geometry
//!
//! Points, bounding boxes and the canonically ordered document quadrilateral.

use imageproc::point::Point;
use serde::Serialize;
use std::cmp::Ordering;

/// A floating-point image coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point2D) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<Point<i32>> for Point2D {
    fn from(point: Point<i32>) -> Self {
        Self::new(point.x as f32, point.y as f32)
    }
}

impl From<(f32, f32)> for Point2D {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// Axis-aligned bounding box with inclusive pixel extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest box covering every point; `None` for an empty slice or
    /// points with negative coordinates.
    pub fn from_points(points: &[Point<i32>]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if min_x < 0 || min_y < 0 {
            return None;
        }

        Some(Self::new(
            min_x as u32,
            min_y as u32,
            (max_x - min_x + 1) as u32,
            (max_y - min_y + 1) as u32,
        ))
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(
            self.x as f32 + (self.width as f32 - 1.0) / 2.0,
            self.y as f32 + (self.height as f32 - 1.0) / 2.0,
        )
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Absolute shoelace area of a closed polygon given by integer vertices.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let doubled: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64)
        .sum();
    doubled.abs() / 2.0
}

/// Length of the closed polyline through `points`.
pub fn closed_perimeter(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| point_distance(a, b))
        .sum()
}

fn point_distance(a: &Point<i32>, b: &Point<i32>) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Distance from `point` to the infinite line through `start` and `end`,
/// or to `start` itself when both ends coincide.
fn point_to_line_distance(point: &Point<i32>, start: &Point<i32>, end: &Point<i32>) -> f64 {
    let a = (end.y - start.y) as f64;
    let b = (start.x - end.x) as f64;
    let c = end.x as f64 * start.y as f64 - start.x as f64 * end.y as f64;

    let denominator = (a * a + b * b).sqrt();
    if denominator == 0.0 {
        return point_distance(point, start);
    }

    (a * point.x as f64 + b * point.y as f64 + c).abs() / denominator
}

/// Douglas-Peucker simplification of an open polyline. Both end points are kept.
fn douglas_peucker(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut stack = vec![(0, last)];
    while let Some((start, end)) = stack.pop() {
        if end - start <= 1 {
            continue;
        }

        let mut max_dist = 0.0;
        let mut max_index = start;
        for i in (start + 1)..end {
            let dist = point_to_line_distance(&points[i], &points[start], &points[end]);
            if dist > max_dist {
                max_dist = dist;
                max_index = i;
            }
        }

        if max_dist > epsilon {
            keep[max_index] = true;
            stack.push((start, max_index));
            stack.push((max_index, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Douglas-Peucker simplification of a closed contour.
///
/// The contour is split at its first point and the point farthest from it;
/// each half is simplified on its own and the halves are joined again. The
/// result lists every vertex once, without repeating the first one at the end.
pub fn approximate_closed_polygon(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let Some(origin) = points.first() else {
        return Vec::new();
    };
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut far = 0;
    let mut far_dist = 0.0;
    for (i, p) in points.iter().enumerate().skip(1) {
        let dist = point_distance(origin, p);
        if dist > far_dist {
            far_dist = dist;
            far = i;
        }
    }
    if far == 0 {
        return vec![*origin];
    }

    let mut returning: Vec<Point<i32>> = points[far..].to_vec();
    returning.push(*origin);

    let mut result = douglas_peucker(&points[..=far], epsilon);
    let back = douglas_peucker(&returning, epsilon);
    // Skip the shared far point and the closing origin
    result.extend_from_slice(&back[1..back.len() - 1]);
    result
}

/// Document corners in canonical order.
///
/// The only constructor is [`Quadrilateral::from_unordered`], so a value of
/// this type is always ordered top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quadrilateral {
    top_left: Point2D,
    top_right: Point2D,
    bottom_right: Point2D,
    bottom_left: Point2D,
}

impl Quadrilateral {
    /// Orders four points of arbitrary order.
    ///
    /// Top-left has the smallest `x + y`, bottom-right the largest; top-right
    /// has the smallest `y - x`, bottom-left the largest. Ties fall back to
    /// `(x, y)` so the result depends only on the point set, never on the
    /// order the points arrive in.
    pub fn from_unordered(points: [Point2D; 4]) -> Self {
        let by_key = |key: fn(&Point2D) -> f32| {
            move |a: &&Point2D, b: &&Point2D| -> Ordering {
                key(a)
                    .total_cmp(&key(b))
                    .then(a.x.total_cmp(&b.x))
                    .then(a.y.total_cmp(&b.y))
            }
        };
        let sum = |p: &Point2D| p.x + p.y;
        let diff = |p: &Point2D| p.y - p.x;

        // Iterators over a non-empty array always yield an extremum
        let pick = |ordering: Option<&Point2D>| ordering.copied().unwrap_or(points[0]);

        Self {
            top_left: pick(points.iter().min_by(by_key(sum))),
            bottom_right: pick(points.iter().max_by(by_key(sum))),
            top_right: pick(points.iter().min_by(by_key(diff))),
            bottom_left: pick(points.iter().max_by(by_key(diff))),
        }
    }

    pub fn top_left(&self) -> Point2D {
        self.top_left
    }

    pub fn top_right(&self) -> Point2D {
        self.top_right
    }

    pub fn bottom_right(&self) -> Point2D {
        self.bottom_right
    }

    pub fn bottom_left(&self) -> Point2D {
        self.bottom_left
    }

    /// Corners as `[top_left, top_right, bottom_right, bottom_left]`.
    pub fn corners(&self) -> [Point2D; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// False when two roles were assigned the same point (collinear or repeated input).
    pub fn has_distinct_corners(&self) -> bool {
        let corners = self.corners();
        (0..4).all(|i| ((i + 1)..4).all(|j| corners[i] != corners[j]))
    }

    pub fn area(&self) -> f64 {
        let corners = self.corners();
        let doubled: f64 = (0..4)
            .map(|i| {
                let (a, b) = (corners[i], corners[(i + 1) % 4]);
                a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64
            })
            .sum();
        doubled.abs() / 2.0
    }

    pub fn perimeter(&self) -> f64 {
        let corners = self.corners();
        (0..4)
            .map(|i| corners[i].distance(&corners[(i + 1) % 4]) as f64)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permutations(points: [Point2D; 4]) -> Vec<[Point2D; 4]> {
        let mut result = Vec::new();
        for a in 0..4 {
            for b in 0..4 {
                for c in 0..4 {
                    for d in 0..4 {
                        let idx = [a, b, c, d];
                        let distinct = (0..4).all(|i| ((i + 1)..4).all(|j| idx[i] != idx[j]));
                        if distinct {
                            result.push([points[a], points[b], points[c], points[d]]);
                        }
                    }
                }
            }
        }
        result
    }

    #[test]
    fn test_ordering_of_skewed_document() {
        let quad = Quadrilateral::from_unordered([
            Point2D::new(410.0, 380.0),
            Point2D::new(40.0, 30.0),
            Point2D::new(60.0, 420.0),
            Point2D::new(390.0, 50.0),
        ]);

        assert_eq!(quad.top_left(), Point2D::new(40.0, 30.0));
        assert_eq!(quad.top_right(), Point2D::new(390.0, 50.0));
        assert_eq!(quad.bottom_right(), Point2D::new(410.0, 380.0));
        assert_eq!(quad.bottom_left(), Point2D::new(60.0, 420.0));
        assert!(quad.has_distinct_corners());
    }

    #[test]
    fn test_ordering_is_invariant_under_all_permutations() {
        let sets = [
            [
                Point2D::new(12.5, 8.0),
                Point2D::new(301.0, 22.0),
                Point2D::new(288.0, 410.5),
                Point2D::new(3.0, 395.0),
            ],
            // Diamond: sums and differences tie pairwise
            [
                Point2D::new(0.0, 5.0),
                Point2D::new(5.0, 0.0),
                Point2D::new(10.0, 5.0),
                Point2D::new(5.0, 10.0),
            ],
        ];

        for set in sets {
            let all = permutations(set);
            assert_eq!(all.len(), 24);
            let expected = Quadrilateral::from_unordered(set);
            for permuted in all {
                assert_eq!(Quadrilateral::from_unordered(permuted), expected);
            }
        }
    }

    #[test]
    fn test_collinear_points_do_not_form_distinct_corners() {
        let quad = Quadrilateral::from_unordered([
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(20.0, 20.0),
            Point2D::new(30.0, 30.0),
        ]);
        assert!(!quad.has_distinct_corners());
        assert_eq!(quad.area(), 0.0);
    }

    #[test]
    fn test_area_and_perimeter_of_rectangle() {
        let quad = Quadrilateral::from_unordered([
            Point2D::new(0.0, 0.0),
            Point2D::new(20.0, 0.0),
            Point2D::new(20.0, 10.0),
            Point2D::new(0.0, 10.0),
        ]);
        assert_eq!(quad.area(), 200.0);
        assert_eq!(quad.perimeter(), 60.0);
    }

    #[test]
    fn test_bounding_box_is_inclusive() {
        let points = [Point::new(3, 4), Point::new(7, 4), Point::new(5, 9)];
        let bbox = BoundingBox::from_points(&points).expect("non-empty points");
        assert_eq!(bbox, BoundingBox::new(3, 4, 5, 6));
        assert_eq!(bbox.center(), Point2D::new(5.0, 6.5));
        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_polygon_area_ignores_winding() {
        let clockwise = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 5),
            Point::new(0, 5),
        ];
        let mut counter_clockwise = clockwise;
        counter_clockwise.reverse();

        assert_eq!(polygon_area(&clockwise), 50.0);
        assert_eq!(polygon_area(&counter_clockwise), 50.0);
        assert_eq!(polygon_area(&clockwise[..2]), 0.0);
    }

    fn rectangle_outline(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Point<i32>> {
        let mut points = Vec::new();
        for x in x0..x1 {
            points.push(Point::new(x, y0));
        }
        for y in y0..y1 {
            points.push(Point::new(x1, y));
        }
        for x in (x0 + 1..=x1).rev() {
            points.push(Point::new(x, y1));
        }
        for y in (y0 + 1..=y1).rev() {
            points.push(Point::new(x0, y));
        }
        points
    }

    #[test]
    fn test_closed_perimeter_of_rectangle_outline() {
        let outline = rectangle_outline(0, 0, 10, 4);
        assert_eq!(closed_perimeter(&outline), 28.0);
        assert_eq!(closed_perimeter(&outline[..1]), 0.0);
    }

    #[test]
    fn test_closed_approximation_keeps_rectangle_corners() {
        let outline = rectangle_outline(5, 5, 60, 40);
        let epsilon = 0.02 * closed_perimeter(&outline);

        let mut approx = approximate_closed_polygon(&outline, epsilon);
        approx.sort_by_key(|p| (p.x, p.y));

        assert_eq!(
            approx,
            vec![
                Point::new(5, 5),
                Point::new(5, 40),
                Point::new(60, 5),
                Point::new(60, 40)
            ]
        );
    }

    #[test]
    fn test_closed_approximation_of_short_inputs() {
        assert!(approximate_closed_polygon(&[], 1.0).is_empty());
        let pair = [Point::new(0, 0), Point::new(3, 3)];
        assert_eq!(approximate_closed_polygon(&pair, 1.0), pair.to_vec());
        let same = [Point::new(2, 2); 4];
        assert_eq!(approximate_closed_polygon(&same, 1.0), vec![Point::new(2, 2)]);
    }
}
