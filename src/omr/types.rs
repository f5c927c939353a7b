//! # Shared Types for Answer Sheet Recognition
//!
//! Every value here is created once per scan and never mutated afterwards.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use serde::Serialize;

use super::geometry::{BoundingBox, Point2D};

/// The four raw vertices accepted as the document boundary, in the order the
/// polygon approximation produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOutline {
    pub vertices: [Point2D; 4],
    /// Enclosed area of the source contour in pixels
    pub contour_area: f64,
    /// Position of the accepted contour in area-descending order
    pub rank: usize,
}

/// A bubble candidate: bounding box, contour and filled membership mask.
#[derive(Debug, Clone)]
pub struct Region {
    bbox: BoundingBox,
    contour: Vec<Point<i32>>,
    /// Mask local to `bbox` (255 = member)
    mask: GrayImage,
}

impl Region {
    /// Builds a region from a closed contour; the mask is the filled polygon.
    /// Returns `None` for an empty contour or one with negative coordinates.
    pub fn from_contour(contour: Vec<Point<i32>>) -> Option<Self> {
        let bbox = BoundingBox::from_points(&contour)?;
        let (ox, oy) = (bbox.x as i32, bbox.y as i32);

        let mut local: Vec<Point<i32>> = contour
            .iter()
            .map(|p| Point::new(p.x - ox, p.y - oy))
            .collect();

        let mut mask = GrayImage::new(bbox.width, bbox.height);
        for p in &local {
            mask.put_pixel(p.x as u32, p.y as u32, Luma([255]));
        }

        // The polygon fill rejects a closing point equal to the first one
        while local.len() > 1 && local.first() == local.last() {
            local.pop();
        }
        if local.len() >= 3 {
            draw_polygon_mut(&mut mask, &local, Luma([255]));
        }

        Some(Self {
            bbox,
            contour,
            mask,
        })
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn contour(&self) -> &[Point<i32>] {
        &self.contour
    }

    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    pub fn center(&self) -> Point2D {
        self.bbox.center()
    }

    /// Number of pixels covered by the mask.
    pub fn area(&self) -> u32 {
        self.mask.pixels().filter(|p| p[0] > 0).count() as u32
    }

    /// Whether the sheet pixel `(x, y)` belongs to this region.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        if x < self.bbox.x || y < self.bbox.y {
            return false;
        }
        self.mask
            .get_pixel_checked(x - self.bbox.x, y - self.bbox.y)
            .is_some_and(|p| p[0] > 0)
    }

    /// Counts foreground pixels of `binary` that fall inside the mask.
    pub fn count_foreground(&self, binary: &GrayImage) -> u32 {
        self.mask
            .enumerate_pixels()
            .filter(|(_, _, m)| m[0] > 0)
            .filter(|(lx, ly, _)| {
                binary
                    .get_pixel_checked(self.bbox.x + lx, self.bbox.y + ly)
                    .is_some_and(|p| p[0] > 0)
            })
            .count() as u32
    }
}

/// One question: its bubbles ordered left to right.
#[derive(Debug, Clone)]
pub struct BubbleRow {
    /// 0-based question index, top to bottom
    pub question: usize,
    pub bubbles: Vec<Region>,
}

/// The reading of one question row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowReading {
    pub question: usize,
    /// 0-based index of the most-filled bubble
    pub selected: usize,
    /// Foreground pixel count of every bubble, left to right
    pub fill_counts: Vec<u32>,
}

impl RowReading {
    /// No bubble in the row carries any foreground.
    pub fn is_blank(&self) -> bool {
        self.fill_counts.iter().all(|&c| c == 0)
    }

    /// Another bubble is filled as much as the selected one.
    pub fn is_tied(&self) -> bool {
        let best = self.fill_counts.get(self.selected).copied().unwrap_or(0);
        self.fill_counts
            .iter()
            .enumerate()
            .any(|(i, &c)| i != self.selected && c == best)
    }
}

/// Selected option per question, in question order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnswerResult {
    pub rows: Vec<RowReading>,
}

impl AnswerResult {
    /// Plain sequence of selected option indices.
    pub fn selections(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.selected).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
