//! # Sheet Annotation
//!
//! Renders the detected grid and selections on top of the rectified sheet,
//! for visual checking of a scan.

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use super::geometry::BoundingBox;
use super::grading::AnswerKey;
use super::types::{AnswerResult, BubbleRow};

/// Outline of every detected bubble
const BUBBLE_COLOR: Rgb<u8> = Rgb([70, 130, 220]);
/// Selected bubble that is correct, or any selection when no key is given
const SELECTED_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
/// Selected bubble that disagrees with the key
const WRONG_COLOR: Rgb<u8> = Rgb([230, 0, 0]);
/// Expected bubble of a wrongly answered question
const EXPECTED_COLOR: Rgb<u8> = Rgb([255, 170, 0]);

const BUBBLE_THICKNESS: i32 = 1;
const MARK_THICKNESS: i32 = 3;

/// Draws bubble outlines and the selected option of every row.
///
/// With a key, wrong selections are drawn in red and the expected bubble is
/// outlined as well. Rows beyond the end of `answers` or `key` are left with
/// their plain outline.
pub fn render_overlay(
    sheet: &GrayImage,
    rows: &[BubbleRow],
    answers: &AnswerResult,
    key: Option<&AnswerKey>,
) -> RgbImage {
    let mut canvas = DynamicImage::ImageLuma8(sheet.clone()).to_rgb8();

    for row in rows {
        for bubble in &row.bubbles {
            draw_box(&mut canvas, bubble.bbox(), BUBBLE_THICKNESS, BUBBLE_COLOR);
        }

        let Some(reading) = answers.rows.get(row.question) else {
            continue;
        };
        let Some(selected) = row.bubbles.get(reading.selected) else {
            continue;
        };

        match key.and_then(|k| k.answers().get(row.question).copied()) {
            Some(expected) if expected != reading.selected => {
                draw_box(&mut canvas, selected.bbox(), MARK_THICKNESS, WRONG_COLOR);
                if let Some(bubble) = row.bubbles.get(expected) {
                    draw_box(&mut canvas, bubble.bbox(), MARK_THICKNESS, EXPECTED_COLOR);
                }
            }
            _ => draw_box(&mut canvas, selected.bbox(), MARK_THICKNESS, SELECTED_COLOR),
        }
    }

    canvas
}

/// Draws a rectangle `thickness` pixels wide growing outward from `bbox`.
fn draw_box(img: &mut RgbImage, bbox: BoundingBox, thickness: i32, color: Rgb<u8>) {
    for t in 0..thickness {
        let rect = Rect::at(bbox.x as i32 - t, bbox.y as i32 - t)
            .of_size(bbox.width + 2 * t as u32, bbox.height + 2 * t as u32);
        draw_hollow_rect_mut(img, rect, color);
    }
}
