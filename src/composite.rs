use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_cross_mut, draw_filled_circle_mut, draw_hollow_circle_mut, draw_hollow_rect_mut,
};
use imageproc::rect::Rect;
use logging_timer::time;

use crate::image_utils::{BLUE, DARK_GRAY, GRAY, GREEN, RED, YELLOW};
use crate::score::EvaluationResult;
use crate::types::{OptionMark, PointF, QuestionRegion, QuestionResult};

/// Radius used for positions where no bubble was detected.
const FALLBACK_RADIUS: f32 = 8.0;

/// Rings drawn around a detected mark so it stands out from the print.
const MARK_RING_WIDTH: i32 = 3;

/// Creates the path of the composed image for an input photo.
pub fn annotated_image_path(base: &Path) -> PathBuf {
    let mut result = PathBuf::from(base);
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sheet".to_string());
    result.set_file_name(format!("{}_annotated.png", stem));
    result
}

fn mark_center_and_radius(mark: &OptionMark) -> (PointF, f32) {
    match mark.candidate {
        Some(candidate) => (candidate.centroid, candidate.radius),
        None => (mark.expected_center, FALLBACK_RADIUS),
    }
}

fn draw_ring_mut(canvas: &mut RgbImage, center: PointF, radius: f32, width: i32, color: Rgb<u8>) {
    let center = (center.x.round() as i32, center.y.round() as i32);
    let radius = radius.round() as i32;
    for offset in 0..width {
        draw_hollow_circle_mut(canvas, center, radius + offset, color);
    }
}

/// Color of one option position.
///
/// With an evaluation: a marked correct option is green, a marked incorrect
/// option red, the unmarked correct option is outlined in green, and the rest
/// are gray. Without one: marked is blue, unmarked gray.
fn option_color(mark: &OptionMark, correct: Option<u32>) -> (Rgb<u8>, bool) {
    match (correct, mark.filled) {
        (Some(correct), true) if correct == mark.option => (GREEN, true),
        (Some(_), true) => (RED, true),
        (Some(correct), false) if correct == mark.option => (GREEN, false),
        (None, true) => (BLUE, true),
        (_, false) => (GRAY, false),
    }
}

/// Draws question outlines, option positions, and rejected areas on a copy of
/// the cropped grid. The input image is left untouched.
#[time]
pub fn compose_annotated_image(
    grid: &RgbImage,
    regions: &[QuestionRegion],
    results: &[QuestionResult],
    evaluation: Option<&EvaluationResult>,
) -> RgbImage {
    let mut canvas = grid.clone();

    for region in regions {
        draw_hollow_rect_mut(&mut canvas, region.bounding_box.to_rect(), DARK_GRAY);
    }

    for result in results {
        let correct = evaluation
            .and_then(|e| e.for_question(result.index))
            .map(|e| e.correct);

        for mark in &result.marks {
            let (center, radius) = mark_center_and_radius(mark);
            let (color, emphasized) = option_color(mark, correct);
            if emphasized {
                draw_ring_mut(&mut canvas, center, radius + 2.0, MARK_RING_WIDTH, color);
                draw_filled_circle_mut(
                    &mut canvas,
                    (center.x.round() as i32, center.y.round() as i32),
                    (radius / 3.0).round().max(1.0) as i32,
                    color,
                );
            } else if color == GREEN {
                let size = (2.0 * (radius + 4.0)).round() as u32;
                draw_hollow_rect_mut(
                    &mut canvas,
                    Rect::at(
                        (center.x - radius - 4.0).round() as i32,
                        (center.y - radius - 4.0).round() as i32,
                    )
                    .of_size(size.max(1), size.max(1)),
                    color,
                );
            } else {
                draw_ring_mut(&mut canvas, center, radius + 2.0, 1, color);
            }
        }

        for rejected in &result.rejected_areas {
            draw_cross_mut(
                &mut canvas,
                YELLOW,
                rejected.center.x.round() as i32,
                rejected.center.y.round() as i32,
            );
        }
    }

    canvas
}
