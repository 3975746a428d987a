//! Synthetic answer sheets for tests.

use image::{DynamicImage, GrayImage, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::geometry::evenly_spaced_centers;
use crate::image_utils::{BLACK, WHITE};
use crate::layout::Layout;
use crate::segment::segment_questions;
use crate::types::BoundingBox;

pub const BUBBLE_RADIUS: i32 = 12;
pub const RING_WIDTH: i32 = 2;
pub const BAND_WIDTH: u32 = 200;
pub const ROW_HEIGHT: u32 = 60;
pub const PAGE_MARGIN: u32 = 50;
pub const FRAME_THICKNESS: u32 = 3;

/// Draws a row of printed rings across `bbox`, filling the given physical
/// slots (counted from the left).
pub fn draw_bubbles_in(image: &mut GrayImage, bbox: BoundingBox, options: u32, filled: &[u32]) {
    let xs = evenly_spaced_centers(bbox.x as f32, bbox.width as f32, options);
    let y = (bbox.y as f32 + bbox.height as f32 / 2.0).round() as i32;
    for (slot, x) in xs.into_iter().enumerate() {
        let center = (x.round() as i32, y);
        draw_filled_circle_mut(image, center, BUBBLE_RADIUS, BLACK);
        if !filled.contains(&(slot as u32)) {
            draw_filled_circle_mut(image, center, BUBBLE_RADIUS - RING_WIDTH, WHITE);
        }
    }
}

/// Draws a row of bubbles spanning the whole image.
pub fn draw_question_row(image: &mut GrayImage, options: u32, filled: &[u32]) {
    let bbox = BoundingBox::new(0, 0, image.width(), image.height());
    draw_bubbles_in(image, bbox, options, filled);
}

pub fn filled_bubble_row(width: u32, height: u32, options: u32, filled: &[u32]) -> GrayImage {
    let mut image = GrayImage::from_pixel(width, height, WHITE);
    draw_question_row(&mut image, options, filled);
    image
}

/// Renders a framed answer sheet on a white page. `answers[i]` holds the
/// options (in reading order) marked for question `i + 1`.
pub fn synthetic_sheet(layout: &Layout, answers: &[Vec<u32>]) -> RgbImage {
    let grid_width = layout.sections * BAND_WIDTH;
    let grid_height = layout.rows_per_section * ROW_HEIGHT;
    let mut page = GrayImage::from_pixel(
        grid_width + 2 * PAGE_MARGIN,
        grid_height + 2 * PAGE_MARGIN,
        WHITE,
    );

    for inset in 0..FRAME_THICKNESS {
        draw_hollow_rect_mut(
            &mut page,
            Rect::at((PAGE_MARGIN + inset) as i32, (PAGE_MARGIN + inset) as i32)
                .of_size(grid_width - 2 * inset, grid_height - 2 * inset),
            BLACK,
        );
    }

    let regions = segment_questions(grid_width, grid_height, layout)
        .expect("synthetic layout is valid");
    for region in regions {
        let marked = answers
            .get(region.index as usize - 1)
            .cloned()
            .unwrap_or_default();
        let physical = marked
            .iter()
            .map(|&option| {
                layout
                    .reading_direction
                    .physical_slot(option, layout.options_per_question)
            })
            .collect::<Vec<u32>>();
        let bbox = BoundingBox::new(
            region.bounding_box.x + PAGE_MARGIN,
            region.bounding_box.y + PAGE_MARGIN,
            region.bounding_box.width,
            region.bounding_box.height,
        );
        draw_bubbles_in(&mut page, bbox, layout.options_per_question, &physical);
    }

    DynamicImage::ImageLuma8(page).into_rgb8()
}

/// One single-answer row per question, cycling through the options.
pub fn cycling_answers(layout: &Layout) -> Vec<Vec<u32>> {
    (0..layout.number_of_questions)
        .map(|q| vec![q % layout.options_per_question])
        .collect()
}
