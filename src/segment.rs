use image::{imageops, GrayImage};
use log::debug;
use logging_timer::time;

use crate::error::{InterpretError, InterpretResult};
use crate::layout::Layout;
use crate::types::{BoundingBox, QuestionRegion};

/// Pixel offset of the `k`-th of `count` equal slices of `length`. Integer
/// boundaries make adjacent slices share an edge exactly, so the slices tile
/// the span with no gaps or overlaps.
fn slice_boundary(length: u32, count: u32, k: u32) -> u32 {
    (length as u64 * k as u64 / count as u64) as u32
}

/// Partitions a grid of the given size into one region per question.
///
/// The grid width is split into `sections` bands and each band into
/// `rows_per_section` strips. Regions are returned in reading order,
/// section by section and top to bottom, with 1-based indices.
#[time]
pub fn segment_questions(
    grid_width: u32,
    grid_height: u32,
    layout: &Layout,
) -> InterpretResult<Vec<QuestionRegion>> {
    layout.validate()?;

    if grid_width < layout.sections || grid_height < layout.rows_per_section {
        return Err(InterpretError::GridTooSmall {
            width: grid_width,
            height: grid_height,
            sections: layout.sections,
            rows_per_section: layout.rows_per_section,
        });
    }

    let mut regions = Vec::with_capacity(layout.number_of_questions as usize);
    for section in 0..layout.sections {
        let band = layout
            .reading_direction
            .physical_slot(section, layout.sections);
        let left = slice_boundary(grid_width, layout.sections, band);
        let right = slice_boundary(grid_width, layout.sections, band + 1);

        for row in 0..layout.rows_per_section {
            let top = slice_boundary(grid_height, layout.rows_per_section, row);
            let bottom = slice_boundary(grid_height, layout.rows_per_section, row + 1);
            regions.push(QuestionRegion {
                index: section * layout.rows_per_section + row + 1,
                bounding_box: BoundingBox::new(left, top, right - left, bottom - top),
            });
        }
    }

    debug!(
        "segmented {}x{} grid into {} regions",
        grid_width,
        grid_height,
        regions.len()
    );

    Ok(regions)
}

/// Copies a region out of the grid image.
pub fn region_image(grid: &GrayImage, region: &QuestionRegion) -> GrayImage {
    let bbox = region.bounding_box;
    imageops::crop_imm(grid, bbox.x, bbox.y, bbox.width, bbox.height).to_image()
}

/// Checks that `regions` is exactly one region per question.
pub fn check_region_count(regions: &[QuestionRegion], layout: &Layout) -> InterpretResult<()> {
    if regions.len() != layout.number_of_questions as usize {
        return Err(InterpretError::RegionCountMismatch {
            found: regions.len(),
            expected: layout.number_of_questions as usize,
        });
    }
    Ok(())
}
