use std::cmp::Ordering;

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::geometry::arc_length;
use log::debug;
use logging_timer::time;

use crate::config::ClassifierConfig;
use crate::geometry::{
    circularity, distance_from_point_to_point, evenly_spaced_centers, point_bounds, polygon_area,
};
use crate::image_utils::{circle_fill_ratio, dark_level, ink_mask, intensity_range};
use crate::layout::ReadingDirection;
use crate::types::{BubbleCandidate, OptionMark, PointF, QuestionRegion, RejectedArea, RejectionReason};

/// Shape measurements of one traced contour, in region-local pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeMeasurements {
    pub area: f32,
    pub perimeter: f32,
    pub circularity: f32,
    pub aspect_ratio: f32,
    pub center: PointF,
    pub radius: f32,
}

/// Output of classifying one question region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionClassification {
    /// Every contour that passed the shape filters, before position
    /// assignment.
    pub candidates: Vec<BubbleCandidate>,
    pub rejected: Vec<RejectedArea>,
    /// One entry per option, in option order.
    pub marks: Vec<OptionMark>,
}

impl RegionClassification {
    pub fn bubbles_detected(&self) -> u32 {
        self.marks.iter().filter(|m| m.candidate.is_some()).count() as u32
    }

    /// Options whose bubble is filled.
    pub fn filled_options(&self) -> Vec<u32> {
        self.marks
            .iter()
            .filter(|m| m.filled)
            .map(|m| m.option)
            .collect()
    }
}

/// Decides whether a contour with these measurements can be a bubble.
///
/// Checks run in a fixed order: size, then shape, then contrast, and the
/// first failing check names the rejection.
pub fn shape_verdict(
    area: f32,
    circularity: f32,
    aspect_ratio: f32,
    low_contrast: bool,
    config: &ClassifierConfig,
) -> Result<(), RejectionReason> {
    if area < config.min_area {
        return Err(RejectionReason::TooSmall);
    }
    if area > config.max_area {
        return Err(RejectionReason::TooLarge);
    }
    if circularity < config.min_circularity || aspect_ratio > config.max_aspect_ratio {
        return Err(RejectionReason::NotCircular);
    }
    if low_contrast {
        return Err(RejectionReason::LowContrast);
    }
    Ok(())
}

/// A bubble at or above the fill threshold is filled.
pub fn is_filled(fill_ratio: f32, config: &ClassifierConfig) -> bool {
    fill_ratio >= config.fill_threshold
}

fn measure_contour(contour: &Contour<i32>) -> Option<ShapeMeasurements> {
    let (min_x, min_y, max_x, max_y) = point_bounds(&contour.points)?;
    let area = polygon_area(&contour.points);
    let perimeter = arc_length(&contour.points, true) as f32;

    let width = (max_x - min_x + 1) as f32;
    let height = (max_y - min_y + 1) as f32;
    let aspect_ratio = width.max(height) / width.min(height);

    Some(ShapeMeasurements {
        area,
        perimeter,
        circularity: circularity(area, perimeter),
        aspect_ratio,
        center: PointF::new((min_x + max_x) as f32 / 2.0, (min_y + max_y) as f32 / 2.0),
        radius: ((max_x - min_x) + (max_y - min_y)) as f32 / 4.0,
    })
}

/// True when any enclosing outer border is itself bubble-sized, e.g. a
/// pencil mark inside a printed ring. Such contours belong to the enclosing
/// bubble and are measured through its fill ratio.
fn is_nested_in_bubble(
    contours: &[Contour<i32>],
    areas: &[f32],
    index: usize,
    config: &ClassifierConfig,
) -> bool {
    let mut parent = contours[index].parent;
    while let Some(p) = parent {
        if contours[p].border_type == BorderType::Outer
            && areas[p] >= config.min_area
            && areas[p] <= config.max_area
        {
            return true;
        }
        parent = contours[p].parent;
    }
    false
}

/// Expected option centers in region-local pixels, in option order.
pub fn expected_positions(
    width: u32,
    height: u32,
    options_per_question: u32,
    direction: ReadingDirection,
) -> Vec<PointF> {
    let slots = evenly_spaced_centers(0.0, width as f32, options_per_question);
    let y = height as f32 / 2.0;
    (0..options_per_question)
        .map(|option| {
            let slot = direction.physical_slot(option, options_per_question);
            PointF::new(slots[slot as usize], y)
        })
        .collect()
}

/// Assigns each candidate to its nearest expected position and keeps at most
/// one candidate per position.
///
/// When several candidates land on the same position the one whose
/// circularity is closest to 1.0 wins; remaining ties go to the candidate
/// nearest the expected center. Positions and candidates must share a
/// coordinate space.
pub fn assign_to_positions(
    candidates: &[BubbleCandidate],
    positions: &[PointF],
) -> Vec<Option<BubbleCandidate>> {
    let mut assigned: Vec<Option<BubbleCandidate>> = vec![None; positions.len()];
    if positions.is_empty() {
        return assigned;
    }

    for candidate in candidates {
        let nearest = positions
            .iter()
            .enumerate()
            .map(|(i, p)| (i, distance_from_point_to_point(p, &candidate.centroid)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        let (slot, distance) = match nearest {
            Some(nearest) => nearest,
            None => continue,
        };

        let replace = match &assigned[slot] {
            None => true,
            Some(current) => {
                let current_error = (1.0 - current.circularity).abs();
                let new_error = (1.0 - candidate.circularity).abs();
                match new_error.partial_cmp(&current_error) {
                    Some(Ordering::Less) => true,
                    Some(Ordering::Equal) => {
                        distance
                            < distance_from_point_to_point(&positions[slot], &current.centroid)
                    }
                    _ => false,
                }
            }
        };

        if replace {
            if let Some(current) = &assigned[slot] {
                debug!(
                    "question {}: candidate at ({:.1}, {:.1}) displaced by one at ({:.1}, {:.1})",
                    candidate.region_index,
                    current.centroid.x,
                    current.centroid.y,
                    candidate.centroid.x,
                    candidate.centroid.y
                );
            }
            assigned[slot] = Some(*candidate);
        } else {
            debug!(
                "question {}: dropping candidate at ({:.1}, {:.1}) competing for option slot {}",
                candidate.region_index, candidate.centroid.x, candidate.centroid.y, slot
            );
        }
    }

    assigned
}

/// Finds bubble-shaped marks in one question region and classifies every
/// expected option position as filled or not.
///
/// `image` is the region's own sub-image; results are reported in grid
/// coordinates using the region's bounding box as the offset.
#[time]
pub fn classify_region(
    region: &QuestionRegion,
    image: &GrayImage,
    options_per_question: u32,
    direction: ReadingDirection,
    config: &ClassifierConfig,
) -> RegionClassification {
    let offset_x = region.bounding_box.x as f32;
    let offset_y = region.bounding_box.y as f32;

    let (darkest, brightest) = intensity_range(image);
    let low_contrast = brightest.saturating_sub(darkest) < config.min_contrast;

    let level = dark_level(image, config.threshold);
    let mask = ink_mask(image, level);
    let contours = find_contours::<i32>(&mask);
    let areas = contours
        .iter()
        .map(|c| polygon_area(&c.points))
        .collect::<Vec<f32>>();

    let mut candidates = vec![];
    let mut rejected = vec![];

    for (i, contour) in contours.iter().enumerate() {
        if contour.border_type != BorderType::Outer
            || is_nested_in_bubble(&contours, &areas, i, config)
        {
            continue;
        }

        let shape = match measure_contour(contour) {
            Some(shape) => shape,
            None => continue,
        };
        let center = shape.center.offset(offset_x, offset_y);

        match shape_verdict(
            shape.area,
            shape.circularity,
            shape.aspect_ratio,
            low_contrast,
            config,
        ) {
            Ok(()) => {
                let fill_ratio =
                    circle_fill_ratio(&mask, shape.center.x, shape.center.y, shape.radius);
                debug!(
                    "question {}: bubble at ({:.1}, {:.1}) area {:.1} circularity {:.3} fill {:.3}",
                    region.index, center.x, center.y, shape.area, shape.circularity, fill_ratio
                );
                candidates.push(BubbleCandidate {
                    region_index: region.index,
                    centroid: center,
                    radius: shape.radius,
                    area: shape.area,
                    perimeter: shape.perimeter,
                    circularity: shape.circularity,
                    fill_ratio,
                });
            }
            Err(reason) => {
                debug!(
                    "question {}: rejected contour at ({:.1}, {:.1}) area {:.1} circularity {:.3} aspect {:.2}: {}",
                    region.index,
                    center.x,
                    center.y,
                    shape.area,
                    shape.circularity,
                    shape.aspect_ratio,
                    reason
                );
                rejected.push(RejectedArea {
                    question_index: region.index,
                    area: shape.area,
                    circularity: shape.circularity,
                    reason,
                    center,
                });
            }
        }
    }

    let positions = expected_positions(
        region.bounding_box.width,
        region.bounding_box.height,
        options_per_question,
        direction,
    )
    .into_iter()
    .map(|p| p.offset(offset_x, offset_y))
    .collect::<Vec<PointF>>();

    let marks = assign_to_positions(&candidates, &positions)
        .into_iter()
        .zip(positions)
        .enumerate()
        .map(|(option, (candidate, expected_center))| OptionMark {
            option: option as u32,
            expected_center,
            filled: candidate.map_or(false, |c| is_filled(c.fill_ratio, config)),
            candidate,
        })
        .collect();

    RegionClassification {
        candidates,
        rejected,
        marks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_utils::{BLACK, WHITE};
    use crate::test_utils::{draw_question_row, filled_bubble_row};
    use crate::types::BoundingBox;
    use image::Luma;
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;

    fn region(width: u32, height: u32) -> QuestionRegion {
        QuestionRegion {
            index: 7,
            bounding_box: BoundingBox::new(0, 0, width, height),
        }
    }

    fn candidate(x: f32, circularity: f32) -> BubbleCandidate {
        BubbleCandidate {
            region_index: 1,
            centroid: PointF::new(x, 30.0),
            radius: 12.0,
            area: 415.0,
            perimeter: 76.0,
            circularity,
            fill_ratio: 0.9,
        }
    }

    #[test]
    fn circularity_boundary_is_inclusive() {
        let config = ClassifierConfig::default();
        assert_eq!(
            shape_verdict(400.0, 0.59, 1.0, false, &config),
            Err(RejectionReason::NotCircular)
        );
        assert_eq!(shape_verdict(400.0, 0.61, 1.0, false, &config), Ok(()));
        assert_eq!(shape_verdict(400.0, 0.6, 1.0, false, &config), Ok(()));
    }

    #[test]
    fn area_band_rejects_with_reason() {
        let config = ClassifierConfig::default();
        assert_eq!(
            shape_verdict(99.0, 0.9, 1.0, false, &config),
            Err(RejectionReason::TooSmall)
        );
        assert_eq!(
            shape_verdict(8000.5, 0.9, 1.0, false, &config),
            Err(RejectionReason::TooLarge)
        );
        assert_eq!(shape_verdict(100.0, 0.9, 1.0, false, &config), Ok(()));
        assert_eq!(
            shape_verdict(400.0, 0.9, 3.0, false, &config),
            Err(RejectionReason::NotCircular)
        );
        assert_eq!(
            shape_verdict(400.0, 0.9, 1.0, true, &config),
            Err(RejectionReason::LowContrast)
        );
    }

    #[test]
    fn fill_threshold_is_inclusive() {
        let config = ClassifierConfig::default();
        assert!(is_filled(0.5, &config));
        assert!(!is_filled(0.4999, &config));
    }

    #[test]
    fn blank_region_has_no_bubbles() {
        let image = GrayImage::from_pixel(200, 60, WHITE);
        let result = classify_region(
            &region(200, 60),
            &image,
            4,
            ReadingDirection::LeftToRight,
            &ClassifierConfig::default(),
        );
        assert_eq!(result.bubbles_detected(), 0);
        assert!(result.filled_options().is_empty());
        assert!(result.rejected.is_empty());
        assert_eq!(result.marks.len(), 4);
    }

    #[test]
    fn single_filled_bubble_is_detected() {
        let image = filled_bubble_row(200, 60, 4, &[2]);
        let result = classify_region(
            &region(200, 60),
            &image,
            4,
            ReadingDirection::LeftToRight,
            &ClassifierConfig::default(),
        );
        assert_eq!(result.bubbles_detected(), 4);
        assert_eq!(result.filled_options(), vec![2]);
        let filled = result.marks[2].candidate.unwrap();
        assert!(filled.fill_ratio > 0.8);
        assert!(filled.circularity > 0.7);
        let empty = result.marks[0].candidate.unwrap();
        assert!(empty.fill_ratio < 0.5);
    }

    #[test]
    fn two_filled_bubbles_are_both_reported() {
        let image = filled_bubble_row(200, 60, 4, &[0, 3]);
        let result = classify_region(
            &region(200, 60),
            &image,
            4,
            ReadingDirection::LeftToRight,
            &ClassifierConfig::default(),
        );
        assert_eq!(result.filled_options(), vec![0, 3]);
    }

    #[test]
    fn right_to_left_counts_options_from_the_right() {
        let image = filled_bubble_row(200, 60, 4, &[0]);
        let result = classify_region(
            &region(200, 60),
            &image,
            4,
            ReadingDirection::RightToLeft,
            &ClassifierConfig::default(),
        );
        assert_eq!(result.filled_options(), vec![3]);
    }

    #[test]
    fn results_are_offset_into_grid_coordinates() {
        let image = filled_bubble_row(200, 60, 4, &[1]);
        let region = QuestionRegion {
            index: 2,
            bounding_box: BoundingBox::new(400, 60, 200, 60),
        };
        let result = classify_region(
            &region,
            &image,
            4,
            ReadingDirection::LeftToRight,
            &ClassifierConfig::default(),
        );
        let mark = result.marks[1];
        assert_eq!(mark.expected_center, PointF::new(475.0, 90.0));
        let centroid = mark.candidate.unwrap().centroid;
        assert!((centroid.x - 475.0).abs() <= 1.0);
        assert!((centroid.y - 90.0).abs() <= 1.0);
    }

    #[test]
    fn guide_line_and_specks_are_rejected() {
        let mut image = GrayImage::from_pixel(200, 60, WHITE);
        draw_question_row(&mut image, 4, &[]);
        draw_filled_rect_mut(&mut image, Rect::at(5, 52).of_size(190, 3), BLACK);
        draw_filled_circle_mut(&mut image, (100, 8), 2, BLACK);
        let result = classify_region(
            &region(200, 60),
            &image,
            4,
            ReadingDirection::LeftToRight,
            &ClassifierConfig::default(),
        );
        assert_eq!(result.bubbles_detected(), 4);
        assert!(result
            .rejected
            .iter()
            .any(|r| r.reason == RejectionReason::NotCircular));
        assert!(result
            .rejected
            .iter()
            .any(|r| r.reason == RejectionReason::TooSmall));
        assert!(result.filled_options().is_empty());
    }

    #[test]
    fn dark_block_is_too_large() {
        let mut image = GrayImage::from_pixel(200, 120, WHITE);
        draw_filled_rect_mut(&mut image, Rect::at(20, 10).of_size(150, 100), BLACK);
        let result = classify_region(
            &region(200, 120),
            &image,
            4,
            ReadingDirection::LeftToRight,
            &ClassifierConfig::default(),
        );
        assert_eq!(result.bubbles_detected(), 0);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].reason, RejectionReason::TooLarge);
    }

    #[test]
    fn faint_marks_are_low_contrast() {
        let mut image = GrayImage::from_pixel(200, 60, WHITE);
        draw_filled_circle_mut(&mut image, (75, 30), 12, Luma([235]));
        let result = classify_region(
            &region(200, 60),
            &image,
            4,
            ReadingDirection::LeftToRight,
            &ClassifierConfig::default(),
        );
        assert_eq!(result.bubbles_detected(), 0);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].reason, RejectionReason::LowContrast);
    }

    #[test]
    fn mark_inside_ring_belongs_to_the_ring() {
        let mut image = GrayImage::from_pixel(200, 60, WHITE);
        draw_question_row(&mut image, 4, &[]);
        // a partial scribble inside option 1's ring, not touching it
        draw_filled_circle_mut(&mut image, (75, 30), 5, BLACK);
        let result = classify_region(
            &region(200, 60),
            &image,
            4,
            ReadingDirection::LeftToRight,
            &ClassifierConfig::default(),
        );
        assert_eq!(result.bubbles_detected(), 4);
        assert!(result.rejected.is_empty());
        let ring = result.marks[1].candidate.unwrap();
        let plain = result.marks[0].candidate.unwrap();
        assert!(ring.fill_ratio > plain.fill_ratio);
    }

    #[test]
    fn more_circular_candidate_wins_a_slot() {
        let positions = vec![PointF::new(25.0, 30.0), PointF::new(75.0, 30.0)];
        let candidates = vec![
            candidate(27.0, 0.7),
            candidate(30.0, 0.92),
            candidate(74.0, 0.8),
        ];
        let assigned = assign_to_positions(&candidates, &positions);
        assert_eq!(assigned[0].unwrap().circularity, 0.92);
        assert_eq!(assigned[1].unwrap().circularity, 0.8);
    }

    #[test]
    fn equal_circularity_goes_to_the_closer_candidate() {
        let positions = vec![PointF::new(25.0, 30.0)];
        let candidates = vec![candidate(33.0, 0.9), candidate(26.0, 0.9)];
        let assigned = assign_to_positions(&candidates, &positions);
        assert_eq!(assigned[0].unwrap().centroid.x, 26.0);
    }

    #[test]
    fn positions_are_evenly_spaced() {
        let positions = expected_positions(200, 60, 4, ReadingDirection::LeftToRight);
        assert_eq!(positions[0], PointF::new(25.0, 30.0));
        assert_eq!(positions[3], PointF::new(175.0, 30.0));
        let mirrored = expected_positions(200, 60, 4, ReadingDirection::RightToLeft);
        assert_eq!(mirrored[0], PointF::new(175.0, 30.0));
    }
}
