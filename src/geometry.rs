use std::f32::consts::PI;

use imageproc::point::Point;
use imageproc::rect::Rect;

use crate::types::PointF;

pub fn distance_from_point_to_point(p1: &PointF, p2: &PointF) -> f32 {
    ((p1.x - p2.x).powf(2.0) + (p1.y - p2.y).powf(2.0)).sqrt()
}

/// Area enclosed by a closed polygon (shoelace formula).
pub fn polygon_area(points: &[Point<i32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice_area.abs() as f32 / 2.0
}

/// `4π·area/perimeter²`; 1.0 is a perfect circle. Degenerate shapes are 0.
pub fn circularity(area: f32, perimeter: f32) -> f32 {
    if perimeter <= 0.0 {
        return 0.0;
    }
    4.0 * PI * area / (perimeter * perimeter)
}

/// Inclusive pixel bounds of a set of points, as `(min_x, min_y, max_x, max_y)`.
pub fn point_bounds(points: &[Point<i32>]) -> Option<(i32, i32, i32, i32)> {
    let first = points.first()?;
    Some(points.iter().fold(
        (first.x, first.y, first.x, first.y),
        |(min_x, min_y, max_x, max_y), p| {
            (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
        },
    ))
}

/// Bounding rect of a contour.
pub fn contour_bounding_rect(points: &[Point<i32>]) -> Option<Rect> {
    let (min_x, min_y, max_x, max_y) = point_bounds(points)?;
    Some(Rect::at(min_x, min_y).of_size((max_x - min_x + 1) as u32, (max_y - min_y + 1) as u32))
}

/// Picks the four outermost points of a roughly upright quadrilateral
/// outline, as top-left, top-right, bottom-right, bottom-left.
///
/// The top-left corner has the smallest `x + y` and the bottom-right the
/// largest; the top-right has the smallest `y - x` and the bottom-left the
/// largest. Holds for outlines tilted less than 45°.
pub fn extreme_corners(points: &[PointF]) -> Option<[PointF; 4]> {
    let sum = |p: &PointF| p.x + p.y;
    let diff = |p: &PointF| p.y - p.x;

    Some([
        extreme_point(points, sum, false)?,
        extreme_point(points, diff, false)?,
        extreme_point(points, sum, true)?,
        extreme_point(points, diff, true)?,
    ])
}

fn extreme_point(
    points: &[PointF],
    key: impl Fn(&PointF) -> f32,
    largest: bool,
) -> Option<PointF> {
    let (first, rest) = points.split_first()?;
    let mut best = *first;
    for p in rest {
        let better = if largest {
            key(p) > key(&best)
        } else {
            key(p) < key(&best)
        };
        if better {
            best = *p;
        }
    }
    Some(best)
}

/// Evenly spaced slot centers along a span, e.g. expected bubble positions.
pub fn evenly_spaced_centers(start: f32, length: f32, count: u32) -> Vec<f32> {
    let step = length / count as f32;
    (0..count)
        .map(|i| start + step * (i as f32 + 0.5))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_area_and_circularity() {
        let square = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(polygon_area(&square), 100.0);
        let c = circularity(100.0, 40.0);
        assert!((c - PI / 4.0).abs() < 1e-6);
    }

    #[test]
    fn perfect_circle_has_circularity_one() {
        let r = 10.0_f32;
        let c = circularity(PI * r * r, 2.0 * PI * r);
        assert!((c - 1.0).abs() < 1e-5);
        assert_eq!(circularity(10.0, 0.0), 0.0);
    }

    #[test]
    fn corners_are_ordered_clockwise_from_top_left() {
        let corners = [
            PointF::new(90.0, 110.0),
            PointF::new(10.0, 12.0),
            PointF::new(8.0, 105.0),
            PointF::new(95.0, 9.0),
        ];
        let [tl, tr, br, bl] = extreme_corners(&corners).unwrap();
        assert_eq!(tl, PointF::new(10.0, 12.0));
        assert_eq!(tr, PointF::new(95.0, 9.0));
        assert_eq!(br, PointF::new(90.0, 110.0));
        assert_eq!(bl, PointF::new(8.0, 105.0));
    }

    #[test]
    fn extreme_corners_come_from_the_whole_outline() {
        // A slightly tilted rectangle traced with points along each edge.
        let mut outline = vec![];
        for i in 0..100 {
            let t = i as f32;
            outline.push(PointF::new(10.0 + 2.0 * t, 10.0 + 0.04 * t));
            outline.push(PointF::new(210.0 - 0.06 * t, 14.0 + 3.0 * t));
            outline.push(PointF::new(204.0 - 2.0 * t, 314.0 - 0.04 * t));
            outline.push(PointF::new(4.0 + 0.06 * t, 310.0 - 3.0 * t));
        }
        let [tl, tr, br, bl] = extreme_corners(&outline).unwrap();
        assert_eq!(tl, PointF::new(10.0, 10.0));
        assert_eq!(tr, PointF::new(210.0, 14.0));
        assert_eq!(br, PointF::new(204.0, 314.0));
        assert_eq!(bl, PointF::new(4.0, 310.0));
        assert!(extreme_corners(&[]).is_none());
    }

    #[test]
    fn bounding_rect_is_inclusive() {
        let points = vec![Point::new(3, 4), Point::new(7, 4), Point::new(5, 9)];
        let rect = contour_bounding_rect(&points).unwrap();
        assert_eq!((rect.left(), rect.top()), (3, 4));
        assert_eq!((rect.width(), rect.height()), (5, 6));
        assert!(contour_bounding_rect(&[]).is_none());
    }

    #[test]
    fn centers_split_span_into_equal_slots() {
        assert_eq!(evenly_spaced_centers(0.0, 200.0, 4), vec![25.0, 75.0, 125.0, 175.0]);
    }
}
