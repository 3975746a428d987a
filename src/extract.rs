use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::contrast::{adaptive_threshold, equalize_histogram, stretch_contrast};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use log::{debug, info, warn};
use logging_timer::time;
use serde::{Deserialize, Serialize};

use crate::config::{ContrastEnhancement, ExtractorConfig, Margins};
use crate::error::{InterpretError, InterpretResult};
use crate::geometry::{
    contour_bounding_rect, distance_from_point_to_point, extreme_corners, polygon_area,
};
use crate::image_utils::{intensity_range, invert};
use crate::types::{BoundingBox, PointF};

/// How the grid was cut out of the photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "method")]
pub enum CropMethod {
    /// The sheet border was a quadrilateral and was warped flat.
    Perspective { corners: [PointF; 4] },

    /// The sheet border was found but was not four-cornered.
    BoundingBox { bounds: BoundingBox },

    /// No border qualified; fixed margins were trimmed instead.
    FallbackMargins,
}

/// The usable answer grid cut out of a photo.
///
/// `color` feeds the compositor; `gray` feeds segmentation and
/// classification. Both have identical dimensions.
#[derive(Debug, Clone)]
pub struct ExtractedGrid {
    pub color: RgbImage,
    pub gray: GrayImage,
    pub method: CropMethod,
}

impl ExtractedGrid {
    pub fn dimensions(&self) -> (u32, u32) {
        self.gray.dimensions()
    }
}

/// The outline of the sheet, as found in the thresholded photo.
#[derive(Debug, Clone, PartialEq)]
enum SheetBoundary {
    Quad([PointF; 4]),
    Bounds(BoundingBox),
}

/// Removes speckle and evens out the exposure of a grayscale photo.
fn preprocess(gray: GrayImage, config: &ExtractorConfig) -> GrayImage {
    let denoised = if config.denoise_radius > 0 {
        median_filter(&gray, config.denoise_radius, config.denoise_radius)
    } else {
        gray
    };

    match config.contrast {
        ContrastEnhancement::None => denoised,
        ContrastEnhancement::Stretch => {
            let (lo, hi) = intensity_range(&denoised);
            if hi > lo && (lo > 0 || hi < u8::MAX) {
                stretch_contrast(&denoised, lo, hi)
            } else {
                denoised
            }
        }
        ContrastEnhancement::Equalize => equalize_histogram(&denoised),
    }
}

/// Finds the largest outer contour of the ink mask and decides whether it
/// is large enough to be the sheet border.
fn find_sheet_boundary(gray: &GrayImage, config: &ExtractorConfig) -> Option<SheetBoundary> {
    let blurred = if config.blur_sigma > 0.0 {
        gaussian_blur_f32(gray, config.blur_sigma)
    } else {
        gray.clone()
    };
    let ink = invert(&adaptive_threshold(&blurred, config.adaptive_block_radius));

    let contours = find_contours::<i32>(&ink);
    let (contour, area) = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .map(|c| (c, polygon_area(&c.points)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

    let image_area = gray.width() as f32 * gray.height() as f32;
    if area < image_area * config.min_area_fraction {
        debug!(
            "largest contour covers {:.1}% of the image, below the {:.1}% minimum",
            100.0 * area / image_area,
            100.0 * config.min_area_fraction
        );
        return None;
    }

    let epsilon = config.polygon_epsilon as f64 * arc_length(&contour.points, true);
    let polygon = close_polygon(
        approximate_polygon_dp(&contour.points, epsilon.max(1.0), true),
        epsilon as f32,
    );
    debug!(
        "sheet contour area {:.0} simplifies to {} corners",
        area,
        polygon.len()
    );

    // The simplified polygon only decides the shape; its vertices can sit
    // well inside the true corners, so those are taken from the full outline.
    if polygon.len() == 4 {
        let outline = contour.points.iter().map(to_pointf).collect::<Vec<PointF>>();
        if let Some(corners) = extreme_corners(&outline) {
            return Some(SheetBoundary::Quad(corners));
        }
    }

    let rect = contour_bounding_rect(&contour.points)?;
    Some(SheetBoundary::Bounds(BoundingBox::new(
        rect.left().max(0) as u32,
        rect.top().max(0) as u32,
        rect.width(),
        rect.height(),
    )))
}

fn to_pointf(p: &Point<i32>) -> PointF {
    PointF::new(p.x as f32, p.y as f32)
}

/// Drops a trailing vertex that duplicates the first one within `tolerance`.
fn close_polygon(mut polygon: Vec<Point<i32>>, tolerance: f32) -> Vec<Point<i32>> {
    while polygon.len() > 3 {
        let first = to_pointf(&polygon[0]);
        let last = to_pointf(&polygon[polygon.len() - 1]);
        if distance_from_point_to_point(&first, &last) > tolerance {
            break;
        }
        polygon.pop();
    }
    polygon
}

/// Warps the quadrilateral `corners` (top-left, top-right, bottom-right,
/// bottom-left) onto an upright rectangle.
fn warp_quad(image: &RgbImage, corners: &[PointF; 4]) -> Option<RgbImage> {
    let [tl, tr, br, bl] = *corners;
    let width = distance_from_point_to_point(&tl, &tr).max(distance_from_point_to_point(&bl, &br));
    let height =
        distance_from_point_to_point(&tl, &bl).max(distance_from_point_to_point(&tr, &br));
    let out_w = width.round() as u32 + 1;
    let out_h = height.round() as u32 + 1;
    if out_w < 2 || out_h < 2 {
        return None;
    }

    let src = [(tl.x, tl.y), (tr.x, tr.y), (br.x, br.y), (bl.x, bl.y)];
    let dst = [
        (0.0, 0.0),
        ((out_w - 1) as f32, 0.0),
        ((out_w - 1) as f32, (out_h - 1) as f32),
        (0.0, (out_h - 1) as f32),
    ];
    let projection = Projection::from_control_points(src, dst)?;

    let mut out = RgbImage::new(out_w, out_h);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Rgb([255, 255, 255]),
        &mut out,
    );
    Some(out)
}

/// Rectangle left after trimming `margins` (fractions of each side).
fn inset_bounds(width: u32, height: u32, margins: &Margins) -> Option<BoundingBox> {
    let clamp = |f: f32| f.clamp(0.0, 1.0);
    let left = (width as f32 * clamp(margins.left)).round() as u32;
    let right = (width as f32 * clamp(margins.right)).round() as u32;
    let top = (height as f32 * clamp(margins.top)).round() as u32;
    let bottom = (height as f32 * clamp(margins.bottom)).round() as u32;

    let inner_w = width.checked_sub(left + right)?;
    let inner_h = height.checked_sub(top + bottom)?;
    if inner_w == 0 || inner_h == 0 {
        return None;
    }
    Some(BoundingBox::new(left, top, inner_w, inner_h))
}

fn crop(image: &RgbImage, bounds: &BoundingBox) -> RgbImage {
    imageops::crop_imm(image, bounds.x, bounds.y, bounds.width, bounds.height).to_image()
}

/// Locates the answer grid in a photo and cuts it out.
///
/// The photo is grayscaled, median-filtered, contrast-corrected and
/// adaptively thresholded; the largest outer contour covering at least
/// `min_area_fraction` of the image is taken as the sheet border. A four-cornered border is warped flat, any other border
/// is cropped to its bounding box, and when nothing qualifies a fixed margin
/// is trimmed instead. Only when even that leaves nothing is
/// [`InterpretError::SheetBoundaryNotFound`] returned.
#[time]
pub fn extract_grid(image: &DynamicImage, config: &ExtractorConfig) -> InterpretResult<ExtractedGrid> {
    if image.width() == 0 || image.height() == 0 {
        return Err(InterpretError::ImageUnreadable(
            "image has no pixels".to_string(),
        ));
    }

    let mut color = image.to_rgb8();
    if config.auto_rotate && color.height() < color.width() {
        debug!("rotating landscape image {:?}", color.dimensions());
        color = imageops::rotate90(&color);
    }
    let gray = preprocess(DynamicImage::ImageRgb8(color.clone()).into_luma8(), config);

    let (cropped, method) = match find_sheet_boundary(&gray, config) {
        Some(SheetBoundary::Quad(corners)) => match warp_quad(&color, &corners) {
            Some(warped) => (warped, CropMethod::Perspective { corners }),
            None => fallback_crop(&color, config)?,
        },
        Some(SheetBoundary::Bounds(bounds)) => {
            (crop(&color, &bounds), CropMethod::BoundingBox { bounds })
        }
        None => fallback_crop(&color, config)?,
    };

    let mut grid = match inset_bounds(cropped.width(), cropped.height(), &config.grid_inset) {
        Some(inner) if !config.grid_inset.is_zero() => crop(&cropped, &inner),
        Some(_) => cropped,
        None => return Err(InterpretError::SheetBoundaryNotFound),
    };

    if let Some(size) = config.output_size {
        grid = imageops::resize(&grid, size.width, size.height, FilterType::Triangle);
    }

    let gray = preprocess(DynamicImage::ImageRgb8(grid.clone()).into_luma8(), config);
    info!(
        "extracted {}x{} grid via {:?}",
        grid.width(),
        grid.height(),
        method
    );

    Ok(ExtractedGrid {
        color: grid,
        gray,
        method,
    })
}

fn fallback_crop(
    color: &RgbImage,
    config: &ExtractorConfig,
) -> InterpretResult<(RgbImage, CropMethod)> {
    warn!("sheet boundary not found; falling back to a fixed-margin crop");
    let bounds = inset_bounds(color.width(), color.height(), &config.fallback_margins)
        .ok_or(InterpretError::SheetBoundaryNotFound)?;
    Ok((crop(color, &bounds), CropMethod::FallbackMargins))
}
