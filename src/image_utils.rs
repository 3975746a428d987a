use image::{GrayImage, Luma, Rgb};
use imageproc::contrast::{otsu_level, threshold};

use crate::config::ThresholdMethod;

pub const WHITE: Luma<u8> = Luma([u8::MAX]);
pub const BLACK: Luma<u8> = Luma([u8::MIN]);

pub const WHITE_RGB: Rgb<u8> = Rgb([255, 255, 255]);
pub const GREEN: Rgb<u8> = Rgb([0, 200, 0]);
pub const RED: Rgb<u8> = Rgb([220, 0, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 90, 255]);
pub const GRAY: Rgb<u8> = Rgb([200, 200, 200]);
pub const DARK_GRAY: Rgb<u8> = Rgb([120, 120, 120]);
pub const YELLOW: Rgb<u8> = Rgb([255, 200, 0]);

/// Gray level at or below which a pixel counts as ink.
pub fn dark_level(img: &GrayImage, method: ThresholdMethod) -> u8 {
    match method {
        ThresholdMethod::Otsu => otsu_level(img),
        ThresholdMethod::Fixed(level) => level,
    }
}

/// Produces a mask where ink (`<= level`) is white and paper is black, the
/// polarity contour tracing expects for foreground.
pub fn ink_mask(img: &GrayImage, level: u8) -> GrayImage {
    match (u8::MAX - 1).checked_sub(level) {
        Some(inverted_level) => threshold(&invert(img), inverted_level),
        None => GrayImage::from_pixel(img.width(), img.height(), WHITE),
    }
}

/// Swaps black and white.
pub fn invert(img: &GrayImage) -> GrayImage {
    let mut out = img.clone();
    image::imageops::invert(&mut out);
    out
}

/// Darkest and brightest gray level in the image.
pub fn intensity_range(img: &GrayImage) -> (u8, u8) {
    img.pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])))
}

/// Fraction of the pixels within `radius` of `(cx, cy)` that are set in
/// `mask`. Pixels outside the image count as unset.
pub fn circle_fill_ratio(mask: &GrayImage, cx: f32, cy: f32, radius: f32) -> f32 {
    let r2 = radius * radius;
    let mut inside = 0u32;
    let mut set = 0u32;

    let min_y = (cy - radius).floor() as i64;
    let max_y = (cy + radius).ceil() as i64;
    let min_x = (cx - radius).floor() as i64;
    let max_x = (cx + radius).ceil() as i64;

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if dx * dx + dy * dy > r2 {
                continue;
            }
            inside += 1;
            if x >= 0
                && y >= 0
                && (x as u32) < mask.width()
                && (y as u32) < mask.height()
                && *mask.get_pixel(x as u32, y as u32) == WHITE
            {
                set += 1;
            }
        }
    }

    if inside == 0 {
        0.0
    } else {
        set as f32 / inside as f32
    }
}
