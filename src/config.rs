use serde::{Deserialize, Serialize};

/// How a question region is binarized before contour extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThresholdMethod {
    /// Pick the level per region with Otsu's method.
    Otsu,

    /// Pixels at or below this level are dark.
    Fixed(u8),
}

impl Default for ThresholdMethod {
    fn default() -> Self {
        ThresholdMethod::Otsu
    }
}

/// Heuristic thresholds of the bubble classifier.
///
/// These are calibration parameters for a particular printed form and
/// capture setup, not laws of geometry. The defaults suit a grid photographed
/// at roughly 600-800 pixels across.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifierConfig {
    pub threshold: ThresholdMethod,

    /// Smallest contour area, in pixels, that can be a bubble.
    pub min_area: f32,

    /// Largest contour area, in pixels, that can be a bubble.
    pub max_area: f32,

    /// `4π·area/perimeter²` below this rejects the contour. Inclusive: a
    /// contour exactly at the minimum is kept.
    pub min_circularity: f32,

    /// Bounding-box aspect ratio (long side over short side) above this
    /// rejects the contour as not circular.
    pub max_aspect_ratio: f32,

    /// A bubble whose fill ratio is at least this value is filled.
    pub fill_threshold: f32,

    /// Regions whose intensity range is narrower than this have no real ink
    /// on them; every contour found there is rejected as low contrast.
    pub min_contrast: u8,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: ThresholdMethod::Otsu,
            min_area: 100.0,
            max_area: 8000.0,
            min_circularity: 0.6,
            max_aspect_ratio: 2.5,
            fill_threshold: 0.5,
            min_contrast: 40,
        }
    }
}

/// Fractions of the image trimmed from each side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub const ZERO: Margins = Margins::uniform(0.0);

    pub const fn uniform(fraction: f32) -> Self {
        Self {
            top: fraction,
            right: fraction,
            bottom: fraction,
            left: fraction,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Margins::ZERO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

/// Global contrast correction applied to the grayscale photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContrastEnhancement {
    None,

    /// Stretch the darkest and brightest levels to black and white.
    Stretch,

    /// Histogram equalization.
    Equalize,
}

impl Default for ContrastEnhancement {
    fn default() -> Self {
        ContrastEnhancement::Stretch
    }
}

/// Parameters of the sheet boundary search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractorConfig {
    /// Rotate landscape photos 90° clockwise before searching.
    pub auto_rotate: bool,

    /// Radius of the median filter run over the grayscale photo to remove
    /// speckle. 0 disables it.
    pub denoise_radius: u32,

    pub contrast: ContrastEnhancement,

    /// Gaussian blur applied before adaptive thresholding.
    pub blur_sigma: f32,

    /// Half-size of the adaptive threshold neighbourhood.
    pub adaptive_block_radius: u32,

    /// The boundary contour must enclose at least this fraction of the image.
    pub min_area_fraction: f32,

    /// Polygon simplification tolerance, as a fraction of the contour's arc
    /// length.
    pub polygon_epsilon: f32,

    /// Crop used when no boundary qualifies.
    pub fallback_margins: Margins,

    /// Header/footer trim applied to the grid after any crop.
    pub grid_inset: Margins,

    /// Resize the grid to a standard size after cropping.
    pub output_size: Option<OutputSize>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            auto_rotate: true,
            denoise_radius: 1,
            contrast: ContrastEnhancement::Stretch,
            blur_sigma: 1.0,
            adaptive_block_radius: 10,
            min_area_fraction: 0.2,
            polygon_epsilon: 0.02,
            fallback_margins: Margins::uniform(0.05),
            grid_inset: Margins::ZERO,
            output_size: None,
        }
    }
}
