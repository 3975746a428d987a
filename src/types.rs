use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

/// Why a contour was excluded from bubble consideration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    TooSmall,
    TooLarge,
    NotCircular,
    LowContrast,
}

impl RejectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionReason::TooSmall => "too_small",
            RejectionReason::TooLarge => "too_large",
            RejectionReason::NotCircular => "not_circular",
            RejectionReason::LowContrast => "low_contrast",
        }
    }
}

impl Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RejectionReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "too_small" => Ok(RejectionReason::TooSmall),
            "too_large" => Ok(RejectionReason::TooLarge),
            "not_circular" => Ok(RejectionReason::NotCircular),
            "low_contrast" => Ok(RejectionReason::LowContrast),
            _ => Err(format!("invalid rejection reason: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for RejectionReason {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for RejectionReason {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A point in grid (cropped sheet) pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned box in grid pixels, `(x, y, w, h)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn to_rect(&self) -> Rect {
        Rect::at(self.x as i32, self.y as i32).of_size(self.width.max(1), self.height.max(1))
    }
}

/// A rectangular part of the grid assigned to one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRegion {
    /// 1-based question number.
    pub index: u32,
    pub bounding_box: BoundingBox,
}

/// A contour that passed the shape filters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BubbleCandidate {
    pub region_index: u32,
    /// Center in grid coordinates.
    pub centroid: PointF,
    /// Radius of the circle the fill ratio was measured in.
    pub radius: f32,
    pub area: f32,
    pub perimeter: f32,
    pub circularity: f32,
    pub fill_ratio: f32,
}

/// A contour excluded from scoring, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedArea {
    pub question_index: u32,
    pub area: f32,
    pub circularity: f32,
    pub reason: RejectionReason,
    /// Center in grid coordinates.
    pub center: PointF,
}

/// One expected option position within a question, with the candidate that
/// was assigned to it, if any.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionMark {
    pub option: u32,
    /// Ideal center in grid coordinates.
    pub expected_center: PointF,
    pub candidate: Option<BubbleCandidate>,
    pub filled: bool,
}

/// Everything the classifier and resolver learned about one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub index: u32,
    pub detected_options: BTreeSet<u32>,
    /// Fill ratio of every detected bubble, in option order.
    pub fill_ratios: Vec<f32>,
    pub bubbles_detected: u32,
    pub rejected_areas: Vec<RejectedArea>,
    pub marks: Vec<OptionMark>,
}

impl QuestionResult {
    pub fn has_multiple(&self) -> bool {
        self.detected_options.len() > 1
    }

    pub fn is_unanswered(&self) -> bool {
        self.detected_options.is_empty()
    }
}
