use std::path::Path;

use image::{DynamicImage, RgbImage};
use log::{info, warn};
use logging_timer::time;
use rayon::prelude::*;
use serde::Serialize;

use crate::answer_key::VersionedKey;
use crate::bubbles::classify_region;
use crate::composite::compose_annotated_image;
use crate::config::{ClassifierConfig, ExtractorConfig};
use crate::error::{InterpretError, InterpretResult};
use crate::extract::{extract_grid, CropMethod};
use crate::layout::Layout;
use crate::resolve::question_result;
use crate::score::{score_against_regions, EvaluationResult};
use crate::segment::{check_region_count, region_image, segment_questions};
use crate::sheet::SheetDefinition;
use crate::types::{QuestionRegion, QuestionResult};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpretOptions {
    pub layout: Layout,
    pub classifier: ClassifierConfig,
    pub extractor: ExtractorConfig,
}

impl From<&SheetDefinition> for InterpretOptions {
    fn from(definition: &SheetDefinition) -> Self {
        Self {
            layout: definition.layout,
            classifier: definition.classifier(),
            extractor: definition.extractor(),
        }
    }
}

/// Everything one scoring run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretedSheet {
    pub grid_size: (u32, u32),
    pub crop_method: CropMethod,
    pub regions: Vec<QuestionRegion>,
    pub questions: Vec<QuestionResult>,
    pub evaluation: Option<EvaluationResult>,
    /// Version of the key the sheet was scored against.
    pub key_version: Option<u64>,
    #[serde(skip)]
    pub composite: RgbImage,
}

impl InterpretedSheet {
    /// Questions where the number of detected bubbles differs from the
    /// number of printed options. A clean photo of an intact form has none.
    pub fn incomplete_questions(&self, options_per_question: u32) -> Vec<u32> {
        self.questions
            .iter()
            .filter(|q| q.bubbles_detected != options_per_question)
            .map(|q| q.index)
            .collect()
    }
}

#[time]
pub fn load_sheet_image(image_path: &Path) -> InterpretResult<DynamicImage> {
    image::open(image_path)
        .map_err(|e| InterpretError::ImageUnreadable(format!("{}: {}", image_path.display(), e)))
}

pub fn decode_sheet_image(bytes: &[u8]) -> InterpretResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| InterpretError::ImageUnreadable(e.to_string()))
}

/// Reads one photographed answer sheet and, when a key is given, scores it.
///
/// The layout and key are checked before any pixel is touched. Questions
/// are classified in parallel; their regions are disjoint and the grid is
/// read-only from then on. The composed image is always produced.
#[time]
pub fn interpret_sheet(
    image: &DynamicImage,
    options: &InterpretOptions,
    key: Option<&VersionedKey>,
) -> InterpretResult<InterpretedSheet> {
    let layout = &options.layout;
    layout.validate()?;
    if let Some(key) = key {
        key.key.check_layout(layout)?;
    }

    let grid = extract_grid(image, &options.extractor)?;
    let (grid_width, grid_height) = grid.dimensions();

    let regions = segment_questions(grid_width, grid_height, layout)?;
    check_region_count(&regions, layout)?;

    let questions = regions
        .par_iter()
        .map(|region| {
            let sub_image = region_image(&grid.gray, region);
            let classification = classify_region(
                region,
                &sub_image,
                layout.options_per_question,
                layout.reading_direction,
                &options.classifier,
            );
            question_result(region, classification)
        })
        .collect::<Vec<QuestionResult>>();

    let evaluation = match key {
        Some(key) => Some(score_against_regions(&questions, regions.len(), &key.key)?),
        None => None,
    };

    let composite =
        compose_annotated_image(&grid.color, &regions, &questions, evaluation.as_ref());

    let answered = questions.iter().filter(|q| !q.is_unanswered()).count();
    info!(
        "read {} questions ({} answered, {} with multiple marks)",
        questions.len(),
        answered,
        questions.iter().filter(|q| q.has_multiple()).count()
    );

    let sheet = InterpretedSheet {
        grid_size: (grid_width, grid_height),
        crop_method: grid.method,
        regions,
        questions,
        evaluation,
        key_version: key.map(|k| k.version),
        composite,
    };

    let incomplete = sheet.incomplete_questions(layout.options_per_question);
    if !incomplete.is_empty() {
        warn!(
            "{} questions do not show {} bubbles: {:?}",
            incomplete.len(),
            layout.options_per_question,
            incomplete
        );
    }

    Ok(sheet)
}
