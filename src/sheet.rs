use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{ClassifierConfig, ExtractorConfig};
use crate::error::{InterpretError, InterpretResult};
use crate::layout::Layout;

/// A printed answer form: its grid and the calibration it was tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetDefinition {
    pub title: String,
    #[serde(default)]
    pub layout: Layout,
    pub thresholds: Option<ClassifierConfig>,
    pub extraction: Option<ExtractorConfig>,
}

impl Default for SheetDefinition {
    fn default() -> Self {
        Self {
            title: "Answer Sheet".to_string(),
            layout: Layout::default(),
            thresholds: None,
            extraction: None,
        }
    }
}

impl SheetDefinition {
    pub fn from_json(json: &str) -> InterpretResult<Self> {
        let definition: SheetDefinition = serde_json::from_str(json)
            .map_err(|e| InterpretError::SheetDefinition(e.to_string()))?;
        definition.layout.validate()?;
        Ok(definition)
    }

    pub fn load(path: &Path) -> InterpretResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            InterpretError::SheetDefinition(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn classifier(&self) -> ClassifierConfig {
        self.thresholds.unwrap_or_default()
    }

    pub fn extractor(&self) -> ExtractorConfig {
        self.extraction.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdMethod;
    use crate::layout::ReadingDirection;
    use std::io::Write;

    #[test]
    fn definition_loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "title": "Grade 9 Quiz",
                "layout": {{
                    "sections": 3,
                    "rowsPerSection": 15,
                    "optionsPerQuestion": 4,
                    "numberOfQuestions": 45,
                    "readingDirection": "rightToLeft"
                }},
                "thresholds": {{ "fillThreshold": 0.45, "threshold": {{ "fixed": 110 }} }}
            }}"#
        )
        .unwrap();

        let definition = SheetDefinition::load(file.path()).unwrap();
        assert_eq!(definition.title, "Grade 9 Quiz");
        assert_eq!(
            definition.layout.reading_direction,
            ReadingDirection::RightToLeft
        );
        assert_eq!(definition.classifier().fill_threshold, 0.45);
        assert_eq!(definition.classifier().threshold, ThresholdMethod::Fixed(110));
        assert_eq!(definition.classifier().min_area, 100.0);
        assert_eq!(definition.extractor(), ExtractorConfig::default());
    }

    #[test]
    fn inconsistent_layout_is_rejected_at_load() {
        let json = r#"{
            "title": "Broken",
            "layout": {
                "sections": 3,
                "rowsPerSection": 15,
                "optionsPerQuestion": 4,
                "numberOfQuestions": 44
            }
        }"#;
        assert!(matches!(
            SheetDefinition::from_json(json),
            Err(InterpretError::LayoutMismatch { .. })
        ));
    }

    #[test]
    fn unreadable_definitions_are_named_failures() {
        assert!(matches!(
            SheetDefinition::from_json("not json"),
            Err(InterpretError::SheetDefinition(_))
        ));
        assert!(matches!(
            SheetDefinition::load(Path::new("/nonexistent/sheet.json")),
            Err(InterpretError::SheetDefinition(_))
        ));
    }

    #[test]
    fn layout_defaults_to_the_deployed_form() {
        let definition = SheetDefinition::from_json(r#"{"title":"Default"}"#).unwrap();
        assert_eq!(definition.layout, Layout::default());
    }
}
