use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{InterpretError, InterpretResult};

/// The order in which sections and options are numbered across the sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadingDirection {
    /// Section 0 and option 0 are the leftmost.
    #[default]
    LeftToRight,

    /// Section 0 and option 0 are the rightmost.
    RightToLeft,
}

impl ReadingDirection {
    /// Maps a logical index (reading order) to a physical slot counted from
    /// the left edge.
    pub fn physical_slot(self, logical: u32, count: u32) -> u32 {
        match self {
            ReadingDirection::LeftToRight => logical,
            ReadingDirection::RightToLeft => count - 1 - logical,
        }
    }
}

/// Fixed grid of the deployed form. Not derived from the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub sections: u32,
    pub rows_per_section: u32,
    pub options_per_question: u32,
    pub number_of_questions: u32,
    #[serde(default)]
    pub reading_direction: ReadingDirection,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            sections: 3,
            rows_per_section: 15,
            options_per_question: 4,
            number_of_questions: 45,
            reading_direction: ReadingDirection::LeftToRight,
        }
    }
}

impl Layout {
    pub fn new(
        sections: u32,
        rows_per_section: u32,
        options_per_question: u32,
        number_of_questions: u32,
    ) -> Self {
        Self {
            sections,
            rows_per_section,
            options_per_question,
            number_of_questions,
            reading_direction: ReadingDirection::LeftToRight,
        }
    }

    pub fn with_reading_direction(mut self, reading_direction: ReadingDirection) -> Self {
        self.reading_direction = reading_direction;
        self
    }

    /// Checks the layout is internally consistent. Runs before any image
    /// work so that a misconfigured form never scores a sheet.
    pub fn validate(&self) -> InterpretResult<()> {
        if self.sections == 0 {
            return Err(InterpretError::InvalidLayout(
                "sections must be at least 1".to_string(),
            ));
        }
        if self.rows_per_section == 0 {
            return Err(InterpretError::InvalidLayout(
                "rows per section must be at least 1".to_string(),
            ));
        }
        if self.options_per_question == 0 {
            return Err(InterpretError::InvalidLayout(
                "options per question must be at least 1".to_string(),
            ));
        }

        let cells = self.sections.checked_mul(self.rows_per_section);
        if cells != Some(self.number_of_questions) {
            return Err(InterpretError::LayoutMismatch {
                sections: self.sections,
                rows_per_section: self.rows_per_section,
                number_of_questions: self.number_of_questions,
            });
        }

        Ok(())
    }

    /// Zero-based section of a 1-based question index.
    pub fn section_of(&self, question: u32) -> u32 {
        question.saturating_sub(1) / self.rows_per_section
    }

    /// 1-based question indices belonging to a zero-based section.
    pub fn questions_in_section(&self, section: u32) -> RangeInclusive<u32> {
        let first = section * self.rows_per_section + 1;
        first..=first + self.rows_per_section - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_the_deployed_form() {
        let layout = Layout::default();
        assert_eq!(layout.number_of_questions, 45);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn mismatched_question_count_is_rejected() {
        let layout = Layout::new(3, 15, 4, 44);
        assert_eq!(
            layout.validate(),
            Err(InterpretError::LayoutMismatch {
                sections: 3,
                rows_per_section: 15,
                number_of_questions: 44,
            })
        );
    }

    #[test]
    fn zero_dimensions_are_invalid() {
        assert!(matches!(
            Layout::new(0, 15, 4, 0).validate(),
            Err(InterpretError::InvalidLayout(_))
        ));
        assert!(matches!(
            Layout::new(3, 15, 0, 45).validate(),
            Err(InterpretError::InvalidLayout(_))
        ));
    }

    #[test]
    fn overflowing_product_is_a_mismatch() {
        let layout = Layout::new(u32::MAX, 2, 4, 10);
        assert!(matches!(
            layout.validate(),
            Err(InterpretError::LayoutMismatch { .. })
        ));
    }

    #[test]
    fn sections_cover_consecutive_questions() {
        let layout = Layout::default();
        assert_eq!(layout.questions_in_section(0), 1..=15);
        assert_eq!(layout.questions_in_section(2), 31..=45);
        assert_eq!(layout.section_of(15), 0);
        assert_eq!(layout.section_of(16), 1);
        assert_eq!(layout.section_of(45), 2);
    }

    #[test]
    fn right_to_left_mirrors_slots() {
        assert_eq!(ReadingDirection::RightToLeft.physical_slot(0, 4), 3);
        assert_eq!(ReadingDirection::RightToLeft.physical_slot(3, 4), 0);
        assert_eq!(ReadingDirection::LeftToRight.physical_slot(2, 4), 2);
    }

    #[test]
    fn layout_reads_camel_case_json() {
        let layout: Layout = serde_json::from_str(
            r#"{"sections":2,"rowsPerSection":5,"optionsPerQuestion":3,"numberOfQuestions":10,"readingDirection":"rightToLeft"}"#,
        )
        .unwrap();
        assert_eq!(layout.sections, 2);
        assert_eq!(layout.reading_direction, ReadingDirection::RightToLeft);
    }
}
