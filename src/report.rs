use std::fmt::{self, Display};

use serde::Serialize;

use crate::layout::Layout;
use crate::resolve::ResolvedAnswer;
use crate::score::EvaluationResult;
use crate::types::QuestionResult;

/// Answered count of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSummary {
    /// 1-based section number.
    pub section: u32,
    pub first_question: u32,
    pub last_question: u32,
    pub answered: u32,
    pub total: u32,
}

/// Plain-text summary of a scored (or merely read) sheet.
#[derive(Debug, Clone)]
pub struct SheetSummary<'a> {
    pub title: Option<&'a str>,
    pub layout: &'a Layout,
    pub results: &'a [QuestionResult],
    pub evaluation: Option<&'a EvaluationResult>,
}

impl<'a> SheetSummary<'a> {
    pub fn new(layout: &'a Layout, results: &'a [QuestionResult]) -> Self {
        Self {
            title: None,
            layout,
            results,
            evaluation: None,
        }
    }

    pub fn with_title(mut self, title: &'a str) -> Self {
        self.title = Some(title);
        self
    }

    pub fn with_evaluation(mut self, evaluation: Option<&'a EvaluationResult>) -> Self {
        self.evaluation = evaluation;
        self
    }

    pub fn sections(&self) -> Vec<SectionSummary> {
        section_summaries(self.layout, self.results)
    }
}

pub fn section_summaries(layout: &Layout, results: &[QuestionResult]) -> Vec<SectionSummary> {
    (0..layout.sections)
        .map(|section| {
            let questions = layout.questions_in_section(section);
            let answered = results
                .iter()
                .filter(|r| layout.section_of(r.index) == section && !r.is_unanswered())
                .count() as u32;
            SectionSummary {
                section: section + 1,
                first_question: *questions.start(),
                last_question: *questions.end(),
                answered,
                total: layout.rows_per_section,
            }
        })
        .collect()
}

impl Display for SheetSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.title {
            Some(title) => writeln!(f, "=== {} ===", title)?,
            None => writeln!(f, "=== Answer Sheet Summary ===")?,
        }
        writeln!(f)?;

        for result in self.results {
            let answer = result.answer();
            write!(f, "Question {}: {}", result.index, answer)?;
            if let Some(evaluation) = self.evaluation.and_then(|e| e.for_question(result.index)) {
                let verdict = if evaluation.is_correct {
                    "correct"
                } else {
                    "wrong"
                };
                write!(f, " ({}, key [{}])", verdict, evaluation.correct)?;
            }
            writeln!(f)?;

            let ratios = result
                .fill_ratios
                .iter()
                .map(|r| format!("{:.2}", r))
                .collect::<Vec<String>>()
                .join(", ");
            writeln!(
                f,
                "  bubbles: {}, fill ratios: [{}]",
                result.bubbles_detected, ratios
            )?;
        }

        writeln!(f)?;
        writeln!(f, "=== Sections ===")?;
        for section in self.sections() {
            let answers = self
                .results
                .iter()
                .filter(|r| (section.first_question..=section.last_question).contains(&r.index))
                .map(|r| match r.answer() {
                    ResolvedAnswer::NoAnswer => "X".to_string(),
                    answer => answer.to_string(),
                })
                .collect::<Vec<String>>()
                .join(", ");
            writeln!(
                f,
                "Section {} (questions {}-{}): answered {}/{}",
                section.section,
                section.first_question,
                section.last_question,
                section.answered,
                section.total
            )?;
            writeln!(f, "  answers: {}", answers)?;
        }

        if let Some(evaluation) = self.evaluation {
            writeln!(f)?;
            writeln!(
                f,
                "Score: {}/{} ({:.2}%)",
                evaluation.correct_count, evaluation.total_questions, evaluation.score_percentage
            )?;
        }

        Ok(())
    }
}
