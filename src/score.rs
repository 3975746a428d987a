use std::collections::BTreeSet;

use log::info;
use logging_timer::time;
use serde::{Deserialize, Serialize};

use crate::answer_key::AnswerKey;
use crate::error::{InterpretError, InterpretResult};
use crate::types::QuestionResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionEvaluation {
    pub question: u32,
    pub detected: BTreeSet<u32>,
    pub correct: u32,
    pub is_correct: bool,
    pub has_multiple: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub per_question: Vec<QuestionEvaluation>,
    pub correct_count: u32,
    pub total_questions: u32,
    pub score_percentage: f64,
}

impl EvaluationResult {
    pub fn for_question(&self, question: u32) -> Option<&QuestionEvaluation> {
        self.per_question.iter().find(|e| e.question == question)
    }
}

/// Scores resolved answers against the key.
///
/// A question is correct only when exactly the key's option was marked.
/// No answer and multiple answers are always wrong, even when the key's
/// option is among the marks.
#[time]
pub fn score_answers(
    results: &[QuestionResult],
    key: &AnswerKey,
) -> InterpretResult<EvaluationResult> {
    key.check_length(results.len())?;

    let mut per_question = Vec::with_capacity(results.len());
    for (position, result) in results.iter().enumerate() {
        let correct = key.options()[position];
        let is_correct =
            result.detected_options.len() == 1 && result.detected_options.contains(&correct);
        per_question.push(QuestionEvaluation {
            question: result.index,
            detected: result.detected_options.clone(),
            correct,
            is_correct,
            has_multiple: result.has_multiple(),
        });
    }

    let correct_count = per_question.iter().filter(|e| e.is_correct).count() as u32;
    let total_questions = per_question.len() as u32;
    let score_percentage = if total_questions == 0 {
        0.0
    } else {
        100.0 * correct_count as f64 / total_questions as f64
    };

    info!(
        "scored {}/{} ({:.2}%)",
        correct_count, total_questions, score_percentage
    );

    Ok(EvaluationResult {
        per_question,
        correct_count,
        total_questions,
        score_percentage,
    })
}

/// Like [`score_answers`] but also insists the key matches the number of
/// segmented regions.
pub fn score_against_regions(
    results: &[QuestionResult],
    region_count: usize,
    key: &AnswerKey,
) -> InterpretResult<EvaluationResult> {
    if results.len() != region_count {
        return Err(InterpretError::RegionCountMismatch {
            found: results.len(),
            expected: region_count,
        });
    }
    key.check_length(region_count)?;
    score_answers(results, key)
}
