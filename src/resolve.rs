use std::collections::BTreeSet;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::bubbles::RegionClassification;
use crate::types::{QuestionRegion, QuestionResult};

/// The respondent's answer to one question.
///
/// Ambiguity is reported rather than resolved: when several bubbles are
/// filled all of them are kept and no single intended answer is guessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum ResolvedAnswer {
    NoAnswer,
    Single { option: u32 },
    Multiple { options: BTreeSet<u32> },
}

impl ResolvedAnswer {
    pub fn detected_options(&self) -> BTreeSet<u32> {
        match self {
            ResolvedAnswer::NoAnswer => BTreeSet::new(),
            ResolvedAnswer::Single { option } => BTreeSet::from([*option]),
            ResolvedAnswer::Multiple { options } => options.clone(),
        }
    }

    pub fn has_multiple(&self) -> bool {
        matches!(self, ResolvedAnswer::Multiple { .. })
    }
}

impl Display for ResolvedAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvedAnswer::NoAnswer => write!(f, "No Answer"),
            ResolvedAnswer::Single { option } => write!(f, "[{}]", option),
            ResolvedAnswer::Multiple { options } => {
                let list = options
                    .iter()
                    .map(|o| o.to_string())
                    .collect::<Vec<String>>()
                    .join(", ");
                write!(f, "[{}]", list)
            }
        }
    }
}

/// Turns the set of filled positions of one question into an answer.
pub fn resolve_answer<I>(filled: I) -> ResolvedAnswer
where
    I: IntoIterator<Item = u32>,
{
    let options = filled.into_iter().collect::<BTreeSet<u32>>();
    match options.len() {
        0 => ResolvedAnswer::NoAnswer,
        1 => match options.iter().next() {
            Some(&option) => ResolvedAnswer::Single { option },
            None => ResolvedAnswer::NoAnswer,
        },
        _ => ResolvedAnswer::Multiple { options },
    }
}

/// Bundles a region's classification and resolved answer into its result.
pub fn question_result(
    region: &QuestionRegion,
    classification: RegionClassification,
) -> QuestionResult {
    let answer = resolve_answer(classification.filled_options());
    let bubbles_detected = classification.bubbles_detected();
    let fill_ratios = classification
        .marks
        .iter()
        .filter_map(|m| m.candidate.map(|c| c.fill_ratio))
        .collect();

    QuestionResult {
        index: region.index,
        detected_options: answer.detected_options(),
        fill_ratios,
        bubbles_detected,
        rejected_areas: classification.rejected,
        marks: classification.marks,
    }
}

impl QuestionResult {
    pub fn answer(&self) -> ResolvedAnswer {
        resolve_answer(self.detected_options.iter().copied())
    }
}
