use thiserror::Error;

/// Every way a scoring run can fail. Callers branch on the variant; nothing
/// escapes the core as an unstructured failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretError {
    #[error("image unreadable: {0}")]
    ImageUnreadable(String),

    /// No sheet boundary was found and the fixed-margin fallback crop could
    /// not produce a usable grid either.
    #[error("sheet boundary not found")]
    SheetBoundaryNotFound,

    #[error(
        "layout mismatch: {sections} sections x {rows_per_section} rows != {number_of_questions} questions"
    )]
    LayoutMismatch {
        sections: u32,
        rows_per_section: u32,
        number_of_questions: u32,
    },

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error(
        "grid of {width}x{height} is too small for {sections} sections of {rows_per_section} rows"
    )]
    GridTooSmall {
        width: u32,
        height: u32,
        sections: u32,
        rows_per_section: u32,
    },

    /// Segmentation or classification produced a different number of
    /// questions than the layout declares.
    #[error("found {found} question regions but the layout has {expected} questions")]
    RegionCountMismatch { found: usize, expected: usize },

    #[error("answer key has {key_length} entries but the sheet has {expected} questions")]
    KeyLengthMismatch { key_length: usize, expected: usize },

    #[error(
        "answer key option {option} for question {question} is outside 0..{options_per_question}"
    )]
    KeyOptionOutOfRange {
        question: usize,
        option: usize,
        options_per_question: u32,
    },

    #[error("invalid sheet definition: {0}")]
    SheetDefinition(String),
}

pub type InterpretResult<T> = Result<T, InterpretError>;
