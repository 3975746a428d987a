use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::info;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{InterpretError, InterpretResult};
use crate::layout::Layout;

/// The correct option for every question, in question order. Entries are
/// zero-based option indices. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AnswerKey {
    options: Vec<u32>,
}

impl AnswerKey {
    pub fn new(options: Vec<u32>, options_per_question: u32) -> InterpretResult<Self> {
        check_option_range(&options, options_per_question)?;
        Ok(Self { options })
    }

    /// Parses a JSON array of option indices, e.g. `[1, 0, 3]`.
    pub fn from_json(json: &str, options_per_question: u32) -> InterpretResult<Self> {
        let options: Vec<u32> = serde_json::from_str(json)
            .map_err(|e| InterpretError::SheetDefinition(format!("answer key: {}", e)))?;
        Self::new(options, options_per_question)
    }

    pub fn load(path: &Path, options_per_question: u32) -> InterpretResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            InterpretError::SheetDefinition(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&json, options_per_question)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Correct option for a 1-based question number.
    pub fn correct_option(&self, question: u32) -> Option<u32> {
        let index = (question as usize).checked_sub(1)?;
        self.options.get(index).copied()
    }

    pub fn options(&self) -> &[u32] {
        &self.options
    }

    /// Fails unless the key has exactly one entry per question.
    pub fn check_length(&self, number_of_questions: usize) -> InterpretResult<()> {
        if self.options.len() != number_of_questions {
            return Err(InterpretError::KeyLengthMismatch {
                key_length: self.options.len(),
                expected: number_of_questions,
            });
        }
        Ok(())
    }

    /// Fails unless the key fits `layout`: one entry per question and every
    /// entry a valid option.
    pub fn check_layout(&self, layout: &Layout) -> InterpretResult<()> {
        self.check_length(layout.number_of_questions as usize)?;
        check_option_range(&self.options, layout.options_per_question)
    }
}

fn check_option_range(options: &[u32], options_per_question: u32) -> InterpretResult<()> {
    match options.iter().position(|&o| o >= options_per_question) {
        Some(index) => Err(InterpretError::KeyOptionOutOfRange {
            question: index + 1,
            option: options[index] as usize,
            options_per_question,
        }),
        None => Ok(()),
    }
}

/// A key together with the version it was stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionedKey {
    pub version: u64,
    pub key: AnswerKey,
}

/// Holds the single active answer key.
///
/// Replacement swaps the whole key at once; readers take an `Arc` snapshot
/// and keep scoring against it even if a newer key is stored meanwhile.
#[derive(Debug, Default)]
pub struct KeyStore {
    active: RwLock<Option<Arc<VersionedKey>>>,
    last_version: AtomicU64,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `key` as the active key and returns its snapshot.
    pub fn replace(&self, key: AnswerKey) -> Arc<VersionedKey> {
        let mut active = self.active.write();
        let version = self.last_version.fetch_add(1, Ordering::SeqCst) + 1;
        let versioned = Arc::new(VersionedKey { version, key });
        *active = Some(versioned.clone());
        drop(active);
        info!(
            "stored answer key version {} ({} questions)",
            version,
            versioned.key.len()
        );
        versioned
    }

    pub fn current(&self) -> Option<Arc<VersionedKey>> {
        self.active.read().clone()
    }

    pub fn clear(&self) {
        *self.active.write() = None;
    }
}
