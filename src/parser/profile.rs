//! Per-variant parser configuration.
//!
//! The question-type variants differ in their marker alphabets, how
//! continuations merge, and what finalize fabricates or flags — not in the
//! scan algorithm. One configuration record per category keeps the state
//! machine singular instead of a subclass per variant.

use std::ops::RangeInclusive;

use crate::model::Category;

use super::markers::MarkerAlphabet;

/// How unmarked boxes inside an open question are folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationPolicy {
    /// Append as additional ask lines; blank detection still applies to
    /// same-line spans
    AppendLines,
    /// Same, but blank merging is the dominant mechanism (fill-in blanks
    /// render as printed whitespace between same-line spans)
    DetectBlanks,
}

/// Configuration of one question-type variant.
#[derive(Debug, Clone)]
pub struct ParserProfile {
    /// The category this profile parses
    pub category: Category,
    /// Marker alphabets for question and choice starters
    pub alphabet: MarkerAlphabet,
    /// Continuation behavior
    pub continuation: ContinuationPolicy,
    /// Fabricated at finalize when no choices were found (True/False)
    pub fallback_choices: &'static [(&'static str, &'static str)],
    /// Plausible choice-count range; outside it the question is flagged for
    /// review (Multiple Choice)
    pub expected_choices: Option<RangeInclusive<usize>>,
    /// Split the boxes positionally into question/answer halves instead of
    /// relying on letter markers (Matching)
    pub positional_split: bool,
    /// Strip circled-option OCR artifacts before marker checks (Multiple
    /// Choice)
    pub amplify_artifacts: bool,
}

/// Canonical True/False choice set.
const TRUE_FALSE_CHOICES: &[(&str, &str)] = &[("a", "true"), ("b", "false")];

impl ParserProfile {
    /// The profile for a question-type category; `None` for sentinels.
    pub fn for_category(category: Category) -> Option<Self> {
        match category {
            Category::MultipleChoice => Some(Self {
                category,
                alphabet: MarkerAlphabet::new(40, 6),
                continuation: ContinuationPolicy::AppendLines,
                fallback_choices: &[],
                expected_choices: Some(3..=4),
                positional_split: false,
                amplify_artifacts: true,
            }),
            Category::TrueFalse => Some(Self {
                category,
                alphabet: MarkerAlphabet::new(40, 0),
                continuation: ContinuationPolicy::DetectBlanks,
                fallback_choices: TRUE_FALSE_CHOICES,
                expected_choices: None,
                positional_split: false,
                amplify_artifacts: false,
            }),
            Category::FillInTheBlank | Category::ShortAnswer => Some(Self {
                category,
                alphabet: MarkerAlphabet::new(40, 0),
                continuation: ContinuationPolicy::DetectBlanks,
                fallback_choices: &[],
                expected_choices: None,
                positional_split: false,
                amplify_artifacts: false,
            }),
            Category::Matching => Some(Self {
                category,
                alphabet: MarkerAlphabet::new(40, 6),
                continuation: ContinuationPolicy::AppendLines,
                fallback_choices: &[],
                expected_choices: None,
                positional_split: true,
                amplify_artifacts: false,
            }),
            Category::Question | Category::Unlabeled => None,
        }
    }
}
