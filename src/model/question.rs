//! Parsed question hierarchy types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Category, Rect, TextBox};

/// Sentinel recorded when no correct answer was ever observed for a question.
pub const MISSING_ANSWER: &str = "_MISSING_";

/// A text span inside the parsed hierarchy: the trimmed-down remnant of a
/// detection once provenance and classification fields are no longer needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanBox {
    /// Originating box id; continuation merges join ids with `+`
    pub box_id: String,
    /// Raw text as recognized
    pub contents: String,
    /// Display text with structural prefixes stripped; filled by the
    /// finalize pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_text: Option<String>,
    /// Bounding rectangle in page coordinates
    pub rectangle: Rect,
}

impl SpanBox {
    /// Merge two spans into one, left-to-right/top-to-bottom, joining the
    /// texts with `separator` and the ids with `+`. The rectangle is the
    /// union of both.
    pub fn merge_with(&self, other: &SpanBox, separator: &str) -> SpanBox {
        SpanBox {
            box_id: format!("{}+{}", self.box_id, other.box_id),
            contents: format!("{}{}{}", self.contents, separator, other.contents),
            processed_text: None,
            rectangle: self.rectangle.union(&other.rectangle),
        }
    }
}

impl From<&TextBox> for SpanBox {
    fn from(b: &TextBox) -> Self {
        SpanBox {
            box_id: b.box_id.clone(),
            contents: b.contents.clone(),
            processed_text: None,
            rectangle: b.rectangle,
        }
    }
}

/// One candidate answer under a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerChoice {
    /// The marker that introduced the choice, e.g. `a)` or `B.`
    pub structural_label: String,
    /// The choice text span
    pub possible_answer: SpanBox,
}

/// The correct answer for a question, or the `_MISSING_` sentinel when the
/// answer key never supplied one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    /// An answer joined from the answer key
    Present {
        /// The structural number the key entry was filed under
        structural_label: String,
        /// Answer text
        processed_text: String,
    },
    /// The sentinel string
    Missing(String),
}

impl CorrectAnswer {
    /// The missing-answer sentinel.
    pub fn missing() -> Self {
        CorrectAnswer::Missing(MISSING_ANSWER.to_string())
    }

    /// Whether no answer was recorded.
    pub fn is_missing(&self) -> bool {
        matches!(self, CorrectAnswer::Missing(_))
    }
}

impl Default for CorrectAnswer {
    fn default() -> Self {
        CorrectAnswer::missing()
    }
}

/// A reconstructed question: prompt lines plus answer choices.
///
/// Created when a numeric structural marker is observed, mutated by
/// subsequent continuation and answer-choice boxes, and finalized once a
/// later marker or the end of the sequence is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Sequential id within the parse, `Q_<n>`
    pub question_id: String,
    /// Question-type category the boxes carried
    pub category: Category,
    /// The numeric marker that opened the question, e.g. `3.`
    pub structural_id: String,
    /// Prompt lines, keyed `question_line_<i>` in reading order
    pub asks: IndexMap<String, SpanBox>,
    /// Answer choices keyed `answer_choice_<label>` in reading order
    pub answer_choices: IndexMap<String, AnswerChoice>,
    /// Correct answer, `_MISSING_` until an answer key is joined
    #[serde(default)]
    pub correct_answer: CorrectAnswer,
    /// Set by the finalize pass when the choice count is implausible for
    /// the question type; flagged questions go to manual review, parsing
    /// still succeeds
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub needs_review: bool,
}

impl Question {
    /// Open a new question from its first box.
    pub fn open(
        question_id: impl Into<String>,
        category: Category,
        structural_id: impl Into<String>,
        first_ask: SpanBox,
    ) -> Self {
        let mut asks = IndexMap::new();
        asks.insert("question_line_0".to_string(), first_ask);
        Self {
            question_id: question_id.into(),
            category,
            structural_id: structural_id.into(),
            asks,
            answer_choices: IndexMap::new(),
            correct_answer: CorrectAnswer::missing(),
            needs_review: false,
        }
    }

    /// The full prompt text, preferring processed text where present.
    pub fn prompt_text(&self) -> String {
        self.asks
            .values()
            .map(|s| s.processed_text.as_deref().unwrap_or(&s.contents))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Freeform instructional text attached to a group, accumulated from the
/// unmarked boxes seen before the group's first question marker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Instruction {
    /// Instruction spans keyed `I<n>` in reading order
    pub instruction: IndexMap<String, SpanBox>,
}

/// A box no structural rule could place. Retained under its group keyed by
/// box id so a reviewer can recover it; never discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Misfit {
    /// Category the box carried
    pub category: Category,
    /// The unplaced span keyed `M<n>`
    pub asks: IndexMap<String, SpanBox>,
    /// Always empty; kept so misfits share the question record shape
    pub answer_choices: IndexMap<String, AnswerChoice>,
}

/// Everything one structure parser produced for one category of one page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedQuestions {
    /// Questions keyed by sequential question id, in reading order
    pub questions: IndexMap<String, Question>,
    /// Instructions keyed by group (`G<n>`)
    pub instructions: IndexMap<String, Instruction>,
    /// Unplaced boxes keyed by group, then box id
    pub misfits: IndexMap<String, IndexMap<String, Misfit>>,
}

impl ParsedQuestions {
    /// Whether nothing at all was produced.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty() && self.instructions.is_empty() && self.misfits.is_empty()
    }

    /// Total number of questions parsed.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// File an unplaceable box under its group.
    pub fn add_misfit(&mut self, group_key: &str, misfit_key: String, box_: &TextBox) {
        let mut asks = IndexMap::new();
        asks.insert(misfit_key, SpanBox::from(box_));
        self.misfits.entry(group_key.to_string()).or_default().insert(
            box_.box_id.clone(),
            Misfit {
                category: box_.category,
                asks,
                answer_choices: IndexMap::new(),
            },
        );
    }
}

/// The structured output for one page: per question-type category, the
/// parsed questions with their instructions and misfits.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedPage {
    /// Parse results keyed by the category's display name
    pub categories: IndexMap<String, ParsedQuestions>,
}

impl ParsedPage {
    /// Results for one category, if any boxes of it were present.
    pub fn category(&self, category: Category) -> Option<&ParsedQuestions> {
        self.categories.get(category.as_str())
    }

    /// Total questions across all categories.
    pub fn question_count(&self) -> usize {
        self.categories.values().map(|p| p.question_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: &str, text: &str, x0: f64, x1: f64) -> SpanBox {
        SpanBox {
            box_id: id.to_string(),
            contents: text.to_string(),
            processed_text: None,
            rectangle: Rect::new(x0, 0.0, x1, 10.0),
        }
    }

    #[test]
    fn test_span_merge() {
        let a = span("Q1", "name the", 0.0, 40.0);
        let b = span("Q2", "process", 80.0, 120.0);
        let merged = a.merge_with(&b, " __BLANK__ ");
        assert_eq!(merged.box_id, "Q1+Q2");
        assert_eq!(merged.contents, "name the __BLANK__ process");
        assert_eq!(merged.rectangle, Rect::new(0.0, 0.0, 120.0, 10.0));
    }

    #[test]
    fn test_correct_answer_serde() {
        let missing = CorrectAnswer::missing();
        assert_eq!(serde_json::to_string(&missing).unwrap(), "\"_MISSING_\"");

        let present = CorrectAnswer::Present {
            structural_label: "3.".to_string(),
            processed_text: "mitosis".to_string(),
        };
        let json = serde_json::to_string(&present).unwrap();
        let back: CorrectAnswer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, present);
    }

    #[test]
    fn test_question_open() {
        let q = Question::open(
            "Q_1",
            Category::MultipleChoice,
            "1.",
            span("Q3", "1. What is 2+2?", 0.0, 100.0),
        );
        assert_eq!(q.asks.len(), 1);
        assert!(q.asks.contains_key("question_line_0"));
        assert!(q.correct_answer.is_missing());
        assert!(!q.needs_review);
    }

    #[test]
    fn test_parsed_questions_roundtrip() {
        let mut parsed = ParsedQuestions::default();
        let mut q = Question::open(
            "Q_1",
            Category::TrueFalse,
            "1.",
            span("Q1", "1. Water boils at 100 C.", 0.0, 100.0),
        );
        q.answer_choices.insert(
            "answer_choice_a".to_string(),
            AnswerChoice {
                structural_label: "a.".to_string(),
                possible_answer: span("Q2", "a. true", 0.0, 30.0),
            },
        );
        parsed.questions.insert(q.question_id.clone(), q);
        parsed
            .instructions
            .entry("G0".to_string())
            .or_default()
            .instruction
            .insert("I1".to_string(), span("Q9", "Circle the letter.", 0.0, 60.0));

        let json = serde_json::to_string(&parsed).unwrap();
        let back: ParsedQuestions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, parsed);
    }
}
