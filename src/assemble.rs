//! Book-level dataset assembly.
//!
//! Pages parse independently; assembling a book is the single-writer step:
//! global identifiers are allocated here, sequentially and never reused, and
//! the separately parsed answer key is joined onto the questions. The
//! answer-key join is the one hard failure in the system — misaligned
//! lesson sets would silently corrupt every answer in the book.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Category, CorrectAnswer, ParsedPage, Question};

/// Strictly monotonic identifier sequence. Single-writer by construction:
/// allocation requires `&mut self`, so ids can never race, collide, or
/// arrive out of order.
#[derive(Debug, Default)]
pub struct GlobalIdAllocator {
    allocated: u64,
}

impl GlobalIdAllocator {
    /// Create an allocator starting at 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id with the given prefix, e.g. `NDQ_000007`.
    pub fn next_id(&mut self, prefix: &str) -> String {
        self.allocated += 1;
        format!("{}_{:06}", prefix, self.allocated)
    }

    /// How many ids have been handed out.
    pub fn allocated(&self) -> u64 {
        self.allocated
    }
}

/// One lesson's assembled questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Book-wide lesson id, `L_<n>`
    pub global_id: String,
    /// The lesson number extracted from the section name, e.g. `7.1`
    pub lesson_number: Option<String>,
    /// Questions re-keyed by their global ids, in page order
    pub questions: IndexMap<String, Question>,
}

/// The assembled artifact for one book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledBook {
    /// Book identifier
    pub book_source: String,
    /// Assembly timestamp
    pub generated_at: DateTime<Utc>,
    /// Lessons keyed by section name, in insertion order
    pub lessons: IndexMap<String, Lesson>,
}

/// A separately parsed answer key: per lesson number, the answer text for
/// each structural question number.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerKey {
    /// `lesson number -> question number -> answer`
    pub sections: IndexMap<String, IndexMap<String, String>>,
}

impl AnswerKey {
    /// Parse an answer key from its JSON shape.
    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Record one answer.
    pub fn insert(&mut self, lesson: &str, question_number: &str, answer: &str) {
        self.sections
            .entry(lesson.to_string())
            .or_default()
            .insert(question_number.to_string(), answer.to_string());
    }

    fn lesson_numbers(&self) -> BTreeSet<String> {
        self.sections.keys().cloned().collect()
    }
}

/// Accumulates parsed pages into an [`AssembledBook`].
#[derive(Debug)]
pub struct BookAssembler {
    book_source: String,
    lesson_ids: GlobalIdAllocator,
    question_ids: GlobalIdAllocator,
    lessons: IndexMap<String, Lesson>,
    number_pattern: Regex,
}

impl BookAssembler {
    /// Create an assembler for one book.
    pub fn new(book_source: impl Into<String>) -> Self {
        Self {
            book_source: book_source.into(),
            lesson_ids: GlobalIdAllocator::new(),
            question_ids: GlobalIdAllocator::new(),
            lessons: IndexMap::new(),
            number_pattern: Regex::new(r"[0-9]+\.[0-9]+").unwrap(),
        }
    }

    /// Add one parsed page under a lesson section, flattening every
    /// category's questions in order and re-keying them with fresh global
    /// ids.
    pub fn add_page(&mut self, lesson_name: &str, parsed: &ParsedPage) {
        let lesson_number = self
            .number_pattern
            .find(lesson_name)
            .map(|m| m.as_str().to_string());
        let lesson_ids = &mut self.lesson_ids;
        let lesson = self
            .lessons
            .entry(lesson_name.to_string())
            .or_insert_with(|| Lesson {
                global_id: lesson_ids.next_id("L"),
                lesson_number,
                questions: IndexMap::new(),
            });
        for parsed_category in parsed.categories.values() {
            for question in parsed_category.questions.values() {
                let global_id = self.question_ids.next_id("NDQ");
                let mut q = question.clone();
                q.question_id = global_id.clone();
                lesson.questions.insert(global_id, q);
            }
        }
    }

    /// Join the answer key onto the assembled questions.
    ///
    /// The lesson numbers on both sides must match exactly; any difference
    /// is a hard stop for the book. Individual questions with no key entry
    /// keep the `_MISSING_` sentinel.
    pub fn join_answer_key(&mut self, key: &AnswerKey) -> Result<()> {
        let question_lessons: BTreeSet<String> = self
            .lessons
            .values()
            .filter_map(|l| l.lesson_number.clone())
            .collect();
        let key_lessons = key.lesson_numbers();

        if question_lessons != key_lessons {
            return Err(Error::AnswerKeyMismatch {
                questions_only: question_lessons.difference(&key_lessons).cloned().collect(),
                key_only: key_lessons.difference(&question_lessons).cloned().collect(),
            });
        }

        for lesson in self.lessons.values_mut() {
            let section = match lesson.lesson_number.as_ref().and_then(|n| key.sections.get(n)) {
                Some(section) => section,
                None => continue,
            };
            for question in lesson.questions.values_mut() {
                let number = question.structural_id.trim_end_matches(['.', ')']);
                if let Some(answer) = section.get(number) {
                    question.correct_answer = CorrectAnswer::Present {
                        structural_label: question.structural_id.clone(),
                        processed_text: answer.clone(),
                    };
                }
            }
        }
        Ok(())
    }

    /// Finish assembly.
    pub fn into_book(self) -> AssembledBook {
        AssembledBook {
            book_source: self.book_source,
            generated_at: Utc::now(),
            lessons: self.lessons,
        }
    }
}

/// An advisory finding from the integrity check: never blocks emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// What is wrong
    pub message: String,
    /// Where, as a `/`-joined path into the artifact
    pub path: String,
}

/// Check an assembled book's internal consistency: answer-choice counts per
/// question type and global-id sequencing. Findings are advisory.
pub fn integrity_warnings(book: &AssembledBook) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut question_ids = Vec::new();

    for (lesson_name, lesson) in &book.lessons {
        for (qid, question) in &lesson.questions {
            question_ids.push(qid.clone());
            let path = format!("lessons/{}/questions/{}", lesson_name, qid);
            let choices = question.answer_choices.len();
            match question.category {
                Category::MultipleChoice if choices != 4 => warnings.push(ValidationWarning {
                    message: format!("Multiple Choice question has {} answer choices", choices),
                    path,
                }),
                Category::TrueFalse if choices != 2 => warnings.push(ValidationWarning {
                    message: format!("True/False question has {} answer choices", choices),
                    path,
                }),
                _ => {}
            }
        }
    }

    let mut seen = BTreeSet::new();
    for (idx, qid) in question_ids.iter().enumerate() {
        if !seen.insert(qid.clone()) {
            warnings.push(ValidationWarning {
                message: format!("duplicate global id {}", qid),
                path: "lessons".to_string(),
            });
        }
        let expected = format!("NDQ_{:06}", idx + 1);
        if *qid != expected {
            warnings.push(ValidationWarning {
                message: format!("global id {} out of sequence (expected {})", qid, expected),
                path: "lessons".to_string(),
            });
        }
    }

    warnings
}
