//! # quizstruct
//!
//! Reconstructs structured question/answer hierarchies from positioned OCR
//! text detections.
//!
//! Scanned workbook pages arrive as fragmentary, overlapping text boxes
//! with confidence scores and (externally assigned) category labels. This
//! library turns them back into a logical document model in three steps:
//!
//! 1. **Merge** — a three-pass geometric clustering pipeline collapses
//!    token fragments and duplicate detections into text lines and
//!    paragraphs ([`merge`]).
//! 2. **Group** — vertically ordered, classified boxes are partitioned into
//!    contiguous logical units ([`group`]).
//! 3. **Parse** — a marker-driven state machine rebuilds the nested
//!    Question/AnswerChoice hierarchy per question type ([`parser`]).
//!
//! ## Quick Start
//!
//! ```no_run
//! use quizstruct::parse_file;
//!
//! fn main() -> quizstruct::Result<()> {
//!     // Parse one page's annotation file
//!     let parsed = parse_file("annotations/spectrum_sci_149.json")?;
//!     for (category, questions) in &parsed.categories {
//!         println!("{}: {} questions", category, questions.question_count());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Tunable geometry**: every merge/group heuristic is a named,
//!   externally configurable threshold
//! - **Local recovery**: unplaceable boxes become retained misfits, never
//!   errors
//! - **Page isolation**: batch processing skips broken pages and keeps going
//! - **Parallel batches**: rayon-driven fan-out with single-writer id
//!   allocation at assembly time

pub mod assemble;
pub mod error;
pub mod group;
pub mod merge;
pub mod model;
pub mod parser;
pub mod pipeline;

// Re-export commonly used types
pub use assemble::{
    AnswerKey, AssembledBook, BookAssembler, GlobalIdAllocator, Lesson, ValidationWarning,
};
pub use error::{Error, Result};
pub use group::{GroupAssigner, GroupingOptions};
pub use merge::{BoxMerger, MergeThresholds};
pub use model::{
    AnswerChoice, Category, CorrectAnswer, Instruction, Misfit, PageAnnotation, ParsedPage,
    ParsedQuestions, Question, Rect, Source, SpanBox, TextBox, MISSING_ANSWER,
};
pub use parser::{MarkerAlphabet, ParserOptions, ParserProfile, StructureParser};
pub use pipeline::{
    load_page, process_pages, write_page, BatchResult, PageContext, PageFailure, PageProcessor,
};

use std::path::Path;

use serde::Serialize;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Parse one page's annotation file into the structured hierarchy.
///
/// # Example
///
/// ```no_run
/// use quizstruct::parse_file;
///
/// let parsed = parse_file("annotations/book_12.json").unwrap();
/// println!("{} questions", parsed.question_count());
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<ParsedPage> {
    PageProcessor::new().process_file(path)
}

/// Parse one page's annotation file with a configured processor.
pub fn parse_file_with<P: AsRef<Path>>(path: P, processor: &PageProcessor) -> Result<ParsedPage> {
    processor.process_file(path)
}

/// Merge one page's raw detections into consolidated text boxes.
///
/// # Example
///
/// ```no_run
/// use quizstruct::merge_file;
///
/// let merged = merge_file("annotations/book_12.json").unwrap();
/// println!("{} merged boxes", merged.len());
/// ```
pub fn merge_file<P: AsRef<Path>>(path: P) -> Result<Vec<TextBox>> {
    let page = load_page(path)?;
    Ok(PageProcessor::new().merge_page(&page))
}

/// Serialize any of the output structures to JSON.
pub fn to_json<T: Serialize>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };
    result.map_err(|e| Error::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_json_formats() {
        let parsed = ParsedPage::default();
        let pretty = to_json(&parsed, JsonFormat::Pretty).unwrap();
        assert!(pretty.contains('\n'));
        let compact = to_json(&parsed, JsonFormat::Compact).unwrap();
        assert!(!compact.contains('\n'));
    }

    #[test]
    fn test_parse_file_missing_is_io_error() {
        let result = parse_file("/nonexistent/page_1.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
