//! Per-page processing and the batch driver.
//!
//! Pages are independent: each is loaded, merged, grouped, and parsed on
//! its own, and a failure in one page never aborts the batch. The batch
//! driver fans pages out across a rayon pool and funnels results over a
//! channel back to a single consumer, so downstream identifier allocation
//! stays single-writer.

use std::fs;
use std::path::{Path, PathBuf};

use crossbeam_channel::unbounded;
use rayon::prelude::*;

use crate::error::Result;
use crate::group::{GroupAssigner, GroupingOptions};
use crate::merge::{BoxMerger, MergeThresholds};
use crate::model::{Category, PageAnnotation, ParsedPage, Source, TextBox};
use crate::parser::{ParserOptions, StructureParser};

/// Identifies the page a processing step is working on. Passed explicitly
/// instead of living in process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// Book identifier
    pub book_source: String,
    /// Zero-based page number
    pub page_n: u32,
}

impl PageContext {
    /// Derive the context from a page file path named `<book>_<page>.json`.
    pub fn from_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        match stem.rsplit_once('_') {
            Some((book, page)) => match page.parse() {
                Ok(page_n) => Self {
                    book_source: book.to_string(),
                    page_n,
                },
                Err(_) => Self {
                    book_source: stem.to_string(),
                    page_n: 0,
                },
            },
            None => Self {
                book_source: stem.to_string(),
                page_n: 0,
            },
        }
    }
}

/// Read one page's annotation JSON.
pub fn load_page<P: AsRef<Path>>(path: P) -> Result<PageAnnotation> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Write one page's annotation JSON.
pub fn write_page<P: AsRef<Path>>(path: P, page: &PageAnnotation) -> Result<()> {
    fs::write(path, serde_json::to_string(page)?)?;
    Ok(())
}

/// Runs the merge → group → parse pipeline for single pages.
#[derive(Debug, Clone, Default)]
pub struct PageProcessor {
    merger: BoxMerger,
    grouper: GroupAssigner,
    parser_options: ParserOptions,
}

impl PageProcessor {
    /// Create a processor with default thresholds everywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the merge thresholds.
    pub fn with_merge_thresholds(mut self, thresholds: MergeThresholds) -> Self {
        self.merger = BoxMerger::with_thresholds(thresholds);
        self
    }

    /// Set the grouping options.
    pub fn with_grouping_options(mut self, options: GroupingOptions) -> Self {
        self.grouper = GroupAssigner::with_options(options);
        self
    }

    /// Set the structure-parser options.
    pub fn with_parser_options(mut self, options: ParserOptions) -> Self {
        self.parser_options = options;
        self
    }

    /// Consolidate the page's raw `text` detections.
    pub fn merge_page(&self, page: &PageAnnotation) -> Vec<TextBox> {
        self.merger.merge_page(&page.text)
    }

    /// Consolidate the page's raw `text` detections and stamp each merged
    /// box with its provenance.
    pub fn merge_page_with_context(
        &self,
        page: &PageAnnotation,
        ctx: &PageContext,
    ) -> Vec<TextBox> {
        let mut merged = self.merge_page(page);
        for b in &mut merged {
            b.source = Some(Source {
                book_source: ctx.book_source.clone(),
                page_n: ctx.page_n,
            });
        }
        merged
    }

    /// Sort the page's classified `question` boxes into reading order and
    /// assign group numbers.
    pub fn assign_groups(&self, page: &PageAnnotation) -> Vec<TextBox> {
        let mut boxes: Vec<TextBox> = page.question.values().cloned().collect();
        self.grouper.assign_groups(&mut boxes);
        boxes
    }

    /// Parse the page's classified boxes into the structured hierarchy,
    /// one parser run per question-type category present.
    pub fn parse_page(&self, page: &PageAnnotation) -> ParsedPage {
        let grouped = self.assign_groups(page);
        let mut parsed = ParsedPage::default();

        for category in Category::question_types() {
            let boxes: Vec<TextBox> = grouped
                .iter()
                .filter(|b| b.category == category)
                .cloned()
                .collect();
            if boxes.is_empty() {
                continue;
            }
            // profiles exist for every question type, so this cannot fail
            let parser = StructureParser::with_options(category, self.parser_options.clone())
                .expect("question-type category has a parser profile");
            let result = parser.parse_and_finalize(&boxes);
            if !result.is_empty() {
                parsed.categories.insert(category.as_str().to_string(), result);
            }
        }
        parsed
    }

    /// Load and parse one page file.
    pub fn process_file<P: AsRef<Path>>(&self, path: P) -> Result<ParsedPage> {
        let page = load_page(&path)?;
        Ok(self.parse_page(&page))
    }
}

/// A page the batch driver skipped, with the reason.
#[derive(Debug, Clone)]
pub struct PageFailure {
    /// Page identifier (file stem)
    pub page: String,
    /// What went wrong
    pub message: String,
}

/// Outcome of a batch run over many page files.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Successfully parsed pages, sorted by page identifier
    pub pages: Vec<(String, ParsedPage)>,
    /// Pages that failed to load or parse
    pub failures: Vec<PageFailure>,
}

impl BatchResult {
    /// Total questions parsed across all pages.
    pub fn question_count(&self) -> usize {
        self.pages.iter().map(|(_, p)| p.question_count()).sum()
    }
}

/// Process many page files in parallel.
///
/// Each page is isolated: a malformed or missing file is logged with its
/// page identifier and recorded as a failure, and the rest of the batch
/// continues. Results stream over a channel to this (single) thread, which
/// is where callers should run identifier allocation.
pub fn process_pages(processor: &PageProcessor, paths: &[PathBuf]) -> BatchResult {
    enum Outcome {
        Parsed(String, ParsedPage),
        Failed(PageFailure),
    }

    let (tx, rx) = unbounded();
    paths.par_iter().for_each_with(tx, |tx, path| {
        let page_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown page")
            .to_string();
        let outcome = match processor.process_file(path) {
            Ok(parsed) => Outcome::Parsed(page_id, parsed),
            Err(e) => {
                log::warn!("skipping page {}: {}", page_id, e);
                Outcome::Failed(PageFailure {
                    page: page_id,
                    message: e.to_string(),
                })
            }
        };
        // receiver outlives every sender clone
        let _ = tx.send(outcome);
    });

    let mut result = BatchResult::default();
    for outcome in rx {
        match outcome {
            Outcome::Parsed(page_id, parsed) => result.pages.push((page_id, parsed)),
            Outcome::Failed(failure) => result.failures.push(failure),
        }
    }
    result.pages.sort_by(|a, b| a.0.cmp(&b.0));
    result.failures.sort_by(|a, b| a.page.cmp(&b.page));
    result
}
