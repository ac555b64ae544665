//! The shared structure-parsing state machine.
//!
//! Given one category's boxes for a page in reading order, the parser
//! rebuilds the question/answer hierarchy from structural markers and
//! positional heuristics alone. The machine has two states: before the
//! first question marker (`NoQuestionYet`) everything unmarked is
//! instructional text; once a question is open (`InQuestion`) unmarked boxes
//! are continuations. Anything no rule places is retained as a misfit
//! rather than dropped.

use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::model::{
    AnswerChoice, Category, ParsedQuestions, Question, Rect, SpanBox, TextBox,
};

use super::markers::{amplify_option_starters, MarkerMatch, StartType};
use super::options::{ParserOptions, BLANK_SIGNIFIER};
use super::profile::{ContinuationPolicy, ParserProfile};

/// What the scan emitted last; continuations fold into this element.
#[derive(Debug, Clone, PartialEq)]
enum LastAdded {
    None,
    Ask,
    Choice(String),
}

#[derive(Debug)]
struct ScanState {
    question_counter: usize,
    current_question: Option<String>,
    ask_index: usize,
    instruction_index: usize,
    misfit_index: usize,
    last_added: LastAdded,
}

impl ScanState {
    fn new() -> Self {
        Self {
            question_counter: 0,
            current_question: None,
            ask_index: 0,
            instruction_index: 0,
            misfit_index: 0,
            last_added: LastAdded::None,
        }
    }
}

/// Parses one question-type category's boxes into the nested hierarchy.
#[derive(Debug, Clone)]
pub struct StructureParser {
    profile: ParserProfile,
    options: ParserOptions,
}

impl StructureParser {
    /// Create a parser for a question-type category with default options.
    pub fn new(category: Category) -> Result<Self> {
        Self::with_options(category, ParserOptions::default())
    }

    /// Create a parser for a category with the given options.
    pub fn with_options(category: Category, options: ParserOptions) -> Result<Self> {
        let profile = ParserProfile::for_category(category)
            .ok_or_else(|| Error::NoParserProfile(category.to_string()))?;
        Ok(Self { profile, options })
    }

    /// Create a parser from an explicit profile.
    pub fn from_profile(profile: ParserProfile, options: ParserOptions) -> Self {
        Self { profile, options }
    }

    /// The profile driving this parser.
    pub fn profile(&self) -> &ParserProfile {
        &self.profile
    }

    /// Scan the boxes and build the raw hierarchy. Call [`finalize`] on the
    /// result to strip prefixes and classify; [`parse_and_finalize`] does
    /// both.
    ///
    /// [`finalize`]: StructureParser::finalize
    /// [`parse_and_finalize`]: StructureParser::parse_and_finalize
    pub fn parse_boxes(&self, boxes: &[TextBox]) -> ParsedQuestions {
        let mut out = ParsedQuestions::default();
        let mut state = ScanState::new();

        if self.profile.positional_split {
            self.scan_matching(boxes, &mut out, &mut state);
        } else {
            for b in boxes {
                self.scan_box(b, &mut out, &mut state);
            }
        }
        out
    }

    /// Parse and finalize in one step.
    pub fn parse_and_finalize(&self, boxes: &[TextBox]) -> ParsedQuestions {
        let mut parsed = self.parse_boxes(boxes);
        self.finalize(&mut parsed);
        parsed
    }

    fn scan_box(&self, b: &TextBox, out: &mut ParsedQuestions, state: &mut ScanState) {
        let group_key = group_key(b);
        if b.contents.is_empty() {
            self.file_misfit(b, &group_key, out, state);
            return;
        }

        let text = if self.profile.amplify_artifacts {
            amplify_option_starters(&b.contents)
        } else {
            b.contents.clone()
        };

        let mut marker = self.profile.alphabet.check_starting_chars(&text);
        if marker.is_none() && self.profile.amplify_artifacts {
            marker = self.profile.alphabet.detect_option_letter(&text);
        }

        match marker {
            Some(m) if m.start_type == StartType::Numeric => {
                self.open_question(b, m, out, state);
            }
            Some(m) => {
                // letter start is only meaningful inside an open question
                if state.current_question.is_some() {
                    self.add_choice(b, m, out, state);
                } else {
                    log::debug!("choice marker with no open question: {}", b.box_id);
                    self.file_misfit(b, &group_key, out, state);
                }
            }
            None => {
                if b.category != self.profile.category {
                    self.file_misfit(b, &group_key, out, state);
                } else if state.current_question.is_some() {
                    self.continue_element(b, out, state);
                } else {
                    self.add_instruction(b, &group_key, out, state);
                }
            }
        }
    }

    /// Matching sections list terms first and definitions second with no
    /// letter markers, so the boxes are split positionally: every first-half
    /// numeric starter opens a question that pairs with each second-half box
    /// as a candidate answer.
    fn scan_matching(&self, boxes: &[TextBox], out: &mut ParsedQuestions, state: &mut ScanState) {
        let half = boxes.len() / 2;
        let (question_half, answer_half) = boxes.split_at(half);

        for b in question_half {
            let group_key = group_key(b);
            match self.profile.alphabet.check_starting_chars(&b.contents) {
                Some(m) if m.start_type == StartType::Numeric => {
                    self.open_question(b, m, out, state);
                    for (idx, candidate) in answer_half.iter().enumerate() {
                        let marker = self.profile.alphabet.check_starting_chars(&candidate.contents);
                        let label = marker
                            .as_ref()
                            .map(|m| m.label())
                            .unwrap_or_else(|| format!("{}", idx + 1));
                        let prefix = marker.map(|m| m.prefix).unwrap_or_default();
                        self.insert_choice(candidate, label, prefix, out, state);
                    }
                }
                _ if state.current_question.is_some() => {
                    self.continue_element(b, out, state);
                }
                _ => self.file_misfit(b, &group_key, out, state),
            }
        }
    }

    fn open_question(
        &self,
        b: &TextBox,
        m: MarkerMatch,
        out: &mut ParsedQuestions,
        state: &mut ScanState,
    ) {
        state.question_counter += 1;
        state.ask_index = 0;
        let question_id = format!("Q_{}", state.question_counter);
        let question = Question::open(
            question_id.clone(),
            b.category,
            m.prefix,
            SpanBox::from(b),
        );
        out.questions.insert(question_id.clone(), question);
        state.current_question = Some(question_id);
        state.last_added = LastAdded::Ask;
    }

    fn add_choice(
        &self,
        b: &TextBox,
        m: MarkerMatch,
        out: &mut ParsedQuestions,
        state: &mut ScanState,
    ) {
        self.insert_choice(b, m.label(), m.prefix, out, state);
    }

    fn insert_choice(
        &self,
        b: &TextBox,
        label: String,
        structural_label: String,
        out: &mut ParsedQuestions,
        state: &mut ScanState,
    ) {
        let question_id = state
            .current_question
            .clone()
            .expect("choice insertion requires an open question");
        let choice_id = format!("answer_choice_{}", label);
        if let Some(q) = out.questions.get_mut(&question_id) {
            q.answer_choices.insert(
                choice_id.clone(),
                AnswerChoice {
                    structural_label,
                    possible_answer: SpanBox::from(b),
                },
            );
            state.last_added = LastAdded::Choice(choice_id);
        }
    }

    /// Fold an unmarked box into the current question: either the tail of a
    /// fill-in blank on the same visual line, or a wrapped continuation line
    /// of whatever was emitted last.
    fn continue_element(&self, b: &TextBox, out: &mut ParsedQuestions, state: &mut ScanState) {
        let question_id = state
            .current_question
            .clone()
            .expect("continuation requires an open question");

        let is_blank = self.profile.continuation == ContinuationPolicy::DetectBlanks
            && self
                .last_span(out, state, &question_id)
                .map(|last| self.detect_blank(b, last))
                .unwrap_or(false);

        if is_blank {
            if let Some(last) = self.last_span_mut(out, state, &question_id) {
                *last = last.merge_with(&SpanBox::from(b), BLANK_SIGNIFIER);
            }
            return;
        }

        match state.last_added.clone() {
            LastAdded::Choice(choice_id) => {
                // wrapped choice text
                if let Some(q) = out.questions.get_mut(&question_id) {
                    if let Some(choice) = q.answer_choices.get_mut(&choice_id) {
                        choice.possible_answer =
                            choice.possible_answer.merge_with(&SpanBox::from(b), " ");
                    }
                }
            }
            _ => {
                state.ask_index += 1;
                if let Some(q) = out.questions.get_mut(&question_id) {
                    q.asks.insert(
                        format!("question_line_{}", state.ask_index),
                        SpanBox::from(b),
                    );
                    state.last_added = LastAdded::Ask;
                }
            }
        }
    }

    /// Two same-line spans separated by more horizontal whitespace than any
    /// word gap mark a printed blank.
    fn detect_blank(&self, b: &TextBox, last: &SpanBox) -> bool {
        let gap = b.start_x() - last.rectangle.x1;
        gap > self.options.blank_threshold && self.same_line(&b.rectangle, &last.rectangle)
    }

    fn same_line(&self, a: &Rect, b: &Rect) -> bool {
        let larger = a.height().max(b.height());
        if larger <= 0.0 {
            return false;
        }
        a.vertical_overlap_len(b) / larger > self.options.overlap_tolerance
    }

    fn last_span<'a>(
        &self,
        out: &'a ParsedQuestions,
        state: &ScanState,
        question_id: &str,
    ) -> Option<&'a SpanBox> {
        let q = out.questions.get(question_id)?;
        match &state.last_added {
            LastAdded::Ask => q.asks.values().last(),
            LastAdded::Choice(choice_id) => {
                q.answer_choices.get(choice_id).map(|c| &c.possible_answer)
            }
            LastAdded::None => None,
        }
    }

    fn last_span_mut<'a>(
        &self,
        out: &'a mut ParsedQuestions,
        state: &ScanState,
        question_id: &str,
    ) -> Option<&'a mut SpanBox> {
        let q = out.questions.get_mut(question_id)?;
        match &state.last_added {
            LastAdded::Ask => q.asks.values_mut().last(),
            LastAdded::Choice(choice_id) => q
                .answer_choices
                .get_mut(choice_id)
                .map(|c| &mut c.possible_answer),
            LastAdded::None => None,
        }
    }

    fn add_instruction(
        &self,
        b: &TextBox,
        group_key: &str,
        out: &mut ParsedQuestions,
        state: &mut ScanState,
    ) {
        state.instruction_index += 1;
        out.instructions
            .entry(group_key.to_string())
            .or_default()
            .instruction
            .insert(format!("I{}", state.instruction_index), SpanBox::from(b));
    }

    fn file_misfit(
        &self,
        b: &TextBox,
        group_key: &str,
        out: &mut ParsedQuestions,
        state: &mut ScanState,
    ) {
        state.misfit_index += 1;
        out.add_misfit(group_key, format!("M{}", state.misfit_index), b);
    }

    /// Finalize the parse: strip structural prefixes into processed text,
    /// fabricate fallback choices, flag implausible choice counts, and
    /// reclassify each question from its content.
    pub fn finalize(&self, parsed: &mut ParsedQuestions) {
        for q in parsed.questions.values_mut() {
            for (idx, ask) in q.asks.values_mut().enumerate() {
                let prefix = if idx == 0 { Some(q.structural_id.as_str()) } else { None };
                ask.processed_text = Some(sanitize_text(&ask.contents, prefix));
            }
            for choice in q.answer_choices.values_mut() {
                choice.possible_answer.processed_text = Some(sanitize_text(
                    &choice.possible_answer.contents,
                    Some(choice.structural_label.as_str()),
                ));
            }

            if q.answer_choices.is_empty() && !self.profile.fallback_choices.is_empty() {
                let anchor = q
                    .asks
                    .values()
                    .next()
                    .map(|s| s.rectangle)
                    .unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));
                for (label, text) in self.profile.fallback_choices {
                    q.answer_choices.insert(
                        format!("answer_choice_{}", label),
                        AnswerChoice {
                            structural_label: format!("{}.", label),
                            possible_answer: SpanBox {
                                box_id: format!("{}_{}", q.question_id, label),
                                contents: format!("{}. {}", label, text),
                                processed_text: Some((*text).to_string()),
                                rectangle: anchor,
                            },
                        },
                    );
                }
            }

            if let Some(expected) = &self.profile.expected_choices {
                if !expected.contains(&q.answer_choices.len()) {
                    log::debug!(
                        "{} has {} answer choices, flagging for review",
                        q.question_id,
                        q.answer_choices.len()
                    );
                    q.needs_review = true;
                }
            }

            // choice-count heuristics misread matching sections, whose
            // candidate lists can be any length
            if !self.profile.positional_split {
                classify_question(q);
            }
        }

        for instruction in parsed.instructions.values_mut() {
            for span in instruction.instruction.values_mut() {
                span.processed_text = Some(sanitize_text(&span.contents, None));
            }
        }
    }
}

fn group_key(b: &TextBox) -> String {
    format!("G{}", b.group_n.unwrap_or(0))
}

/// Normalize OCR text and strip a structural prefix if present.
fn sanitize_text(raw: &str, prefix: Option<&str>) -> String {
    let normalized: String = raw.nfkc().collect();
    let stripped = match prefix {
        Some(p) if !p.is_empty() => normalized
            .strip_prefix(p)
            .map(str::to_string)
            .unwrap_or_else(|| normalized.replacen(p, "", 1)),
        _ => normalized,
    };
    stripped.trim().to_string()
}

/// Reclassify a question from its content. The external category is a
/// region-level guess; the parsed structure is more reliable.
fn classify_question(q: &mut Question) {
    let prompt = q.prompt_text().to_lowercase();
    if prompt.contains("true or false") {
        q.category = Category::TrueFalse;
        if let Some(first) = q.asks.values_mut().next() {
            if let Some(processed) = &first.processed_text {
                let cleaned = processed
                    .replacen("True or false:", "", 1)
                    .replacen("true or false:", "", 1)
                    .trim()
                    .to_string();
                first.processed_text = Some(cleaned);
            }
        }
    } else if prompt.contains("__") {
        q.category = Category::FillInTheBlank;
    } else if q.answer_choices.is_empty() {
        q.category = Category::ShortAnswer;
    } else if q.answer_choices.len() == 4 {
        q.category = Category::MultipleChoice;
    } else if q.answer_choices.len() == 2 {
        q.category = Category::TrueFalse;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question_box(id: &str, category: Category, text: &str, x: f64, y: f64, w: f64) -> TextBox {
        let mut b = TextBox::new(id, text, Rect::new(x, y, x + w, y + 12.0)).with_category(category);
        b.group_n = Some(1);
        b
    }

    #[test]
    fn test_multiple_choice_question_with_four_options() {
        let boxes = vec![
            question_box("Q1", Category::MultipleChoice, "1. What is 2+2?", 20.0, 100.0, 150.0),
            question_box("Q2", Category::MultipleChoice, "A. 3", 40.0, 116.0, 40.0),
            question_box("Q3", Category::MultipleChoice, "B. 4", 40.0, 132.0, 40.0),
            question_box("Q4", Category::MultipleChoice, "C. 5", 40.0, 148.0, 40.0),
            question_box("Q5", Category::MultipleChoice, "D. 6", 40.0, 164.0, 40.0),
        ];
        let parser = StructureParser::new(Category::MultipleChoice).unwrap();
        let parsed = parser.parse_and_finalize(&boxes);

        assert_eq!(parsed.questions.len(), 1);
        let q = &parsed.questions["Q_1"];
        assert_eq!(q.structural_id, "1.");
        assert_eq!(q.asks.len(), 1);
        assert_eq!(
            q.asks["question_line_0"].processed_text.as_deref(),
            Some("What is 2+2?")
        );
        let keys: Vec<&str> = q.answer_choices.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "answer_choice_A",
                "answer_choice_B",
                "answer_choice_C",
                "answer_choice_D"
            ]
        );
        assert_eq!(
            q.answer_choices["answer_choice_B"]
                .possible_answer
                .processed_text
                .as_deref(),
            Some("4")
        );
        assert_eq!(q.category, Category::MultipleChoice);
        assert!(!q.needs_review);
        assert!(q.correct_answer.is_missing());
    }

    #[test]
    fn test_two_questions_close_in_sequence() {
        let boxes = vec![
            question_box("Q1", Category::ShortAnswer, "1. Define osmosis.", 20.0, 100.0, 180.0),
            question_box("Q2", Category::ShortAnswer, "2. Define diffusion.", 20.0, 130.0, 180.0),
        ];
        let parser = StructureParser::new(Category::ShortAnswer).unwrap();
        let parsed = parser.parse_and_finalize(&boxes);
        assert_eq!(parsed.questions.len(), 2);
        assert_eq!(parsed.questions["Q_2"].structural_id, "2.");
    }

    #[test]
    fn test_true_false_fabricates_choices() {
        let boxes = vec![question_box(
            "Q1",
            Category::TrueFalse,
            "1. Water boils at 100 C.",
            20.0,
            100.0,
            220.0,
        )];
        let parser = StructureParser::new(Category::TrueFalse).unwrap();
        let parsed = parser.parse_and_finalize(&boxes);

        let q = &parsed.questions["Q_1"];
        assert_eq!(q.answer_choices.len(), 2);
        assert_eq!(
            q.answer_choices["answer_choice_a"]
                .possible_answer
                .processed_text
                .as_deref(),
            Some("true")
        );
        assert_eq!(
            q.answer_choices["answer_choice_b"]
                .possible_answer
                .processed_text
                .as_deref(),
            Some("false")
        );
        assert_eq!(q.category, Category::TrueFalse);
    }

    #[test]
    fn test_blank_merge_on_same_line() {
        // "4. Plants make food by" ......... "during the day." with a 60px
        // gap on the same baseline: one ask with a blank placeholder, not
        // two asks.
        let boxes = vec![
            question_box("Q1", Category::FillInTheBlank, "4. Plants make food by", 20.0, 100.0, 200.0),
            question_box("Q2", Category::FillInTheBlank, "during the day.", 280.0, 100.0, 140.0),
        ];
        let parser = StructureParser::new(Category::FillInTheBlank).unwrap();
        let parsed = parser.parse_and_finalize(&boxes);

        let q = &parsed.questions["Q_1"];
        assert_eq!(q.asks.len(), 1);
        let ask = &q.asks["question_line_0"];
        assert_eq!(ask.box_id, "Q1+Q2");
        assert_eq!(
            ask.processed_text.as_deref(),
            Some("Plants make food by __BLANK__ during the day.")
        );
        assert_eq!(q.category, Category::FillInTheBlank);
    }

    #[test]
    fn test_small_gap_appends_new_ask_line() {
        let boxes = vec![
            question_box("Q1", Category::ShortAnswer, "2. Explain why the moon", 20.0, 100.0, 220.0),
            question_box("Q2", Category::ShortAnswer, "changes shape.", 20.0, 116.0, 130.0),
        ];
        let parser = StructureParser::new(Category::ShortAnswer).unwrap();
        let parsed = parser.parse_and_finalize(&boxes);

        let q = &parsed.questions["Q_1"];
        assert_eq!(q.asks.len(), 2);
        assert_eq!(
            q.asks["question_line_1"].processed_text.as_deref(),
            Some("changes shape.")
        );
    }

    #[test]
    fn test_unmarked_leading_box_becomes_instruction() {
        let boxes = vec![
            question_box(
                "Q1",
                Category::TrueFalse,
                "Write true if the statement is true.",
                20.0,
                80.0,
                300.0,
            ),
            question_box("Q2", Category::TrueFalse, "1. Sound travels in waves.", 20.0, 100.0, 230.0),
        ];
        let parser = StructureParser::new(Category::TrueFalse).unwrap();
        let parsed = parser.parse_and_finalize(&boxes);

        assert_eq!(parsed.questions.len(), 1);
        let instruction = &parsed.instructions["G1"];
        assert_eq!(instruction.instruction.len(), 1);
        assert_eq!(
            instruction.instruction["I1"].contents,
            "Write true if the statement is true."
        );
    }

    #[test]
    fn test_choice_marker_without_question_is_misfit() {
        let boxes = vec![question_box("Q1", Category::MultipleChoice, "B. 4", 40.0, 100.0, 40.0)];
        let parser = StructureParser::new(Category::MultipleChoice).unwrap();
        let parsed = parser.parse_and_finalize(&boxes);

        assert!(parsed.questions.is_empty());
        assert_eq!(parsed.misfits["G1"].len(), 1);
        assert!(parsed.misfits["G1"].contains_key("Q1"));
    }

    #[test]
    fn test_category_mismatch_is_misfit() {
        let boxes = vec![
            question_box("Q1", Category::ShortAnswer, "1. Define osmosis.", 20.0, 100.0, 180.0),
            question_box("Q2", Category::MultipleChoice, "water moves", 20.0, 116.0, 110.0),
        ];
        let parser = StructureParser::new(Category::ShortAnswer).unwrap();
        let parsed = parser.parse_and_finalize(&boxes);

        assert_eq!(parsed.questions.len(), 1);
        assert_eq!(parsed.misfits["G1"]["Q2"].category, Category::MultipleChoice);
    }

    #[test]
    fn test_multiple_choice_flags_short_choice_list() {
        let boxes = vec![
            question_box("Q1", Category::MultipleChoice, "1. Pick one.", 20.0, 100.0, 120.0),
            question_box("Q2", Category::MultipleChoice, "A. yes", 40.0, 116.0, 60.0),
            question_box("Q3", Category::MultipleChoice, "B. no", 40.0, 132.0, 60.0),
        ];
        let parser = StructureParser::new(Category::MultipleChoice).unwrap();
        let parsed = parser.parse_and_finalize(&boxes);
        assert!(parsed.questions["Q_1"].needs_review);
    }

    #[test]
    fn test_matching_pairs_each_question_with_answer_half() {
        let boxes = vec![
            question_box("Q1", Category::Matching, "1. mitochondria", 20.0, 100.0, 140.0),
            question_box("Q2", Category::Matching, "2. chloroplast", 20.0, 116.0, 130.0),
            question_box("Q3", Category::Matching, "a. makes energy", 300.0, 100.0, 150.0),
            question_box("Q4", Category::Matching, "b. captures light", 300.0, 116.0, 160.0),
        ];
        let parser = StructureParser::new(Category::Matching).unwrap();
        let parsed = parser.parse_and_finalize(&boxes);

        assert_eq!(parsed.questions.len(), 2);
        for q in parsed.questions.values() {
            assert_eq!(q.answer_choices.len(), 2);
            assert!(q.answer_choices.contains_key("answer_choice_a"));
            assert!(q.answer_choices.contains_key("answer_choice_b"));
        }
    }

    #[test]
    fn test_true_or_false_keyword_reclassifies_and_strips() {
        let boxes = vec![question_box(
            "Q1",
            Category::ShortAnswer,
            "3. True or false: whales are mammals.",
            20.0,
            100.0,
            320.0,
        )];
        let parser = StructureParser::new(Category::ShortAnswer).unwrap();
        let parsed = parser.parse_and_finalize(&boxes);

        let q = &parsed.questions["Q_1"];
        assert_eq!(q.category, Category::TrueFalse);
        assert_eq!(
            q.asks["question_line_0"].processed_text.as_deref(),
            Some("whales are mammals.")
        );
    }

    #[test]
    fn test_empty_text_box_is_misfit() {
        let boxes = vec![question_box("Q1", Category::ShortAnswer, "", 20.0, 100.0, 50.0)];
        let parser = StructureParser::new(Category::ShortAnswer).unwrap();
        let parsed = parser.parse_and_finalize(&boxes);
        assert!(parsed.misfits["G1"].contains_key("Q1"));
    }

    #[test]
    fn test_roundtrip_serialization() {
        let boxes = vec![
            question_box("Q1", Category::MultipleChoice, "1. What is 2+2?", 20.0, 100.0, 150.0),
            question_box("Q2", Category::MultipleChoice, "A. 3", 40.0, 116.0, 40.0),
            question_box("Q3", Category::MultipleChoice, "B. 4", 40.0, 132.0, 40.0),
        ];
        let parser = StructureParser::new(Category::MultipleChoice).unwrap();
        let parsed = parser.parse_and_finalize(&boxes);

        let json = serde_json::to_string(&parsed).unwrap();
        let back: ParsedQuestions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, parsed);
    }
}
