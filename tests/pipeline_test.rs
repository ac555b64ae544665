//! End-to-end tests over the merge -> group -> parse pipeline.

use std::fs;

use quizstruct::{
    load_page, process_pages, Category, PageAnnotation, PageProcessor, ParsedPage, Rect, TextBox,
};

fn detection(id: &str, text: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> TextBox {
    TextBox::new(id, text, Rect::new(x0, y0, x1, y1)).with_score(0.9)
}

fn classified(id: &str, category: Category, text: &str, x: f64, y: f64, w: f64) -> TextBox {
    TextBox::new(id, text, Rect::new(x, y, x + w, y + 12.0)).with_category(category)
}

/// A worksheet page: an instruction line, a multiple choice question with
/// four options, and two true/false statements further down.
fn worksheet_page() -> PageAnnotation {
    let mut page = PageAnnotation::default();
    for b in [
        classified(
            "Q1",
            Category::MultipleChoice,
            "Circle the letter of the correct choice.",
            20.0,
            80.0,
            340.0,
        ),
        classified("Q2", Category::MultipleChoice, "1. What is 2+2?", 20.0, 100.0, 150.0),
        classified("Q3", Category::MultipleChoice, "A. 3", 40.0, 116.0, 40.0),
        classified("Q4", Category::MultipleChoice, "B. 4", 40.0, 132.0, 40.0),
        classified("Q5", Category::MultipleChoice, "C. 5", 40.0, 148.0, 40.0),
        classified("Q6", Category::MultipleChoice, "D. 6", 40.0, 164.0, 40.0),
        classified("Q7", Category::TrueFalse, "1. Whales are mammals.", 20.0, 240.0, 220.0),
        classified("Q8", Category::TrueFalse, "2. Spiders are insects.", 20.0, 260.0, 220.0),
    ] {
        page.question.insert(b.box_id.clone(), b);
    }
    page
}

#[test]
fn merge_then_parse_worksheet() {
    let mut page = worksheet_page();
    // raw OCR fragments for the text layer
    for b in [
        detection("T1", "Review", 20.0, 20.0, 80.0, 34.0),
        detection("T2", "Questions", 88.0, 20.0, 178.0, 34.0),
    ] {
        page.text.insert(b.box_id.clone(), b);
    }

    let processor = PageProcessor::new();
    let merged = processor.merge_page(&page);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].contents, "Review Questions");

    let parsed = processor.parse_page(&page);
    let mc = parsed.category(Category::MultipleChoice).unwrap();
    assert_eq!(mc.questions.len(), 1);
    let q = &mc.questions["Q_1"];
    assert_eq!(q.answer_choices.len(), 4);
    assert!(!q.needs_review);
    // the leading unmarked box became the group's instruction
    assert_eq!(mc.instructions.len(), 1);

    let tf = parsed.category(Category::TrueFalse).unwrap();
    assert_eq!(tf.questions.len(), 2);
    // no explicit choices on the page: the canonical pair was fabricated
    for q in tf.questions.values() {
        assert_eq!(q.answer_choices.len(), 2);
        assert_eq!(
            q.answer_choices["answer_choice_a"]
                .possible_answer
                .processed_text
                .as_deref(),
            Some("true")
        );
    }
}

#[test]
fn groups_increase_across_category_changes() {
    let page = worksheet_page();
    let grouped = PageProcessor::new().assign_groups(&page);

    let groups: Vec<u32> = grouped.iter().map(|b| b.group_n.unwrap()).collect();
    assert!(groups.windows(2).all(|w| w[0] <= w[1]));

    let mc_groups: Vec<u32> = grouped
        .iter()
        .filter(|b| b.category == Category::MultipleChoice)
        .map(|b| b.group_n.unwrap())
        .collect();
    let tf_groups: Vec<u32> = grouped
        .iter()
        .filter(|b| b.category == Category::TrueFalse)
        .map(|b| b.group_n.unwrap())
        .collect();
    assert!(mc_groups.iter().all(|g| *g == mc_groups[0]));
    assert!(tf_groups.iter().all(|g| *g == tf_groups[0]));
    assert!(tf_groups[0] > mc_groups[0]);
}

#[test]
fn parsed_page_roundtrips_through_json() {
    let parsed = PageProcessor::new().parse_page(&worksheet_page());
    let json = serde_json::to_string(&parsed).unwrap();
    let back: ParsedPage = serde_json::from_str(&json).unwrap();
    assert_eq!(back, parsed);
}

#[test]
fn batch_run_survives_broken_pages() {
    let dir = tempfile::tempdir().unwrap();

    let good = dir.path().join("workbook_3.json");
    fs::write(&good, serde_json::to_string(&worksheet_page()).unwrap()).unwrap();
    let truncated = dir.path().join("workbook_4.json");
    fs::write(&truncated, "{\"text\": {").unwrap();
    let missing = dir.path().join("workbook_5.json");

    let result = process_pages(&PageProcessor::new(), &[good.clone(), truncated, missing]);

    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.pages[0].0, "workbook_3");
    assert_eq!(result.failures.len(), 2);
    // the good page parsed fully despite its neighbors
    assert_eq!(result.pages[0].1.question_count(), 3);

    // annotation file is still readable afterwards (nothing mutated it)
    let reloaded = load_page(&good).unwrap();
    assert_eq!(reloaded.question.len(), 8);
}
