//! Text detection types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Rect;

/// Coarse classification of a text box, assigned by an external classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Sentinel: a merged super-box covering a whole question region.
    Question,
    /// Sentinel: not yet classified.
    #[serde(alias = "unlabeled")]
    Unlabeled,
    #[serde(rename = "Multiple Choice")]
    MultipleChoice,
    #[serde(rename = "Short Answer")]
    ShortAnswer,
    #[serde(rename = "True/False")]
    TrueFalse,
    #[serde(rename = "Fill-in-the-Blank", alias = "Fill-In-the-Blank")]
    FillInTheBlank,
    Matching,
}

impl Category {
    /// Sentinel categories are excluded from grouping and structure parsing.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Category::Question | Category::Unlabeled)
    }

    /// The question-type categories a structure parser exists for.
    pub fn question_types() -> [Category; 5] {
        [
            Category::MultipleChoice,
            Category::ShortAnswer,
            Category::TrueFalse,
            Category::FillInTheBlank,
            Category::Matching,
        ]
    }

    /// The annotation store's name for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Question => "Question",
            Category::Unlabeled => "Unlabeled",
            Category::MultipleChoice => "Multiple Choice",
            Category::ShortAnswer => "Short Answer",
            Category::TrueFalse => "True/False",
            Category::FillInTheBlank => "Fill-in-the-Blank",
            Category::Matching => "Matching",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Unlabeled
    }
}

/// Provenance of a box: which book and page it was detected on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Book identifier, e.g. a file stem
    pub book_source: String,
    /// Zero-based page number within the book
    pub page_n: u32,
}

/// A positioned OCR text detection.
///
/// Produced externally (OCR plus classifier); the merge pipeline consumes
/// raw detections and emits consolidated boxes of the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    /// Box identifier within its page section (`T<n>` or `Q<n>`)
    pub box_id: String,

    /// Externally assigned classification
    #[serde(default)]
    pub category: Category,

    /// Recognized text
    pub contents: String,

    /// OCR confidence in `[0, 1]`
    pub score: f64,

    /// Bounding rectangle in page coordinates
    pub rectangle: Rect,

    /// Vertical extent of the box (kept alongside the rectangle in the
    /// annotation store)
    #[serde(default)]
    pub v_dim: f64,

    /// Group number within the page, assigned by the group scan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_n: Option<u32>,

    /// Where this box came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

impl TextBox {
    /// Create a box with the given id, text, and rectangle. Score defaults
    /// to 1.0; category to `Unlabeled`.
    pub fn new(box_id: impl Into<String>, contents: impl Into<String>, rectangle: Rect) -> Self {
        Self {
            box_id: box_id.into(),
            category: Category::Unlabeled,
            contents: contents.into(),
            score: 1.0,
            rectangle,
            v_dim: rectangle.height(),
            group_n: None,
            source: None,
        }
    }

    /// Set the category (builder-style, mostly for tests and synthetic pages).
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Set the confidence score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    /// Left edge of the bounding rectangle.
    pub fn start_x(&self) -> f64 {
        self.rectangle.x0
    }

    /// Top edge of the bounding rectangle.
    pub fn start_y(&self) -> f64 {
        self.rectangle.y0
    }

    /// Right edge of the bounding rectangle.
    pub fn end_x(&self) -> f64 {
        self.rectangle.x1
    }

    /// Bottom edge of the bounding rectangle.
    pub fn end_y(&self) -> f64 {
        self.rectangle.y1
    }

    /// Average character width: box width divided by text length.
    ///
    /// Returns `None` for empty text so callers never divide by zero;
    /// such boxes pass through the merge pipeline unmerged.
    pub fn average_char_size(&self) -> Option<f64> {
        let chars = self.contents.chars().count();
        if chars == 0 {
            None
        } else {
            Some(self.rectangle.width() / chars as f64)
        }
    }

    /// The numeric part of the box id (`"T12"` -> 12), used for ordinal-order
    /// visits of a page's detections.
    pub fn ordinal(&self) -> Option<u32> {
        let digits: String = self.box_id.chars().skip_while(|c| !c.is_ascii_digit()).collect();
        digits.parse().ok()
    }
}

/// Sort boxes into reading order: by `(start_y, start_x)`, then swap adjacent
/// entries whose y coordinates are within `fuzz` of each other but whose x
/// order is reversed. OCR baselines wobble a few pixels, so a strict y sort
/// can interleave boxes that sit on the same visual line.
pub fn sort_reading_order(boxes: &mut [TextBox], fuzz: f64) {
    boxes.sort_by(|a, b| {
        (a.start_y(), a.start_x())
            .partial_cmp(&(b.start_y(), b.start_x()))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for i in 1..boxes.len() {
        if boxes[i - 1].start_y() + fuzz > boxes[i].start_y()
            && boxes[i - 1].start_x() > boxes[i].start_x()
        {
            boxes.swap(i - 1, i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(id: &str, x: f64, y: f64, w: f64, h: f64) -> TextBox {
        TextBox::new(id, "text", Rect::new(x, y, x + w, y + h))
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&Category::MultipleChoice).unwrap();
        assert_eq!(json, "\"Multiple Choice\"");
        let back: Category = serde_json::from_str("\"True/False\"").unwrap();
        assert_eq!(back, Category::TrueFalse);
        // lowercase alias used by the raw OCR annotation writer
        let raw: Category = serde_json::from_str("\"unlabeled\"").unwrap();
        assert_eq!(raw, Category::Unlabeled);
    }

    #[test]
    fn test_average_char_size_empty_text() {
        let mut b = boxed("T1", 0.0, 0.0, 50.0, 10.0);
        b.contents = String::new();
        assert_eq!(b.average_char_size(), None);
    }

    #[test]
    fn test_average_char_size() {
        let mut b = boxed("T1", 0.0, 0.0, 40.0, 10.0);
        b.contents = "word".to_string();
        assert_eq!(b.average_char_size(), Some(10.0));
    }

    #[test]
    fn test_ordinal() {
        assert_eq!(boxed("T12", 0.0, 0.0, 1.0, 1.0).ordinal(), Some(12));
        assert_eq!(boxed("Q3", 0.0, 0.0, 1.0, 1.0).ordinal(), Some(3));
        assert_eq!(boxed("bad", 0.0, 0.0, 1.0, 1.0).ordinal(), None);
    }

    #[test]
    fn test_sort_reading_order_fuzzy_swap() {
        // b sits 4px lower but left of a: with fuzz 10 they count as the
        // same line and b should come first.
        let a = boxed("T1", 100.0, 50.0, 40.0, 10.0);
        let b = boxed("T2", 20.0, 54.0, 40.0, 10.0);
        let mut boxes = vec![a.clone(), b.clone()];
        sort_reading_order(&mut boxes, 10.0);
        assert_eq!(boxes[0].box_id, "T2");
        assert_eq!(boxes[1].box_id, "T1");

        let mut strict = vec![a, b];
        sort_reading_order(&mut strict, 0.0);
        assert_eq!(strict[0].box_id, "T1");
    }
}
