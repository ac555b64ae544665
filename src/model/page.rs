//! The per-page annotation store contract.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TextBox;

/// One page's annotation file, as exchanged with the annotation store.
///
/// `text` holds raw or merged detections keyed `T<n>`; `question` holds the
/// classified boxes of question regions keyed `Q<n>`, each carrying a
/// `group_n`. `figure` and `relationship` belong to other annotation layers
/// and are carried through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageAnnotation {
    /// Text detections keyed by box id
    #[serde(default)]
    pub text: IndexMap<String, TextBox>,

    /// Classified question-region boxes keyed by box id
    #[serde(default)]
    pub question: IndexMap<String, TextBox>,

    /// Figure annotations (owned by an external layer)
    #[serde(default)]
    pub figure: IndexMap<String, Value>,

    /// Relationship annotations (owned by an external layer)
    #[serde(default)]
    pub relationship: IndexMap<String, Value>,
}

impl PageAnnotation {
    /// The `text` boxes in ordinal-id order (`T1`, `T2`, ...), the order the
    /// OCR writer assigned them.
    pub fn text_boxes_ordered(&self) -> Vec<TextBox> {
        let mut boxes: Vec<TextBox> = self.text.values().cloned().collect();
        boxes.sort_by_key(|b| b.ordinal().unwrap_or(u32::MAX));
        boxes
    }

    /// Replace the `text` section with merged boxes, re-keying by box id.
    pub fn set_text_boxes(&mut self, boxes: Vec<TextBox>) {
        self.text = boxes.into_iter().map(|b| (b.box_id.clone(), b)).collect();
    }

    /// Write `group_n` assignments back onto the `question` section.
    pub fn apply_groups(&mut self, grouped: &[TextBox]) {
        for b in grouped {
            if let Some(target) = self.question.get_mut(&b.box_id) {
                target.group_n = b.group_n;
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Rect};

    #[test]
    fn test_text_boxes_ordered_by_ordinal() {
        let mut page = PageAnnotation::default();
        for id in ["T10", "T2", "T1"] {
            page.text.insert(
                id.to_string(),
                TextBox::new(id, "x", Rect::new(0.0, 0.0, 10.0, 10.0)),
            );
        }
        let ordered = page.text_boxes_ordered();
        let ids: Vec<&str> = ordered.iter().map(|b| b.box_id.as_str()).collect();
        assert_eq!(ids, ["T1", "T2", "T10"]);
    }

    #[test]
    fn test_contract_roundtrip() {
        let raw = r#"{
            "text": {
                "T1": {
                    "box_id": "T1",
                    "category": "unlabeled",
                    "contents": "The mitochondria",
                    "score": 0.93,
                    "rectangle": [[10.0, 20.0], [120.0, 32.0]],
                    "v_dim": 12.0,
                    "source": {"book_source": "sb", "page_n": 149}
                }
            },
            "question": {
                "Q1": {
                    "box_id": "Q1",
                    "category": "Multiple Choice",
                    "contents": "1. What is 2+2?",
                    "score": 0.88,
                    "rectangle": [[10.0, 40.0], [150.0, 52.0]],
                    "v_dim": 12.0,
                    "group_n": 0,
                    "source": {"book_source": "sb", "page_n": 149}
                }
            },
            "figure": {},
            "relationship": {}
        }"#;
        let page: PageAnnotation = serde_json::from_str(raw).unwrap();
        assert_eq!(page.text.len(), 1);
        assert_eq!(page.question["Q1"].category, Category::MultipleChoice);
        assert_eq!(page.question["Q1"].group_n, Some(0));

        let json = serde_json::to_string(&page).unwrap();
        let back: PageAnnotation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, page);
    }
}
