//! Three-pass box consolidation.
//!
//! OCR emits one detection per token run, frequently splitting visual lines
//! and duplicating glyph runs. The merger collapses a page's detections into
//! true text lines and paragraphs with three greedy single-link clustering
//! passes: same-line joining, duplicate containment, adjacent-line
//! stitching.

use indexmap::IndexMap;

use crate::model::{sort_reading_order, TextBox};

use super::{predicates, MergeThresholds};

/// Consolidates a page's raw detections into merged text boxes.
#[derive(Debug, Clone, Default)]
pub struct BoxMerger {
    thresholds: MergeThresholds,
}

impl BoxMerger {
    /// Create a merger with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a merger with the given thresholds.
    pub fn with_thresholds(thresholds: MergeThresholds) -> Self {
        Self { thresholds }
    }

    /// The active thresholds.
    pub fn thresholds(&self) -> &MergeThresholds {
        &self.thresholds
    }

    /// Merge one page's detections, keyed by box id.
    ///
    /// Returns the consolidated boxes in reading order with fresh sequential
    /// `T<n>` ids. Running the pipeline on its own output merges nothing
    /// further: merged lines no longer sit within a character-gap of their
    /// neighbors and paragraph geometry fails the same-line tests.
    pub fn merge_page(&self, detections: &IndexMap<String, TextBox>) -> Vec<TextBox> {
        let mut boxes: Vec<TextBox> = detections.values().cloned().collect();
        boxes.sort_by_key(|b| b.ordinal().unwrap_or(u32::MAX));
        self.merge_boxes(boxes)
    }

    /// Merge detections already in visit order.
    pub fn merge_boxes(&self, boxes: Vec<TextBox>) -> Vec<TextBox> {
        let input_len = boxes.len();
        let t = &self.thresholds;

        // Pass 1: join token fragments on the same visual line.
        let boxes = self.cluster_and_collapse(boxes, |a, b| {
            predicates::horizontal_near(a, b, t)
                && predicates::vertical_overlap(a, b, t)
                && predicates::similar_char_size(a, b, t)
        });

        // Pass 2: collapse duplicate/overlapping detections of one glyph run.
        let boxes = self.cluster_and_collapse(boxes, |a, b| predicates::merge_contained(a, b, t));

        // Pass 3: stitch wrapped lines sharing a horizontal span or a left
        // margin into paragraphs.
        let boxes = self.cluster_and_collapse(boxes, |a, b| {
            predicates::similar_char_size(a, b, t)
                && ((predicates::vertical_near(a, b, t) && predicates::horizontal_overlap(a, b, t))
                    || (predicates::vertical_near_loose(a, b, t)
                        && predicates::start_near(a, b, t)
                        && !predicates::short_line(a, t)))
        });

        let mut merged = boxes;
        sort_reading_order(&mut merged, 0.0);
        for (idx, b) in merged.iter_mut().enumerate() {
            b.box_id = format!("T{}", idx + 1);
            b.v_dim = b.rectangle.height();
        }
        log::debug!("merged {} detections into {} boxes", input_len, merged.len());
        merged
    }

    /// Greedy single-link clustering: each box joins the first cluster
    /// containing any member the predicate accepts it against, else it opens
    /// a singleton. Clusters of size > 1 collapse into one box.
    fn cluster_and_collapse<F>(&self, boxes: Vec<TextBox>, merge_pred: F) -> Vec<TextBox>
    where
        F: Fn(&TextBox, &TextBox) -> bool,
    {
        let mut clusters: Vec<Vec<TextBox>> = Vec::new();
        'next_box: for candidate in boxes {
            for cluster in clusters.iter_mut() {
                if cluster.iter().any(|member| merge_pred(member, &candidate)) {
                    cluster.push(candidate);
                    continue 'next_box;
                }
            }
            clusters.push(vec![candidate]);
        }

        clusters
            .into_iter()
            .map(|cluster| {
                if cluster.len() == 1 {
                    cluster.into_iter().next().unwrap()
                } else {
                    collapse_cluster(cluster)
                }
            })
            .collect()
    }
}

/// Collapse a cluster into one box: union rectangle, texts space-joined in
/// reading order, mean score. The union rectangle contains every
/// constituent's rectangle by construction.
fn collapse_cluster(mut members: Vec<TextBox>) -> TextBox {
    debug_assert!(members.len() > 1);
    let line_fuzz = members
        .iter()
        .map(|b| b.rectangle.height())
        .sum::<f64>()
        / members.len() as f64
        * 0.5;
    sort_reading_order(&mut members, line_fuzz);

    let rectangle = members
        .iter()
        .skip(1)
        .fold(members[0].rectangle, |acc, b| acc.union(&b.rectangle));
    let score = members.iter().map(|b| b.score).sum::<f64>() / members.len() as f64;
    let contents = members
        .iter()
        .map(|b| b.contents.as_str())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let first = &members[0];
    TextBox {
        box_id: first.box_id.clone(),
        category: first.category,
        contents,
        score,
        rectangle,
        v_dim: rectangle.height(),
        group_n: None,
        source: first.source.clone(),
    }
}
