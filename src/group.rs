//! Group assignment: partitioning a page's classified boxes into logical
//! units.
//!
//! A "group" is a vertically contiguous run of boxes forming one document
//! unit — a question block with its answer choices, or an instruction block.
//! The scan walks the page's boxes in reading order and opens a new group on
//! a category change or a large vertical break, unless the box is indented
//! under the group's outer margin (answer choices sit deeper than their
//! question and must not split off).

use crate::model::{sort_reading_order, Category, TextBox};

/// Tunable tolerances for the group scan.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupingOptions {
    /// Vertical gap (page units) beyond which consecutive boxes no longer
    /// belong to one unit
    pub separation_tolerance: f64,

    /// How far past the group's outer indent a box may start and still be
    /// treated as nested content
    pub indent_tolerance: f64,

    /// Fuzz for the reading-order sort; OCR baselines on one line differ by
    /// a few pixels
    pub sort_fuzz: f64,
}

impl GroupingOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the vertical separation tolerance.
    pub fn with_separation_tolerance(mut self, tolerance: f64) -> Self {
        self.separation_tolerance = tolerance;
        self
    }

    /// Set the indent tolerance.
    pub fn with_indent_tolerance(mut self, tolerance: f64) -> Self {
        self.indent_tolerance = tolerance;
        self
    }

    /// Set the sort fuzz.
    pub fn with_sort_fuzz(mut self, fuzz: f64) -> Self {
        self.sort_fuzz = fuzz;
        self
    }
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            separation_tolerance: 20.0,
            indent_tolerance: 20.0,
            sort_fuzz: 10.0,
        }
    }
}

/// Assigns `group_n` to a page's classified boxes.
#[derive(Debug, Clone, Default)]
pub struct GroupAssigner {
    options: GroupingOptions,
}

impl GroupAssigner {
    /// Create an assigner with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an assigner with the given options.
    pub fn with_options(options: GroupingOptions) -> Self {
        Self { options }
    }

    /// The active options.
    pub fn options(&self) -> &GroupingOptions {
        &self.options
    }

    /// Sort the boxes into reading order and assign group numbers.
    ///
    /// Sentinel boxes (`Question`, `Unlabeled`) always get group 0 and never
    /// open a group. For the rest, `group_n` forms contiguous non-decreasing
    /// runs over the visit order, and every category change starts a new
    /// group.
    pub fn assign_groups(&self, boxes: &mut Vec<TextBox>) {
        sort_reading_order(boxes, self.options.sort_fuzz);
        if boxes.is_empty() {
            return;
        }

        let mut current_group_n: u32 = 0;
        let mut current_outer_indent = boxes[0].start_x();
        let mut last_seen_category: Option<Category> = None;
        let mut last_box_bottom_y: f64 = 0.0;

        for b in boxes.iter_mut() {
            if b.category.is_sentinel() {
                b.group_n = Some(0);
                last_seen_category = Some(b.category);
                last_box_bottom_y = b.end_y();
                continue;
            }

            let category_changed = last_seen_category != Some(b.category);
            let vertically_separated =
                (b.start_y() - last_box_bottom_y).abs() > self.options.separation_tolerance;
            let nested_indent =
                b.start_x() - current_outer_indent > self.options.indent_tolerance;

            if category_changed || (vertically_separated && !nested_indent) {
                current_group_n += 1;
                current_outer_indent = b.start_x();
                log::debug!(
                    "group {} opens at {} ({})",
                    current_group_n,
                    b.box_id,
                    b.category
                );
            }

            b.group_n = Some(current_group_n);
            last_seen_category = Some(b.category);
            last_box_bottom_y = b.end_y();
        }
    }
}
