//! Pure spatial predicates over pairs of detections.
//!
//! Every predicate takes two boxes and the threshold configuration and
//! returns a bool; none of them mutate anything. Predicates that scale by
//! character size return `false` when either box has empty text (no
//! character size exists), which leaves such boxes unmerged.

use crate::model::TextBox;

use super::MergeThresholds;

/// Average character size of the smaller-charactered of the two boxes.
fn min_char_size(a: &TextBox, b: &TextBox) -> Option<f64> {
    let ca = a.average_char_size()?;
    let cb = b.average_char_size()?;
    Some(ca.min(cb))
}

/// Horizontal projections overlap by more than the configured fraction of
/// the wider box.
pub fn horizontal_overlap(a: &TextBox, b: &TextBox, t: &MergeThresholds) -> bool {
    let larger = a.rectangle.width().max(b.rectangle.width());
    if larger <= 0.0 {
        return false;
    }
    a.rectangle.horizontal_overlap_len(&b.rectangle) / larger > t.horizontal_overlap_frac
}

/// Vertical projections overlap by more than the configured fraction of the
/// taller box.
pub fn vertical_overlap(a: &TextBox, b: &TextBox, t: &MergeThresholds) -> bool {
    let larger = a.rectangle.height().max(b.rectangle.height());
    if larger <= 0.0 {
        return false;
    }
    a.rectangle.vertical_overlap_len(&b.rectangle) / larger > t.vertical_overlap_frac
}

/// The gap between the facing vertical edges is within the same-line
/// threshold, scaled by character size.
pub fn horizontal_near(a: &TextBox, b: &TextBox, t: &MergeThresholds) -> bool {
    match min_char_size(a, b) {
        Some(char_size) => a.rectangle.horizontal_gap(&b.rectangle) < t.same_line_gap_chars * char_size,
        None => false,
    }
}

/// The gap between the facing horizontal edges is within the adjacent-line
/// threshold, scaled by character size.
pub fn vertical_near(a: &TextBox, b: &TextBox, t: &MergeThresholds) -> bool {
    match min_char_size(a, b) {
        Some(char_size) => a.rectangle.vertical_gap(&b.rectangle) < t.adjacent_gap_chars * char_size,
        None => false,
    }
}

/// Like [`vertical_near`] but with the looser gap threshold; paired with
/// [`start_near`] to stitch left-aligned wrapped lines.
pub fn vertical_near_loose(a: &TextBox, b: &TextBox, t: &MergeThresholds) -> bool {
    match min_char_size(a, b) {
        Some(char_size) => {
            a.rectangle.vertical_gap(&b.rectangle) < t.adjacent_gap_chars_loose * char_size
        }
        None => false,
    }
}

/// The left edges line up within the alignment threshold, scaled by
/// character size. Wrapped paragraph lines share a left margin.
pub fn start_near(a: &TextBox, b: &TextBox, t: &MergeThresholds) -> bool {
    match min_char_size(a, b) {
        Some(char_size) => (a.rectangle.x0 - b.rectangle.x0).abs() < t.start_align_chars * char_size,
        None => false,
    }
}

/// The box is narrower than the configured multiple of its own character
/// size: likely a line fragment still awaiting its continuation.
pub fn short_line(b: &TextBox, t: &MergeThresholds) -> bool {
    match b.average_char_size() {
        Some(char_size) => b.rectangle.width() < t.short_line_chars * char_size,
        None => false,
    }
}

/// The two boxes' character sizes differ by less than the configured ratio.
/// Text at very different font sizes never belongs to the same line.
pub fn similar_char_size(a: &TextBox, b: &TextBox, t: &MergeThresholds) -> bool {
    let (ca, cb) = match (a.average_char_size(), b.average_char_size()) {
        (Some(ca), Some(cb)) => (ca, cb),
        _ => return false,
    };
    let larger = ca.max(cb);
    if larger <= 0.0 {
        return false;
    }
    (ca - cb).abs() / larger < t.char_size_ratio
}

/// The intersection covers more than the configured fraction of the smaller
/// box: one detection duplicates (part of) the other.
pub fn merge_contained(a: &TextBox, b: &TextBox, t: &MergeThresholds) -> bool {
    let smaller = a.rectangle.area().min(b.rectangle.area());
    if smaller <= 0.0 {
        return false;
    }
    let overlap = match a.rectangle.intersection(&b.rectangle) {
        Some(r) => r.area(),
        None => return false,
    };
    overlap / smaller > t.containment_frac
}
