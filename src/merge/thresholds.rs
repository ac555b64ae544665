//! Tunable thresholds for the merge predicates.

/// Named thresholds driving the geometry predicates.
///
/// Gap and alignment thresholds are multiples of the average character size
/// (box width / text length) of the smaller box in a comparison, so the same
/// configuration works across font sizes and scan resolutions. Overlap and
/// containment thresholds are fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeThresholds {
    /// Max gap between facing edges of two same-line fragments, in character
    /// widths
    pub same_line_gap_chars: f64,

    /// Min fraction of the larger box's height the vertical projections must
    /// share to count as the same line
    pub vertical_overlap_frac: f64,

    /// Min fraction of the larger box's width the horizontal projections
    /// must share for adjacent-line stitching
    pub horizontal_overlap_frac: f64,

    /// Max vertical gap between adjacent lines, in character widths
    pub adjacent_gap_chars: f64,

    /// Looser vertical gap used together with the left-margin check
    pub adjacent_gap_chars_loose: f64,

    /// Max left-edge difference for wrapped lines sharing a margin, in
    /// character widths
    pub start_align_chars: f64,

    /// A box narrower than this many of its own character widths is a short
    /// line fragment and must not absorb a following full line
    pub short_line_chars: f64,

    /// Max relative difference between two boxes' character sizes; guards
    /// against merging text at very different font sizes
    pub char_size_ratio: f64,

    /// Min intersection area over the smaller box's area for duplicate
    /// detections to collapse
    pub containment_frac: f64,
}

impl MergeThresholds {
    /// Create thresholds with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the same-line gap threshold.
    pub fn with_same_line_gap(mut self, chars: f64) -> Self {
        self.same_line_gap_chars = chars;
        self
    }

    /// Set the same-line vertical overlap fraction.
    pub fn with_vertical_overlap(mut self, frac: f64) -> Self {
        self.vertical_overlap_frac = frac;
        self
    }

    /// Set the adjacent-line horizontal overlap fraction.
    pub fn with_horizontal_overlap(mut self, frac: f64) -> Self {
        self.horizontal_overlap_frac = frac;
        self
    }

    /// Set both adjacent-line gap thresholds.
    pub fn with_adjacent_gaps(mut self, strict: f64, loose: f64) -> Self {
        self.adjacent_gap_chars = strict;
        self.adjacent_gap_chars_loose = loose;
        self
    }

    /// Set the left-margin alignment threshold.
    pub fn with_start_align(mut self, chars: f64) -> Self {
        self.start_align_chars = chars;
        self
    }

    /// Set the short-line width threshold.
    pub fn with_short_line(mut self, chars: f64) -> Self {
        self.short_line_chars = chars;
        self
    }

    /// Set the character-size similarity ratio.
    pub fn with_char_size_ratio(mut self, ratio: f64) -> Self {
        self.char_size_ratio = ratio;
        self
    }

    /// Set the containment fraction.
    pub fn with_containment(mut self, frac: f64) -> Self {
        self.containment_frac = frac;
        self
    }
}

impl Default for MergeThresholds {
    fn default() -> Self {
        Self {
            same_line_gap_chars: 2.0,
            vertical_overlap_frac: 0.5,
            horizontal_overlap_frac: 0.4,
            adjacent_gap_chars: 0.8,
            adjacent_gap_chars_loose: 1.6,
            start_align_chars: 1.0,
            short_line_chars: 12.0,
            char_size_ratio: 0.5,
            containment_frac: 0.8,
        }
    }
}
