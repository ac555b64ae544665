//! Parsing options shared across question-type variants.

/// Placeholder spliced into a merged text where a printed blank sat.
pub const BLANK_SIGNIFIER: &str = " __BLANK__ ";

/// Tunable heuristics for continuation and blank handling.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserOptions {
    /// Min fraction of the taller box's height two boxes' vertical spans
    /// must share to count as the same visual line
    pub overlap_tolerance: f64,

    /// Horizontal gap (page units) beyond which two same-line spans are a
    /// fill-in blank rendered as printed whitespace
    pub blank_threshold: f64,

    /// Fuzz for the reading-order sort of question boxes
    pub sort_fuzz: f64,
}

impl ParserOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the same-line overlap tolerance.
    pub fn with_overlap_tolerance(mut self, tolerance: f64) -> Self {
        self.overlap_tolerance = tolerance;
        self
    }

    /// Set the blank gap threshold.
    pub fn with_blank_threshold(mut self, threshold: f64) -> Self {
        self.blank_threshold = threshold;
        self
    }

    /// Set the sort fuzz.
    pub fn with_sort_fuzz(mut self, fuzz: f64) -> Self {
        self.sort_fuzz = fuzz;
        self
    }
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            overlap_tolerance: 0.5,
            blank_threshold: 40.0,
            sort_fuzz: 10.0,
        }
    }
}
