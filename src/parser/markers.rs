//! Structural marker detection.
//!
//! Questions open with a numeric marker ("1.", "12)"), answer choices with a
//! letter marker ("A.", "b)"). A box's leading two or three characters are
//! tested against the configured alphabets; Multiple Choice pages
//! additionally carry circled-option artifacts the OCR renders as stray
//! parentheses and `O` glyphs, which are stripped before matching.

use regex::Regex;

/// Which kind of structural marker matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartType {
    /// A numeric question starter, e.g. `7.` or `12)`
    Numeric,
    /// A letter answer-choice starter, e.g. `A.` or `b)`
    Letter,
}

/// A matched marker: its kind and the exact prefix that matched.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerMatch {
    pub start_type: StartType,
    pub prefix: String,
}

impl MarkerMatch {
    fn new(start_type: StartType, prefix: impl Into<String>) -> Self {
        Self {
            start_type,
            prefix: prefix.into(),
        }
    }

    /// The marker with trailing punctuation removed: `b)` -> `b`.
    pub fn label(&self) -> String {
        self.prefix.trim_end_matches(['.', ')']).to_string()
    }
}

/// The marker alphabets for one question-type variant.
#[derive(Debug, Clone)]
pub struct MarkerAlphabet {
    numeric: Vec<String>,
    letter: Vec<String>,
    bare_letters: Vec<char>,
    option_pattern: Regex,
}

impl MarkerAlphabet {
    /// Build an alphabet accepting numeric starters up to `numeric_limit`
    /// and letter starters over the first `letter_count` letters (upper and
    /// lower case, with `.` or `)` punctuation). `letter_count` of zero
    /// disables letter markers entirely.
    pub fn new(numeric_limit: u32, letter_count: usize) -> Self {
        let mut numeric = Vec::new();
        for n in 0..=numeric_limit {
            numeric.push(format!("{}.", n));
            numeric.push(format!("{})", n));
        }
        let mut letter = Vec::new();
        let mut bare_letters = Vec::new();
        for (upper, lower) in ('A'..='Z').zip('a'..='z').take(letter_count) {
            for punct in ['.', ')'] {
                letter.push(format!("{}{}", upper, punct));
                letter.push(format!("{}{}", lower, punct));
            }
            bare_letters.push(upper);
        }
        Self {
            numeric,
            letter,
            bare_letters,
            // A capital option letter, optionally glued to a lowercase OCR
            // stray, followed by whitespace: "A 3", "Bx 4"
            option_pattern: Regex::new(r"([A-Z])[a-z]?\s").unwrap(),
        }
    }

    /// Whether letter markers are enabled.
    pub fn has_letters(&self) -> bool {
        !self.letter.is_empty()
    }

    /// Test a box text's leading characters against the alphabets.
    ///
    /// Numeric prefixes are tried at two then three characters, then letter
    /// prefixes at two. The precedence is load-bearing: `1.` must win over
    /// a later letter match inside the same text.
    pub fn check_starting_chars(&self, text: &str) -> Option<MarkerMatch> {
        let two: String = text.chars().take(2).collect();
        let three: String = text.chars().take(3).collect();
        if self.numeric.iter().any(|s| *s == two) {
            return Some(MarkerMatch::new(StartType::Numeric, two));
        }
        if self.numeric.iter().any(|s| *s == three) {
            return Some(MarkerMatch::new(StartType::Numeric, three));
        }
        if self.letter.iter().any(|s| *s == two) {
            return Some(MarkerMatch::new(StartType::Letter, two));
        }
        None
    }

    /// Fallbacks for circled Multiple Choice options the OCR mangles: a
    /// capital letter followed by whitespace anywhere in the text, or a bare
    /// option letter at the end of the line.
    pub fn detect_option_letter(&self, text: &str) -> Option<MarkerMatch> {
        if !self.has_letters() {
            return None;
        }
        if let Some(caps) = self.option_pattern.captures(text) {
            let letter = caps[1].chars().next().unwrap();
            if self.bare_letters.contains(&letter) {
                return Some(MarkerMatch::new(StartType::Letter, letter.to_string()));
            }
        }
        if let Some(last) = text.chars().last() {
            if self.bare_letters.contains(&last) {
                return Some(MarkerMatch::new(StartType::Letter, last.to_string()));
            }
        }
        None
    }
}

/// Strip the OCR artifacts circled options leave behind — stray parentheses
/// and the `O` glyphs the circle outline is read as.
pub fn amplify_option_starters(text: &str) -> String {
    text.replace(['(', ')', 'O'], "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mc_alphabet() -> MarkerAlphabet {
        MarkerAlphabet::new(40, 6)
    }

    #[test]
    fn test_numeric_two_and_three_chars() {
        let a = mc_alphabet();
        let m = a.check_starting_chars("7. What is osmosis?").unwrap();
        assert_eq!(m.start_type, StartType::Numeric);
        assert_eq!(m.prefix, "7.");

        let m = a.check_starting_chars("12) Which of these").unwrap();
        assert_eq!(m.start_type, StartType::Numeric);
        assert_eq!(m.prefix, "12)");
    }

    #[test]
    fn test_letter_starters() {
        let a = mc_alphabet();
        let m = a.check_starting_chars("B. chloroplast").unwrap();
        assert_eq!(m.start_type, StartType::Letter);
        assert_eq!(m.prefix, "B.");
        assert_eq!(m.label(), "B");

        let m = a.check_starting_chars("c) cytoplasm").unwrap();
        assert_eq!(m.start_type, StartType::Letter);
    }

    #[test]
    fn test_numeric_precedence_over_letter() {
        // "1." matches numerically even though letters are enabled
        let a = mc_alphabet();
        let m = a.check_starting_chars("1. A cell is").unwrap();
        assert_eq!(m.start_type, StartType::Numeric);
    }

    #[test]
    fn test_no_letters_for_true_false() {
        let a = MarkerAlphabet::new(40, 0);
        assert!(a.check_starting_chars("B. true").is_none());
        assert!(a.detect_option_letter("B true").is_none());
        assert!(a.check_starting_chars("3. Water is wet.").is_some());
    }

    #[test]
    fn test_detect_option_letter_from_pattern() {
        let a = mc_alphabet();
        let m = a.detect_option_letter("A 3").unwrap();
        assert_eq!(m.prefix, "A");

        // out-of-alphabet capitals are not options
        assert!(a.detect_option_letter("X 3").is_none());
    }

    #[test]
    fn test_detect_option_letter_trailing() {
        let a = mc_alphabet();
        let m = a.detect_option_letter("mitochondria D").unwrap();
        assert_eq!(m.prefix, "D");
    }

    #[test]
    fn test_amplify_circled_artifacts() {
        assert_eq!(amplify_option_starters("(A) 3"), "A 3");
        assert_eq!(amplify_option_starters("OB. 4"), "B. 4");
    }

    #[test]
    fn test_marker_empty_text() {
        let a = mc_alphabet();
        assert!(a.check_starting_chars("").is_none());
        assert!(a.detect_option_letter("").is_none());
    }
}
