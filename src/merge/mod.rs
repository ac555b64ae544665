//! Geometric consolidation of fragmentary OCR detections.
//!
//! OCR output for a printed page arrives as hundreds of token-level boxes,
//! many overlapping or duplicated. This module collapses them into text
//! lines and paragraphs: [`predicates`] holds the pure pairwise spatial
//! tests, [`MergeThresholds`] their tunable configuration, and [`BoxMerger`]
//! the three-pass clustering pipeline.

mod merger;
pub mod predicates;
mod thresholds;

pub use merger::BoxMerger;
pub use thresholds::MergeThresholds;
