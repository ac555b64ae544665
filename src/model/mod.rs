//! Data model for page annotations and the parsed question hierarchy.
//!
//! This module defines the intermediate representation that bridges the
//! annotation store (positioned OCR detections per page) and the structured
//! output (questions, answer choices, instructions) consumed downstream.

mod geometry;
mod page;
mod question;
mod text_box;

pub use geometry::Rect;
pub use page::PageAnnotation;
pub use question::{
    AnswerChoice, CorrectAnswer, Instruction, Misfit, ParsedPage, ParsedQuestions, Question,
    SpanBox, MISSING_ANSWER,
};
pub use text_box::{sort_reading_order, Category, Source, TextBox};
