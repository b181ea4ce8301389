//! Rich text content tree for text elements.
//!
//! The core treats this tree as opaque serializable data: paragraphs of styled
//! runs, with block-level alignment and line height and mark-level bold,
//! italic, and font size. Editing mechanics live in the embedded text engine.

use serde::{Deserialize, Serialize};

/// Default font size in points for a run with no explicit size.
pub const DEFAULT_FONT_SIZE: f32 = 14.0;

/// Default line height multiplier for a paragraph.
pub const DEFAULT_LINE_HEIGHT: f32 = 1.2;

/// Per-paragraph text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Left-aligned text.
    Left,
    /// Centered text.
    #[default]
    Center,
    /// Right-aligned text.
    Right,
}

/// A styled run of text within a paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    /// The literal text content.
    pub text: String,
    /// Bold mark.
    #[serde(default)]
    pub bold: bool,
    /// Italic mark.
    #[serde(default)]
    pub italic: bool,
    /// Font size in points.
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

impl TextRun {
    /// Create an unstyled run.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

/// A paragraph: block-level attributes plus its runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    /// Block alignment.
    #[serde(default)]
    pub align: TextAlign,
    /// Line height multiplier.
    #[serde(default = "default_line_height")]
    pub line_height: f32,
    /// Styled runs, in order.
    pub runs: Vec<TextRun>,
}

impl Paragraph {
    /// Create a single-run paragraph with default block attributes.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            align: TextAlign::default(),
            line_height: DEFAULT_LINE_HEIGHT,
            runs: vec![TextRun::plain(text)],
        }
    }

    /// Concatenate the paragraph's runs into plain text.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// The content tree of a text element: paragraphs top to bottom.
pub type RichText = Vec<Paragraph>;

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

fn default_line_height() -> f32 {
    DEFAULT_LINE_HEIGHT
}
