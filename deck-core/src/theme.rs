//! Card themes.
//!
//! A theme is six required color strings: the base card fill and stroke, plus
//! a fill/text pair for each text variant (banner, box). The process-wide
//! default is a compile-time constant; an active theme is a mutable copy.

use serde::{Deserialize, Serialize};

/// Default base fill color.
pub const DEFAULT_BASE_FILL: &str = "#f5ecd7";
/// Default base stroke color.
pub const DEFAULT_BASE_STROKE: &str = "#8a6d3b";
/// Default banner fill color.
pub const DEFAULT_BANNER_FILL: &str = "#8a2c2c";
/// Default banner text color.
pub const DEFAULT_BANNER_TEXT: &str = "#f9f1dc";
/// Default box fill color.
pub const DEFAULT_BOX_FILL: &str = "#fffdf5";
/// Default box text color.
pub const DEFAULT_BOX_TEXT: &str = "#3a2c1a";

/// The set of colors applied to a card's rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    /// Card background fill.
    pub base_fill: String,
    /// Card border stroke.
    pub base_stroke: String,
    /// Banner variant fill.
    pub banner_fill: String,
    /// Banner variant text color.
    pub banner_text: String,
    /// Box variant fill.
    pub box_fill: String,
    /// Box variant text color.
    pub box_text: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            base_fill: DEFAULT_BASE_FILL.to_string(),
            base_stroke: DEFAULT_BASE_STROKE.to_string(),
            banner_fill: DEFAULT_BANNER_FILL.to_string(),
            banner_text: DEFAULT_BANNER_TEXT.to_string(),
            box_fill: DEFAULT_BOX_FILL.to_string(),
            box_text: DEFAULT_BOX_TEXT.to_string(),
        }
    }
}

/// Partial update for [`Theme`]. Shallow merge: present fields win.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemePatch {
    /// New base fill, if any.
    pub base_fill: Option<String>,
    /// New base stroke, if any.
    pub base_stroke: Option<String>,
    /// New banner fill, if any.
    pub banner_fill: Option<String>,
    /// New banner text color, if any.
    pub banner_text: Option<String>,
    /// New box fill, if any.
    pub box_fill: Option<String>,
    /// New box text color, if any.
    pub box_text: Option<String>,
}

impl Theme {
    /// Merge a patch into this theme.
    pub fn apply(&mut self, patch: &ThemePatch) {
        let fields = [
            (&mut self.base_fill, &patch.base_fill),
            (&mut self.base_stroke, &patch.base_stroke),
            (&mut self.banner_fill, &patch.banner_fill),
            (&mut self.banner_text, &patch.banner_text),
            (&mut self.box_fill, &patch.box_fill),
            (&mut self.box_text, &patch.box_text),
        ];
        for (field, update) in fields {
            if let Some(value) = update {
                *field = value.clone();
            }
        }
    }
}
