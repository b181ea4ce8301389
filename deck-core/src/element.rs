//! Card elements - the building blocks of a card.
//!
//! An element is a tagged union: a generic layout style shared by every kind,
//! plus a `type`-discriminated payload (`text` or `image`). All numeric bounds
//! are enforced when a value is built or merged, never stored out of range.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::text::RichText;

/// Minimum element width, as a percentage of the card width.
pub const MIN_WIDTH_PCT: f32 = 50.0;
/// Maximum element width, as a percentage of the card width.
pub const MAX_WIDTH_PCT: f32 = 100.0;
/// Default element width.
pub const DEFAULT_WIDTH_PCT: f32 = 100.0;
/// Minimum image corner radius.
pub const MIN_RADIUS: f32 = 0.0;
/// Maximum image corner radius.
pub const MAX_RADIUS: f32 = 10.0;
/// Default image corner radius.
pub const DEFAULT_RADIUS: f32 = 4.0;

/// Unique identifier for an element.
///
/// Assigned at creation by the draft store, immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two element kinds the model knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// A rich text block.
    Text,
    /// A positioned image.
    Image,
}

impl ElementKind {
    /// Parse a kind from its wire name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedKind`] for anything other than `text`
    /// or `image`. Unknown kinds are a programmer error at the call site and
    /// should fail loudly.
    pub fn parse(name: &str) -> CoreResult<Self> {
        match name {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            other => Err(CoreError::UnsupportedKind(other.to_string())),
        }
    }

    /// The wire name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic layout alignment, independent of element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    /// Align to the leading edge.
    Start,
    /// Centered.
    #[default]
    Center,
    /// Align to the trailing edge.
    End,
}

/// Layout style shared by all element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementStyle {
    /// Whether the element consumes flexible vertical space.
    #[serde(default)]
    pub grow: bool,
    /// Horizontal alignment within the card.
    #[serde(default)]
    pub align: Align,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            grow: false,
            align: Align::Center,
        }
    }
}

/// Partial update for [`ElementStyle`]. Shallow merge: present fields win.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePatch {
    /// New `grow` flag, if any.
    pub grow: Option<bool>,
    /// New alignment, if any.
    pub align: Option<Align>,
}

impl ElementStyle {
    /// Merge a patch into this style.
    pub fn apply(&mut self, patch: &StylePatch) {
        if let Some(grow) = patch.grow {
            self.grow = grow;
        }
        if let Some(align) = patch.align {
            self.align = align;
        }
    }
}

/// Visual treatment of a text element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextVariant {
    /// A banner strip across the card.
    #[default]
    Banner,
    /// A bordered content box.
    Box,
}

/// Payload of a text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextValue {
    /// The rich content tree.
    #[serde(default)]
    pub content: RichText,
    /// Visual variant.
    #[serde(default)]
    pub variant: TextVariant,
    /// Whether the block expands when the parent grows.
    #[serde(default)]
    pub expand: bool,
    /// Width as a percentage of the card width, 50-100.
    #[serde(default = "default_width")]
    pub width: f32,
}

impl Default for TextValue {
    fn default() -> Self {
        Self {
            content: RichText::new(),
            variant: TextVariant::Banner,
            expand: false,
            width: DEFAULT_WIDTH_PCT,
        }
    }
}

/// Payload of an image element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageValue {
    /// Image source: URL, data URL, or local path.
    #[serde(default)]
    pub src: String,
    /// Corner radius, 0-10.
    #[serde(default = "default_radius")]
    pub radius: f32,
    /// Width as a percentage of the card width, 50-100.
    #[serde(default = "default_width")]
    pub width: f32,
}

impl Default for ImageValue {
    fn default() -> Self {
        Self {
            src: String::new(),
            radius: DEFAULT_RADIUS,
            width: DEFAULT_WIDTH_PCT,
        }
    }
}

/// Type-discriminated element payload.
///
/// The payload shape is fully determined by the discriminant; no instance can
/// mix fields across kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ElementValue {
    /// Rich text payload.
    Text(TextValue),
    /// Image payload.
    Image(ImageValue),
}

impl ElementValue {
    /// The kind discriminant of this value.
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Text(_) => ElementKind::Text,
            Self::Image(_) => ElementKind::Image,
        }
    }

    /// Clamp all numeric fields into their documented bounds.
    pub fn clamp_bounds(&mut self) {
        match self {
            Self::Text(v) => v.width = clamp_width(v.width),
            Self::Image(v) => {
                v.width = clamp_width(v.width);
                v.radius = v.radius.clamp(MIN_RADIUS, MAX_RADIUS);
            }
        }
    }

    /// Check that all numeric fields are within bounds without mutating.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the offending field.
    pub fn validate(&self) -> CoreResult<()> {
        let check = |name: &str, value: f32, min: f32, max: f32| {
            if (min..=max).contains(&value) {
                Ok(())
            } else {
                Err(CoreError::Validation(format!(
                    "{name} {value} out of range [{min}, {max}]"
                )))
            }
        };
        match self {
            Self::Text(v) => check("text width", v.width, MIN_WIDTH_PCT, MAX_WIDTH_PCT),
            Self::Image(v) => {
                check("image width", v.width, MIN_WIDTH_PCT, MAX_WIDTH_PCT)?;
                check("image radius", v.radius, MIN_RADIUS, MAX_RADIUS)
            }
        }
    }
}

/// Partial update for a text payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPatch {
    /// Replacement content tree, if any.
    pub content: Option<RichText>,
    /// New variant, if any.
    pub variant: Option<TextVariant>,
    /// New expand flag, if any.
    pub expand: Option<bool>,
    /// New width, if any. Clamped on merge.
    pub width: Option<f32>,
}

/// Partial update for an image payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePatch {
    /// New source, if any.
    pub src: Option<String>,
    /// New corner radius, if any. Clamped on merge.
    pub radius: Option<f32>,
    /// New width, if any. Clamped on merge.
    pub width: Option<f32>,
}

/// Kind-discriminated partial update for an element payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ValuePatch {
    /// Patch for a text payload.
    Text(TextPatch),
    /// Patch for an image payload.
    Image(ImagePatch),
}

impl ValuePatch {
    /// The kind this patch applies to.
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Text(_) => ElementKind::Text,
            Self::Image(_) => ElementKind::Image,
        }
    }
}

/// Build a complete, bounds-clamped payload of the given kind from a partial
/// input. Missing fields take their documented defaults.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if the patch targets a different kind
/// than requested.
pub fn parse_value(kind: ElementKind, patch: Option<&ValuePatch>) -> CoreResult<ElementValue> {
    let mut value = match kind {
        ElementKind::Text => ElementValue::Text(TextValue::default()),
        ElementKind::Image => ElementValue::Image(ImageValue::default()),
    };
    if let Some(patch) = patch {
        if patch.kind() != kind {
            return Err(CoreError::Validation(format!(
                "patch for kind {} cannot initialize a {} element",
                patch.kind(),
                kind
            )));
        }
        merge_value(&mut value, patch);
    }
    Ok(value)
}

/// Shallow-merge a patch into a payload, clamping numeric fields afterwards.
///
/// A patch for the wrong kind is ignored; the caller is expected to have
/// matched kinds, and a silent no-op is safer than corrupting the payload.
pub fn merge_value(value: &mut ElementValue, patch: &ValuePatch) {
    match (value, patch) {
        (ElementValue::Text(v), ValuePatch::Text(p)) => {
            if let Some(content) = &p.content {
                v.content = content.clone();
            }
            if let Some(variant) = p.variant {
                v.variant = variant;
            }
            if let Some(expand) = p.expand {
                v.expand = expand;
            }
            if let Some(width) = p.width {
                v.width = clamp_width(width);
            }
        }
        (ElementValue::Image(v), ValuePatch::Image(p)) => {
            if let Some(src) = &p.src {
                v.src = src.clone();
            }
            if let Some(radius) = p.radius {
                v.radius = radius.clamp(MIN_RADIUS, MAX_RADIUS);
            }
            if let Some(width) = p.width {
                v.width = clamp_width(width);
            }
        }
        (value, patch) => {
            tracing::warn!(
                "Ignoring {} patch applied to {} element",
                patch.kind(),
                value.kind()
            );
        }
    }
}

/// A card element: stable id, shared layout style, and a typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Generic layout style.
    #[serde(default)]
    pub style: ElementStyle,
    /// Type-discriminated payload.
    #[serde(flatten)]
    pub value: ElementValue,
}

impl Element {
    /// Create an element with the given id and payload and default style.
    #[must_use]
    pub fn new(id: ElementId, value: ElementValue) -> Self {
        Self {
            id,
            style: ElementStyle::default(),
            value,
        }
    }

    /// Set the style.
    #[must_use]
    pub fn with_style(mut self, style: ElementStyle) -> Self {
        self.style = style;
        self
    }

    /// The kind discriminant.
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.value.kind()
    }

    /// The image source, if this is an image element.
    #[must_use]
    pub fn image_src(&self) -> Option<&str> {
        match &self.value {
            ElementValue::Image(v) => Some(v.src.as_str()),
            ElementValue::Text(_) => None,
        }
    }
}

fn clamp_width(width: f32) -> f32 {
    width.clamp(MIN_WIDTH_PCT, MAX_WIDTH_PCT)
}

fn default_width() -> f32 {
    DEFAULT_WIDTH_PCT
}

fn default_radius() -> f32 {
    DEFAULT_RADIUS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::Paragraph;

    #[test]
    fn test_kind_parse() {
        assert_eq!(ElementKind::parse("text").expect("text"), ElementKind::Text);
        assert_eq!(
            ElementKind::parse("image").expect("image"),
            ElementKind::Image
        );
        assert!(matches!(
            ElementKind::parse("video"),
            Err(CoreError::UnsupportedKind(_))
        ));
    }

    #[test]
    fn test_parse_value_defaults() {
        let value = parse_value(ElementKind::Image, None).expect("parse");
        let ElementValue::Image(img) = value else {
            panic!("expected image payload");
        };
        assert_eq!(img.src, "");
        assert!((img.radius - DEFAULT_RADIUS).abs() < f32::EPSILON);
        assert!((img.width - DEFAULT_WIDTH_PCT).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_value_clamps_bounds() {
        let patch = ValuePatch::Image(ImagePatch {
            src: None,
            radius: Some(99.0),
            width: Some(10.0),
        });
        let value = parse_value(ElementKind::Image, Some(&patch)).expect("parse");
        let ElementValue::Image(img) = value else {
            panic!("expected image payload");
        };
        assert!((img.radius - MAX_RADIUS).abs() < f32::EPSILON);
        assert!((img.width - MIN_WIDTH_PCT).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_value_kind_mismatch() {
        let patch = ValuePatch::Text(TextPatch::default());
        let result = parse_value(ElementKind::Image, Some(&patch));
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_merge_preserves_unpatched_fields() {
        let mut value = ElementValue::Text(TextValue {
            content: vec![Paragraph::plain("Keep me")],
            variant: TextVariant::Box,
            expand: true,
            width: 80.0,
        });
        merge_value(
            &mut value,
            &ValuePatch::Text(TextPatch {
                width: Some(60.0),
                ..TextPatch::default()
            }),
        );
        let ElementValue::Text(text) = value else {
            panic!("expected text payload");
        };
        assert_eq!(text.content[0].plain_text(), "Keep me");
        assert_eq!(text.variant, TextVariant::Box);
        assert!(text.expand);
        assert!((text.width - 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_merge_wrong_kind_is_noop() {
        let mut value = ElementValue::Image(ImageValue::default());
        let before = value.clone();
        merge_value(&mut value, &ValuePatch::Text(TextPatch::default()));
        assert_eq!(value, before);
    }

    #[test]
    fn test_element_wire_shape() {
        let element = Element::new(
            ElementId::new(),
            ElementValue::Image(ImageValue::default()),
        );
        let json = serde_json::to_value(&element).expect("serialize");
        assert_eq!(json["type"], "image");
        assert!(json["value"]["src"].is_string());
        assert_eq!(json["style"]["align"], "center");
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let value = ElementValue::Image(ImageValue {
            src: String::new(),
            radius: 11.0,
            width: 100.0,
        });
        assert!(value.validate().is_err());
    }
}
