//! Saved cards and the deck interchange format.
//!
//! A card is a full snapshot of a draft: its elements, the rendered image
//! (`imgUrl`, a data URL recomputed on every save), and the theme. The deck
//! file format is a JSON array of cards; import rejects the whole payload if
//! any entry fails validation.

use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::error::{CoreError, CoreResult};
use crate::theme::Theme;

/// A saved deck entry. All four fields are required; a card is never
/// partially constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Unique identifier.
    pub id: String,
    /// Elements in render order, top to bottom.
    pub elements: Vec<Element>,
    /// Rendered appearance as a PNG or JPEG data URL.
    pub img_url: String,
    /// Colors the card was saved with.
    pub theme: Theme,
}

impl Card {
    /// Check every contained element against its documented bounds.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the first offending element.
    pub fn validate(&self) -> CoreResult<()> {
        for element in &self.elements {
            element.value.validate().map_err(|e| {
                CoreError::Validation(format!("card {}: element {}: {e}", self.id, element.id))
            })?;
        }
        Ok(())
    }
}

/// Parse and validate a single card from a JSON value.
///
/// Fails (rather than coerces) if `id`, `elements`, `imgUrl`, or `theme` is
/// missing or mismatches shape, and recursively validates every element.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] describing the first problem found.
pub fn parse_card(raw: serde_json::Value) -> CoreResult<Card> {
    let card: Card = serde_json::from_value(raw)
        .map_err(|e| CoreError::Validation(format!("malformed card: {e}")))?;
    card.validate()?;
    Ok(card)
}

/// Parse and validate a whole deck from JSON text.
///
/// The top-level value must be an array; every entry must pass
/// [`parse_card`]-level validation.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if the payload is not an array or any
/// entry is malformed. Nothing is returned partially.
pub fn parse_deck(raw: &str) -> CoreResult<Vec<Card>> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| CoreError::Validation(format!("invalid JSON: {e}")))?;
    let serde_json::Value::Array(entries) = value else {
        return Err(CoreError::Validation(
            "deck file must be a JSON array of cards".to_string(),
        ));
    };
    entries.into_iter().map(parse_card).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementId, ElementValue, ImageValue};

    fn card_json(id: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "elements": [],
            "imgUrl": "data:image/png;base64,",
            "theme": serde_json::to_value(Theme::default()).expect("theme"),
        })
    }

    #[test]
    fn test_parse_card_ok() {
        let card = parse_card(card_json("c1")).expect("parse");
        assert_eq!(card.id, "c1");
        assert!(card.elements.is_empty());
    }

    #[test]
    fn test_parse_card_missing_id_fails() {
        let mut raw = card_json("c1");
        raw.as_object_mut().expect("object").remove("id");
        assert!(parse_card(raw).is_err());
    }

    #[test]
    fn test_parse_card_missing_theme_fails() {
        let mut raw = card_json("c1");
        raw.as_object_mut().expect("object").remove("theme");
        assert!(parse_card(raw).is_err());
    }

    #[test]
    fn test_parse_card_rejects_out_of_range_element() {
        let element = Element::new(
            ElementId::new(),
            ElementValue::Image(ImageValue {
                src: String::new(),
                radius: 50.0,
                width: 100.0,
            }),
        );
        let mut raw = card_json("c1");
        raw["elements"] = serde_json::json!([serde_json::to_value(&element).expect("element")]);
        assert!(parse_card(raw).is_err());
    }

    #[test]
    fn test_parse_deck_requires_array() {
        assert!(parse_deck("{\"not\":\"an array\"}").is_err());
        assert!(parse_deck("null").is_err());
        assert!(parse_deck("[]").expect("empty deck").is_empty());
    }

    #[test]
    fn test_parse_deck_rejects_whole_payload_on_one_bad_entry() {
        let good = card_json("good");
        let mut bad = card_json("bad");
        bad.as_object_mut().expect("object").remove("imgUrl");
        let raw = serde_json::Value::Array(vec![good, bad]).to_string();
        assert!(parse_deck(&raw).is_err());
    }
}
