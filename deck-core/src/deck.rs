//! The saved deck.
//!
//! [`DeckStore`] owns the list of finished cards. Every card it holds passed
//! validation or was constructed by the store itself; bulk import is
//! all-or-nothing, leaving the existing deck untouched on failure.

use std::sync::{Arc, RwLock};

use tokio::sync::watch;
use uuid::Uuid;

use crate::card::{Card, parse_deck};
use crate::element::Element;
use crate::error::{CoreError, CoreResult};
use crate::theme::Theme;

/// Partial update for a saved card. `id` is never altered by an update.
#[derive(Debug, Clone, Default)]
pub struct CardPatch {
    /// Replacement element list, if any.
    pub elements: Option<Vec<Element>>,
    /// Replacement rendered image, if any.
    pub img_url: Option<String>,
    /// Replacement theme, if any.
    pub theme: Option<Theme>,
}

/// Store for the list of saved cards.
#[derive(Debug, Clone)]
pub struct DeckStore {
    cards: Arc<RwLock<Vec<Card>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for DeckStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DeckStore {
    /// Create an empty deck.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            cards: Arc::new(RwLock::new(Vec::new())),
            revision: Arc::new(tx),
        }
    }

    /// Subscribe to deck changes via a revision counter.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Append a new card built from the given draft snapshot, returning its
    /// freshly generated id.
    ///
    /// Element bounds are clamped on the way in, so the store only ever holds
    /// schema-valid cards even from an untrusted caller.
    pub fn add_card(&self, mut elements: Vec<Element>, img_url: String, theme: Theme) -> String {
        for element in &mut elements {
            element.value.clamp_bounds();
        }
        let id = Uuid::new_v4().to_string();
        let card = Card {
            id: id.clone(),
            elements,
            img_url,
            theme,
        };
        {
            let mut cards = self.write();
            cards.push(card);
        }
        self.bump();
        id
    }

    /// Merge the patch into the card with the given id. No-op if absent.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if a patched element list contains
    /// out-of-bounds values; the stored card is left unchanged.
    pub fn update_card(&self, id: &str, patch: CardPatch) -> CoreResult<()> {
        if let Some(elements) = &patch.elements {
            for element in elements {
                element.value.validate()?;
            }
        }
        let changed = {
            let mut cards = self.write();
            match cards.iter_mut().find(|c| c.id == id) {
                Some(card) => {
                    if let Some(elements) = patch.elements {
                        card.elements = elements;
                    }
                    if let Some(img_url) = patch.img_url {
                        card.img_url = img_url;
                    }
                    if let Some(theme) = patch.theme {
                        card.theme = theme;
                    }
                    true
                }
                None => false,
            }
        };
        if changed {
            self.bump();
        }
        Ok(())
    }

    /// Delete the card with the given id. No-op if absent.
    pub fn remove_card(&self, id: &str) {
        let changed = {
            let mut cards = self.write();
            let before = cards.len();
            cards.retain(|c| c.id != id);
            cards.len() != before
        };
        if changed {
            self.bump();
        }
    }

    /// Wholesale-replace the deck, e.g. after a drag reorder.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if any card fails validation; the
    /// existing deck is left untouched.
    pub fn set_cards(&self, new_cards: Vec<Card>) -> CoreResult<()> {
        for card in &new_cards {
            card.validate()?;
        }
        {
            let mut cards = self.write();
            *cards = new_cards;
        }
        self.bump();
        Ok(())
    }

    /// Validate a JSON payload as a deck and replace the store contents.
    ///
    /// Returns the number of cards imported. On failure the existing deck is
    /// left untouched so the UI can show a recoverable message.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the payload is not a JSON array
    /// of valid cards.
    pub fn load_file(&self, raw_json: &str) -> CoreResult<usize> {
        let parsed = parse_deck(raw_json)?;
        let count = parsed.len();
        {
            let mut cards = self.write();
            *cards = parsed;
        }
        self.bump();
        tracing::info!("Imported {count} cards");
        Ok(count)
    }

    /// Serialize the deck to the JSON interchange format.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if encoding fails.
    pub fn export_json(&self) -> CoreResult<String> {
        let cards = self.read();
        serde_json::to_string_pretty(&*cards).map_err(CoreError::Serialization)
    }

    /// Timestamped filename for a full-deck JSON export.
    #[must_use]
    pub fn export_file_name() -> String {
        format!(
            "cards_data_{}.json",
            chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S")
        )
    }

    /// Get a copy of the card with the given id.
    #[must_use]
    pub fn get_card(&self, id: &str) -> Option<Card> {
        self.read().iter().find(|c| c.id == id).cloned()
    }

    /// All cards in stored order.
    #[must_use]
    pub fn cards(&self) -> Vec<Card> {
        self.read().clone()
    }

    /// Number of saved cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the deck has no cards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Card>> {
        self.cards
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Card>> {
        self.cards
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::sample_elements;
    use crate::element::{ElementId, ElementValue, ImageValue};

    fn img_url() -> String {
        "data:image/png;base64,AAAA".to_string()
    }

    #[test]
    fn test_add_card_snapshots_draft() {
        let deck = DeckStore::new();
        let mut elements = sample_elements();
        let id = deck.add_card(elements.clone(), img_url(), Theme::default());
        assert_eq!(deck.len(), 1);

        // Later draft mutation must not affect the saved card.
        elements.clear();
        let saved = deck.get_card(&id).expect("card");
        assert_eq!(saved.elements.len(), 3);
    }

    #[test]
    fn test_update_card_merges_without_touching_id() {
        let deck = DeckStore::new();
        let id = deck.add_card(Vec::new(), img_url(), Theme::default());

        deck.update_card(
            &id,
            CardPatch {
                img_url: Some("data:image/jpeg;base64,BBBB".to_string()),
                ..CardPatch::default()
            },
        )
        .expect("update");

        let card = deck.get_card(&id).expect("card");
        assert_eq!(card.id, id);
        assert!(card.img_url.starts_with("data:image/jpeg"));
        assert_eq!(card.theme, Theme::default());
    }

    #[test]
    fn test_add_card_clamps_out_of_bounds_elements() {
        let deck = DeckStore::new();
        let bad = vec![Element::new(
            ElementId::new(),
            ElementValue::Image(ImageValue {
                src: String::new(),
                radius: 99.0,
                width: 100.0,
            }),
        )];
        let id = deck.add_card(bad, img_url(), Theme::default());

        let card = deck.get_card(&id).expect("card");
        card.validate().expect("stored card satisfies the schema");

        // A deck built through add_card stays importable.
        let json = deck.export_json().expect("export");
        assert_eq!(DeckStore::new().load_file(&json).expect("import"), 1);
    }

    #[test]
    fn test_update_card_rejects_out_of_bounds_elements() {
        let deck = DeckStore::new();
        let id = deck.add_card(Vec::new(), img_url(), Theme::default());
        let bad = vec![Element::new(
            ElementId::new(),
            ElementValue::Image(ImageValue {
                src: String::new(),
                radius: 99.0,
                width: 100.0,
            }),
        )];
        assert!(
            deck.update_card(
                &id,
                CardPatch {
                    elements: Some(bad),
                    ..CardPatch::default()
                }
            )
            .is_err()
        );
        assert!(deck.get_card(&id).expect("card").elements.is_empty());
    }

    #[test]
    fn test_update_missing_card_is_noop() {
        let deck = DeckStore::new();
        deck.update_card("nope", CardPatch::default()).expect("ok");
        assert!(deck.is_empty());
    }

    #[test]
    fn test_remove_card() {
        let deck = DeckStore::new();
        let id = deck.add_card(Vec::new(), img_url(), Theme::default());
        deck.remove_card(&id);
        assert!(deck.is_empty());
        deck.remove_card(&id); // absent: no-op
    }

    #[test]
    fn test_export_import_roundtrip() {
        let deck = DeckStore::new();
        deck.add_card(sample_elements(), img_url(), Theme::default());
        deck.add_card(Vec::new(), img_url(), Theme::default());
        let json = deck.export_json().expect("export");

        let restored = DeckStore::new();
        let count = restored.load_file(&json).expect("import");
        assert_eq!(count, 2);
        assert_eq!(restored.cards(), deck.cards());
    }

    #[test]
    fn test_load_file_failure_leaves_deck_untouched() {
        let deck = DeckStore::new();
        deck.add_card(Vec::new(), img_url(), Theme::default());
        let before = deck.cards();

        // One entry missing its id.
        let bad = r#"[{"elements":[],"imgUrl":"data:,","theme":{}}]"#;
        assert!(deck.load_file(bad).is_err());
        assert_eq!(deck.cards(), before);
    }

    #[test]
    fn test_export_file_name_shape() {
        let name = DeckStore::export_file_name();
        assert!(name.starts_with("cards_data_"));
        assert!(name.ends_with(".json"));
    }
}
