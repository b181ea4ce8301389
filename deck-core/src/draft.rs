//! The active card draft.
//!
//! [`DraftStore`] owns the ordered element list and theme for the card being
//! edited. It is the single source of truth for the editor and the preview:
//! mutation methods are the only legal write path, every mutation is atomic
//! from the perspective of readers, and observers can follow a revision
//! counter to re-render on change.

use std::sync::{Arc, RwLock};

use tokio::sync::watch;

use crate::element::{
    Element, ElementId, ElementKind, StylePatch, ValuePatch, merge_value, parse_value,
};
use crate::error::CoreResult;
use crate::text::{Paragraph, TextRun};
use crate::theme::{Theme, ThemePatch};

/// Immutable view of the whole draft at one revision.
#[derive(Debug, Clone)]
pub struct DraftSnapshot {
    /// Elements in render order.
    pub elements: Vec<Element>,
    /// Active theme.
    pub theme: Theme,
    /// Source card id, set only when the draft was loaded for re-saving.
    pub card_id: Option<String>,
    /// The element whose settings panel is open, if any.
    pub active_settings_id: Option<ElementId>,
}

#[derive(Debug)]
struct DraftState {
    elements: Vec<Element>,
    theme: Theme,
    card_id: Option<String>,
    active_settings_id: Option<ElementId>,
}

impl DraftState {
    fn empty() -> Self {
        Self {
            elements: Vec::new(),
            theme: Theme::default(),
            card_id: None,
            active_settings_id: None,
        }
    }
}

/// Store for the card under edit.
#[derive(Debug, Clone)]
pub struct DraftStore {
    state: Arc<RwLock<DraftState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftStore {
    /// Create a store holding an empty draft with the default theme.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(DraftState::empty())),
            revision: Arc::new(tx),
        }
    }

    /// Subscribe to draft changes. The receiver yields the latest revision
    /// number; consumers re-read via [`DraftStore::snapshot`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Create a new element of `kind`, assign it a fresh id, and append it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::UnsupportedKind`] for an unknown kind name
    /// and [`crate::CoreError::Validation`] if the initial patch targets a
    /// different kind.
    pub fn register_element(
        &self,
        kind: &str,
        initial: Option<&ValuePatch>,
    ) -> CoreResult<ElementId> {
        let kind = ElementKind::parse(kind)?;
        let value = parse_value(kind, initial)?;
        let element = Element::new(ElementId::new(), value);
        let id = element.id;
        {
            let mut state = self.write();
            state.elements.push(element);
        }
        self.bump();
        Ok(id)
    }

    /// Remove the element with the given id. No-op if absent.
    pub fn unregister_element(&self, id: ElementId) {
        let changed = {
            let mut state = self.write();
            let before = state.elements.len();
            state.elements.retain(|e| e.id != id);
            if state.active_settings_id == Some(id) {
                state.active_settings_id = None;
            }
            state.elements.len() != before
        };
        if changed {
            self.bump();
        }
    }

    /// Relocate one element, preserving the relative order of all others.
    ///
    /// A no-op if either index is outside `[0, len)`; invalid input never
    /// corrupts the list.
    pub fn move_element(&self, from: usize, to: usize) {
        let changed = {
            let mut state = self.write();
            let len = state.elements.len();
            if from >= len || to >= len || from == to {
                false
            } else {
                let element = state.elements.remove(from);
                state.elements.insert(to, element);
                true
            }
        };
        if changed {
            self.bump();
        }
    }

    /// Shallow-merge a payload patch into the element with the given id,
    /// clamping merged numeric fields to their documented bounds.
    ///
    /// No-op if the id is not found.
    pub fn update_element(&self, id: ElementId, patch: &ValuePatch) {
        let changed = {
            let mut state = self.write();
            match state.elements.iter_mut().find(|e| e.id == id) {
                Some(element) => {
                    merge_value(&mut element.value, patch);
                    true
                }
                None => false,
            }
        };
        if changed {
            self.bump();
        }
    }

    /// Shallow-merge a style patch into the element with the given id.
    /// No-op if the id is not found.
    pub fn update_style(&self, id: ElementId, patch: &StylePatch) {
        let changed = {
            let mut state = self.write();
            match state.elements.iter_mut().find(|e| e.id == id) {
                Some(element) => {
                    element.style.apply(patch);
                    true
                }
                None => false,
            }
        };
        if changed {
            self.bump();
        }
    }

    /// Get a copy of the element with the given id.
    #[must_use]
    pub fn get_element(&self, id: ElementId) -> Option<Element> {
        self.read().elements.iter().find(|e| e.id == id).cloned()
    }

    /// Open the settings panel for one element, closing any other. Passing
    /// `None` closes all panels.
    pub fn set_active_settings(&self, id: Option<ElementId>) {
        {
            let mut state = self.write();
            state.active_settings_id = id;
        }
        self.bump();
    }

    /// The element whose settings panel is currently open.
    #[must_use]
    pub fn active_settings_id(&self) -> Option<ElementId> {
        self.read().active_settings_id
    }

    /// Replace the entire draft atomically.
    ///
    /// With `card_id` set, a later save overwrites that deck entry; without
    /// it the draft is an independent duplicate and saves create a new entry.
    pub fn load_card(&self, elements: Vec<Element>, theme: Theme, card_id: Option<String>) {
        {
            let mut state = self.write();
            state.elements = elements;
            state.theme = theme;
            state.card_id = card_id;
            state.active_settings_id = None;
        }
        self.bump();
    }

    /// Shallow-merge a patch into the active theme.
    pub fn set_theme(&self, patch: &ThemePatch) {
        {
            let mut state = self.write();
            state.theme.apply(patch);
        }
        self.bump();
    }

    /// Reset the draft.
    ///
    /// With `with_default` true, restores the canonical sample card and the
    /// default theme; otherwise clears to an empty element list, resetting
    /// the theme and clearing the card and settings ids.
    pub fn reset(&self, with_default: bool) {
        {
            let mut state = self.write();
            *state = DraftState::empty();
            if with_default {
                state.elements = sample_elements();
            }
        }
        self.bump();
    }

    /// Elements in render order.
    #[must_use]
    pub fn elements(&self) -> Vec<Element> {
        self.read().elements.clone()
    }

    /// The active theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.read().theme.clone()
    }

    /// The source card id, if the draft was loaded for re-saving.
    #[must_use]
    pub fn card_id(&self) -> Option<String> {
        self.read().card_id.clone()
    }

    /// Immutable view of the whole draft.
    #[must_use]
    pub fn snapshot(&self) -> DraftSnapshot {
        let state = self.read();
        DraftSnapshot {
            elements: state.elements.clone(),
            theme: state.theme.clone(),
            card_id: state.card_id.clone(),
            active_settings_id: state.active_settings_id,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, DraftState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, DraftState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

/// The canonical sample card shown by `reset(true)`: a banner title, an
/// image slot, and a box of body text.
#[must_use]
pub fn sample_elements() -> Vec<Element> {
    use crate::element::{ElementValue, ImageValue, TextValue, TextVariant};

    let title = TextValue {
        content: vec![Paragraph {
            runs: vec![TextRun {
                text: "Ancient Golem".to_string(),
                bold: true,
                ..TextRun::plain("")
            }],
            ..Paragraph::plain("")
        }],
        variant: TextVariant::Banner,
        ..TextValue::default()
    };
    let body = TextValue {
        content: vec![Paragraph::plain(
            "Once per turn, this card may absorb one incoming attack.",
        )],
        variant: TextVariant::Box,
        expand: true,
        ..TextValue::default()
    };
    vec![
        Element::new(ElementId::new(), ElementValue::Text(title)),
        Element::new(ElementId::new(), ElementValue::Image(ImageValue::default())),
        Element::new(ElementId::new(), ElementValue::Text(body)),
    ]
}
