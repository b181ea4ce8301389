//! # Deckcraft Core
//!
//! Element and state management core for the visual card editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  deck-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Element Model   │  Draft Store             │
//! │  - tagged union  │  - ordered elements      │
//! │  - bounds        │  - active theme          │
//! │  - rich text     │  - settings panel id     │
//! ├─────────────────────────────────────────────┤
//! │  Deck Store      │  Notifications           │
//! │  - saved cards   │  - severity contract     │
//! │  - JSON import/  │  - tracing sink          │
//! │    export        │                          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The presentation layer calls store mutation methods in response to user
//! gestures and re-reads snapshots when the revision watch channel changes;
//! it never bypasses the mutation API.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod card;
pub mod deck;
pub mod draft;
pub mod element;
pub mod error;
pub mod notify;
pub mod text;
pub mod theme;

pub use card::{Card, parse_card, parse_deck};
pub use deck::{CardPatch, DeckStore};
pub use draft::{DraftSnapshot, DraftStore, sample_elements};
pub use element::{
    Align, Element, ElementId, ElementKind, ElementStyle, ElementValue, ImagePatch, ImageValue,
    StylePatch, TextPatch, TextValue, TextVariant, ValuePatch, merge_value, parse_value,
};
pub use error::{CoreError, CoreResult};
pub use notify::{Notifier, NullNotifier, Severity, TracingNotifier};
pub use text::{Paragraph, RichText, TextAlign, TextRun};
pub use theme::{Theme, ThemePatch};

/// Core crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
