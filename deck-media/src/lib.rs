//! Image pipeline for the card editor: capture, palette extraction, and
//! print assembly.
//!
//! This crate turns the editable card model from `deck-core` into pixels and
//! paper:
//!
//! ```text
//! +-----------------+     +------------------+     +-----------------+
//! |   UrlResolver   | --> |   CardCapture    | --> |  PdfAssembler   |
//! | embed any image |     | card -> SVG ->   |     | 4x2 grid on     |
//! | as a data URL   |     | PNG data URL     |     | US Letter pages |
//! +-----------------+     +------------------+     +-----------------+
//!          |
//!          v
//! +-----------------+
//! |  PaletteEngine  |
//! | dominant colors |
//! | per image       |
//! +-----------------+
//! ```
//!
//! All pipelines degrade gracefully: a single unreadable image produces a
//! warning and an empty result for that item, never a failed batch.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub(crate) mod busy;
pub mod capture;
pub mod data_url;
pub mod error;
pub mod palette;
pub mod pdf;

pub use capture::{CardCapture, DEFAULT_JPEG_MAX_AXIS, DEFAULT_JPEG_QUALITY, card_image_file_name, compress_to_jpeg};
pub use data_url::{UrlResolver, decode_data_url, encode_data_url, is_data_url, is_remote_url, mime_from_magic_bytes};
pub use error::{MediaError, MediaResult};
pub use palette::{PaletteEngine, Palettes, Rgb, extract_palettes};
pub use pdf::{CARDS_PER_PAGE, PDF_FILE_NAME, PdfAssembler, page_slot, pages_required};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
