//! Multi-card PDF assembly.
//!
//! Lays a selection of deck cards onto landscape US Letter pages as a 4x2
//! grid of standard 2.5in x 3.5in card slots, with margins that center the
//! grid. Progress is observable through a watch channel and the event loop
//! is yielded at page boundaries so large decks stay responsive.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio::sync::watch;

use deck_core::Card;

use crate::busy::BusyGuard;
use crate::data_url::decode_data_url;
use crate::error::{MediaError, MediaResult};

/// Page width in inches (landscape US Letter).
pub const PAGE_WIDTH_IN: f32 = 11.0;
/// Page height in inches (landscape US Letter).
pub const PAGE_HEIGHT_IN: f32 = 8.5;
/// Card slot width in inches.
pub const CARD_WIDTH_IN: f32 = 2.5;
/// Card slot height in inches.
pub const CARD_HEIGHT_IN: f32 = 3.5;
/// Grid columns per page.
pub const GRID_COLS: usize = 4;
/// Grid rows per page.
pub const GRID_ROWS: usize = 2;
/// Cards per page.
pub const CARDS_PER_PAGE: usize = GRID_COLS * GRID_ROWS;
/// Filename convention for the exported document.
pub const PDF_FILE_NAME: &str = "deck-of-cards.pdf";

// Margins that center the 4x2 grid on the page.
#[allow(clippy::cast_precision_loss)]
const MARGIN_X_IN: f32 = (PAGE_WIDTH_IN - CARD_WIDTH_IN * GRID_COLS as f32) / 2.0;
#[allow(clippy::cast_precision_loss)]
const MARGIN_Y_IN: f32 = (PAGE_HEIGHT_IN - CARD_HEIGHT_IN * GRID_ROWS as f32) / 2.0;

const MM_PER_IN: f32 = 25.4;
// printpdf images embed at this dpi when untransformed.
const IMAGE_DPI: f32 = 300.0;

/// Grid slot for the card at `index` within a selection: `(page, col, row)`.
#[must_use]
pub fn page_slot(index: usize) -> (usize, usize, usize) {
    let page = index / CARDS_PER_PAGE;
    let within = index % CARDS_PER_PAGE;
    (page, within % GRID_COLS, within / GRID_COLS)
}

/// Number of pages needed for `count` cards.
#[must_use]
pub fn pages_required(count: usize) -> usize {
    count.div_ceil(CARDS_PER_PAGE)
}

/// Assembles deck cards into a printable PDF.
pub struct PdfAssembler {
    progress: Arc<watch::Sender<f32>>,
    in_flight: Arc<AtomicBool>,
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfAssembler {
    /// Create an assembler with progress at zero.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0.0);
        Self {
            progress: Arc::new(tx),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Observe assembly progress in `[0, 1]`. Progress climbs monotonically
    /// during a run and snaps back to zero shortly after completion.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<f32> {
        self.progress.subscribe()
    }

    /// Lay out the selected cards (default: all) into a PDF.
    ///
    /// Cards without a rendered image are skipped, never an error. An empty
    /// selection, or a call overlapping an in-flight run, resolves to
    /// `Ok(None)` without generating a document.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Export`] if the document cannot be encoded.
    pub async fn generate(
        &self,
        cards: &[Card],
        selection: Option<&[String]>,
    ) -> MediaResult<Option<Vec<u8>>> {
        let Some(_guard) = BusyGuard::try_acquire(&self.in_flight) else {
            tracing::warn!("PDF assembly already in flight; ignoring re-entrant call");
            return Ok(None);
        };

        let selected: Vec<&Card> = match selection {
            Some(ids) => cards.iter().filter(|c| ids.contains(&c.id)).collect(),
            None => cards.iter().collect(),
        };
        if selected.is_empty() {
            return Ok(None);
        }

        let page_w = printpdf::Mm(PAGE_WIDTH_IN * MM_PER_IN);
        let page_h = printpdf::Mm(PAGE_HEIGHT_IN * MM_PER_IN);
        let (doc, first_page, first_layer) =
            printpdf::PdfDocument::new("Deck of Cards", page_w, page_h, "Page 1");

        let mut layer = doc.get_page(first_page).get_layer(first_layer);
        let mut slot = 0usize;
        #[allow(clippy::cast_precision_loss)]
        let total = selected.len() as f32;

        for (processed, card) in selected.iter().enumerate() {
            let Some(img) = decode_card_image(card) else {
                // Malformed entry: skip, keep the rest of the export alive.
                tracing::warn!("Skipping card {} with no usable image", card.id);
                self.report(processed + 1, total);
                continue;
            };

            let (page_idx, col, row) = page_slot(slot);
            if slot > 0 && slot % CARDS_PER_PAGE == 0 {
                let (page, new_layer) =
                    doc.add_page(page_w, page_h, format!("Page {}", page_idx + 1));
                layer = doc.get_page(page).get_layer(new_layer);
                // Let observers repaint between pages.
                tokio::task::yield_now().await;
            }

            place_card(&layer, &img, col, row);
            slot += 1;
            self.report(processed + 1, total);
        }

        if slot == 0 {
            // Every selected card was skipped.
            self.schedule_progress_reset();
            return Ok(None);
        }

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| MediaError::Export(format!("PDF save failed: {e}")))?;
        self.schedule_progress_reset();
        Ok(Some(bytes))
    }

    #[allow(clippy::cast_precision_loss)]
    fn report(&self, processed: usize, total: f32) {
        let value = (processed as f32 / total).min(1.0);
        self.progress.send_replace(value);
    }

    /// Snap progress back to zero a short delay after completion so a later
    /// run starts clean.
    fn schedule_progress_reset(&self) {
        let progress = Arc::clone(&self.progress);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(400)).await;
            progress.send_replace(0.0);
        });
    }
}

/// Decode a card's rendered image for embedding. `None` if the card has no
/// usable image.
fn decode_card_image(card: &Card) -> Option<printpdf::image_crate::DynamicImage> {
    if card.img_url.is_empty() {
        return None;
    }
    let (_, bytes) = decode_data_url(&card.img_url).ok()?;
    printpdf::image_crate::load_from_memory(&bytes).ok()
}

/// Place one card image into its grid slot on the layer.
#[allow(clippy::cast_precision_loss)]
fn place_card(
    layer: &printpdf::PdfLayerReference,
    img: &printpdf::image_crate::DynamicImage,
    col: usize,
    row: usize,
) {
    let card_w_mm = CARD_WIDTH_IN * MM_PER_IN;
    let card_h_mm = CARD_HEIGHT_IN * MM_PER_IN;
    let x_mm = (MARGIN_X_IN + col as f32 * CARD_WIDTH_IN) * MM_PER_IN;
    // printpdf's origin is bottom-left; row 0 is the top row.
    let y_mm = (PAGE_HEIGHT_IN - MARGIN_Y_IN - (row as f32 + 1.0) * CARD_HEIGHT_IN) * MM_PER_IN;

    let natural_w_mm = img.width() as f32 * MM_PER_IN / IMAGE_DPI;
    let natural_h_mm = img.height() as f32 * MM_PER_IN / IMAGE_DPI;

    let pdf_image = printpdf::Image::from_dynamic_image(img);
    pdf_image.add_to_layer(
        layer.clone(),
        printpdf::ImageTransform {
            translate_x: Some(printpdf::Mm(x_mm)),
            translate_y: Some(printpdf::Mm(y_mm)),
            scale_x: Some(card_w_mm / natural_w_mm),
            scale_y: Some(card_h_mm / natural_h_mm),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_url::encode_data_url;
    use deck_core::Theme;

    fn dummy_card(id: &str, with_image: bool) -> Card {
        let img_url = if with_image {
            let img = image::DynamicImage::new_rgb8(10, 14);
            let mut buf = std::io::Cursor::new(Vec::new());
            img.write_to(&mut buf, image::ImageFormat::Png).expect("encode");
            encode_data_url("image/png", buf.get_ref())
        } else {
            String::new()
        };
        Card {
            id: id.to_string(),
            elements: Vec::new(),
            img_url,
            theme: Theme::default(),
        }
    }

    #[test]
    fn test_page_slot_layout() {
        assert_eq!(page_slot(0), (0, 0, 0));
        assert_eq!(page_slot(3), (0, 3, 0));
        assert_eq!(page_slot(4), (0, 0, 1));
        assert_eq!(page_slot(7), (0, 3, 1));
        assert_eq!(page_slot(8), (1, 0, 0));
        assert_eq!(page_slot(19), (2, 3, 0));
    }

    #[test]
    fn test_pages_required() {
        assert_eq!(pages_required(0), 0);
        assert_eq!(pages_required(1), 1);
        assert_eq!(pages_required(8), 1);
        assert_eq!(pages_required(9), 2);
        assert_eq!(pages_required(17), 3);
    }

    #[test]
    fn test_grid_margins_center_the_grid() {
        assert!((MARGIN_X_IN - 0.5).abs() < f32::EPSILON);
        assert!((MARGIN_Y_IN - 0.75).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_generate_produces_pdf() {
        let cards: Vec<Card> = (0..3).map(|i| dummy_card(&format!("c{i}"), true)).collect();
        let assembler = PdfAssembler::new();
        let bytes = assembler
            .generate(&cards, None)
            .await
            .expect("generate")
            .expect("document");
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[tokio::test]
    async fn test_generate_empty_selection_is_none() {
        let assembler = PdfAssembler::new();
        assert!(assembler.generate(&[], None).await.expect("ok").is_none());

        let cards = vec![dummy_card("a", true)];
        let none_selected: Vec<String> = vec!["missing".to_string()];
        assert!(
            assembler
                .generate(&cards, Some(&none_selected))
                .await
                .expect("ok")
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_imageless_cards_are_skipped() {
        let cards = vec![
            dummy_card("a", true),
            dummy_card("b", false),
            dummy_card("c", true),
        ];
        let assembler = PdfAssembler::new();
        let bytes = assembler
            .generate(&cards, None)
            .await
            .expect("generate")
            .expect("document");
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[tokio::test]
    async fn test_all_imageless_resolves_to_none() {
        let cards = vec![dummy_card("a", false), dummy_card("b", false)];
        let assembler = PdfAssembler::new();
        assert!(assembler.generate(&cards, None).await.expect("ok").is_none());
    }

    #[tokio::test]
    async fn test_selection_filters_by_id() {
        let cards: Vec<Card> = (0..4).map(|i| dummy_card(&format!("c{i}"), true)).collect();
        let assembler = PdfAssembler::new();
        let ids = vec!["c1".to_string(), "c3".to_string()];
        let bytes = assembler
            .generate(&cards, Some(&ids))
            .await
            .expect("generate")
            .expect("document");
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[tokio::test]
    async fn test_progress_reaches_one() {
        let cards: Vec<Card> = (0..2).map(|i| dummy_card(&format!("c{i}"), true)).collect();
        let assembler = PdfAssembler::new();
        let progress = assembler.progress();
        assembler
            .generate(&cards, None)
            .await
            .expect("generate")
            .expect("document");
        assert!((*progress.borrow() - 1.0).abs() < f32::EPSILON);
    }
}
