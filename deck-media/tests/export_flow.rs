//! End-to-end export flow: draft -> capture -> deck -> PDF.

use deck_core::{DeckStore, DraftStore, Theme, ValuePatch};
use deck_media::capture::{CardCapture, compress_to_jpeg, DEFAULT_JPEG_QUALITY};
use deck_media::data_url::{decode_data_url, encode_data_url};
use deck_media::pdf::{pages_required, PdfAssembler};

fn tiny_png_data_url() -> String {
    let img = image::DynamicImage::new_rgb8(12, 16);
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode");
    encode_data_url("image/png", buf.get_ref())
}

#[tokio::test]
async fn capture_draft_and_assemble_pdf() {
    // Author a draft: the sample card plus a real image.
    let draft = DraftStore::new();
    draft.reset(true);
    let image_id = draft
        .register_element("image", None)
        .expect("register image");
    let patch: ValuePatch = serde_json::from_value(serde_json::json!({
        "type": "image",
        "value": { "src": tiny_png_data_url() }
    }))
    .expect("patch");
    draft.update_element(image_id, &patch);

    // Capture the draft into a PNG data URL.
    let capture = CardCapture::default();
    let mut elements = draft.elements();
    let img_url = capture
        .capture(&mut elements, &draft.theme())
        .await
        .expect("capture");
    assert!(img_url.starts_with("data:image/png;base64,"));

    // Save two copies into the deck and round-trip through JSON.
    let deck = DeckStore::new();
    deck.add_card(draft.elements(), img_url.clone(), draft.theme());
    deck.add_card(draft.elements(), img_url, draft.theme());
    let json = deck.export_json().expect("export");
    let restored = DeckStore::new();
    restored.set_cards(serde_json::from_str(&json).expect("parse")).expect("set");
    assert_eq!(restored.len(), 2);

    // Assemble the whole deck into one page of PDF.
    let cards = restored.cards();
    assert_eq!(pages_required(cards.len()), 1);
    let assembler = PdfAssembler::new();
    let bytes = assembler
        .generate(&cards, None)
        .await
        .expect("generate")
        .expect("document");
    assert_eq!(&bytes[0..5], b"%PDF-");
}

#[tokio::test]
async fn capture_output_recompresses_for_deck_export() {
    let draft = DraftStore::new();
    draft.reset(true);

    let capture = CardCapture::default();
    let mut elements = draft.elements();
    let img_url = capture
        .capture(&mut elements, &Theme::default())
        .await
        .expect("capture");

    let jpeg = compress_to_jpeg(&img_url, DEFAULT_JPEG_QUALITY, 640).expect("compress");
    let (mime, bytes) = decode_data_url(&jpeg).expect("decode");
    assert_eq!(mime, "image/jpeg");
    let out = image::load_from_memory(&bytes).expect("jpeg decodes");
    assert!(out.width().max(out.height()) <= 640);
}
