//! Card capture - rasterizing the live card model into a PNG data URL.
//!
//! The capture pipeline mirrors what the preview shows: elements stacked top
//! to bottom on the themed card surface, rendered through an SVG intermediate
//! and rasterized with resvg/tiny-skia. Before rendering, every image source
//! is swapped in place for a safely embeddable data URL; a restore guard puts
//! the originals back on every path, success or failure, so the live model is
//! never left holding substituted URLs.

use std::fmt::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use deck_core::{
    Align, Element, ElementValue, Notifier, Severity, TextVariant, Theme, TracingNotifier,
};

use crate::busy::BusyGuard;
use crate::data_url::{decode_data_url, encode_data_url, UrlResolver};
use crate::error::{MediaError, MediaResult};

/// Card surface width in pixels (2.5in at 300 dpi).
pub const CARD_PX_WIDTH: f32 = 750.0;
/// Card surface height in pixels (3.5in at 300 dpi).
pub const CARD_PX_HEIGHT: f32 = 1050.0;
/// Default JPEG recompression quality.
pub const DEFAULT_JPEG_QUALITY: f32 = 0.8;
/// Default maximum axis for JPEG recompression.
pub const DEFAULT_JPEG_MAX_AXIS: u32 = 1280;

const PADDING: f32 = 30.0;
const CORNER_RADIUS: f32 = 24.0;
const TEXT_INSET: f32 = 16.0;
const BLOCK_GAP: f32 = 18.0;
// Model font sizes are authored against a 96dpi preview.
const FONT_SCALE: f32 = 300.0 / 96.0;

/// Filename convention for a downloaded single card image.
#[must_use]
pub fn card_image_file_name(card_id: &str) -> String {
    format!("card-{card_id}.png")
}

/// Captures the draft card into a PNG data URL.
pub struct CardCapture {
    resolver: UrlResolver,
    notifier: Arc<dyn Notifier>,
    in_flight: Arc<AtomicBool>,
}

impl Default for CardCapture {
    fn default() -> Self {
        Self::new(UrlResolver::new())
    }
}

impl CardCapture {
    /// Create a capture service using the given resolver.
    #[must_use]
    pub fn new(resolver: UrlResolver) -> Self {
        Self {
            resolver,
            notifier: Arc::new(TracingNotifier),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the notification sink.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Rasterize the card into a PNG data URL.
    ///
    /// Image sources are resolved concurrently and swapped in place for the
    /// render, then unconditionally restored. Any failure is reported through
    /// the notifier and resolves to `None`; capture never crashes the editor.
    /// A call that overlaps an in-flight capture also resolves to `None`.
    pub async fn capture(&self, elements: &mut [Element], theme: &Theme) -> Option<String> {
        let Some(_guard) = BusyGuard::try_acquire(&self.in_flight) else {
            tracing::warn!("Capture already in flight; ignoring re-entrant call");
            return None;
        };

        // Resolve every image source up front, from the original srcs.
        let sources: Vec<(usize, String)> = elements
            .iter()
            .enumerate()
            .filter_map(|(idx, e)| {
                e.image_src()
                    .filter(|src| !src.is_empty())
                    .map(|src| (idx, src.to_string()))
            })
            .collect();
        let resolved = futures::future::join_all(
            sources
                .iter()
                .map(|(idx, src)| async { (*idx, self.resolver.safe_url(src).await) }),
        )
        .await;

        let mut swap = SrcSwap::new(elements);
        for (idx, safe) in resolved {
            if let Some(safe) = safe {
                swap.substitute(idx, safe);
            }
        }

        match render_card_png(swap.elements(), theme) {
            Ok(png) => Some(encode_data_url("image/png", &png)),
            Err(e) => {
                tracing::error!("Capture failed: {e}");
                self.notifier
                    .notify("Could not capture the card preview", Severity::Error);
                None
            }
        }
        // `swap` drops here, restoring every original src.
    }
}

/// In-place image source substitution with restore-on-drop.
struct SrcSwap<'a> {
    elements: &'a mut [Element],
    originals: Vec<(usize, String)>,
}

impl<'a> SrcSwap<'a> {
    fn new(elements: &'a mut [Element]) -> Self {
        Self {
            elements,
            originals: Vec::new(),
        }
    }

    fn substitute(&mut self, idx: usize, safe_src: String) {
        if let Some(element) = self.elements.get_mut(idx) {
            if let ElementValue::Image(value) = &mut element.value {
                let original = std::mem::replace(&mut value.src, safe_src);
                self.originals.push((idx, original));
            }
        }
    }

    fn elements(&self) -> &[Element] {
        self.elements
    }
}

impl Drop for SrcSwap<'_> {
    fn drop(&mut self) {
        for (idx, original) in self.originals.drain(..) {
            if let Some(element) = self.elements.get_mut(idx) {
                if let ElementValue::Image(value) = &mut element.value {
                    value.src = original;
                }
            }
        }
    }
}

/// Render the card model to PNG bytes.
///
/// # Errors
///
/// Returns [`MediaError::Capture`] if SVG parsing, rasterization, or PNG
/// encoding fails.
pub fn render_card_png(elements: &[Element], theme: &Theme) -> MediaResult<Vec<u8>> {
    let svg = render_card_svg(elements, theme);

    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(&svg, &options)
        .map_err(|e| MediaError::Capture(format!("SVG parsing failed: {e}")))?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut pixmap = tiny_skia::Pixmap::new(CARD_PX_WIDTH as u32, CARD_PX_HEIGHT as u32)
        .ok_or_else(|| MediaError::Capture("Failed to create pixmap".to_string()))?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| MediaError::Capture(format!("PNG encoding failed: {e}")))
}

/// Render the card model to an SVG string.
#[must_use]
pub fn render_card_svg(elements: &[Element], theme: &Theme) -> String {
    let mut svg = String::with_capacity(4096);
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{CARD_PX_WIDTH}\" height=\"{CARD_PX_HEIGHT}\" viewBox=\"0 0 {CARD_PX_WIDTH} {CARD_PX_HEIGHT}\">",
    );

    // Card surface.
    let _ = write!(
        svg,
        "<rect x=\"3\" y=\"3\" width=\"{}\" height=\"{}\" rx=\"{CORNER_RADIUS}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"6\"/>",
        CARD_PX_WIDTH - 6.0,
        CARD_PX_HEIGHT - 6.0,
        escape_xml(&theme.base_fill),
        escape_xml(&theme.base_stroke),
    );

    let inner_width = CARD_PX_WIDTH - PADDING * 2.0;
    let heights = block_heights(elements, inner_width);

    let mut y = PADDING;
    for (idx, (element, height)) in elements.iter().zip(&heights).enumerate() {
        let width = element_width(element) / 100.0 * inner_width;
        let x = match element.style.align {
            Align::Start => PADDING,
            Align::Center => (CARD_PX_WIDTH - width) / 2.0,
            Align::End => CARD_PX_WIDTH - PADDING - width,
        };
        match &element.value {
            ElementValue::Text(value) => {
                render_text_block(&mut svg, theme, value, x, y, width, *height);
            }
            ElementValue::Image(value) => {
                render_image_block(&mut svg, idx, value, x, y, width, *height);
            }
        }
        y += height + BLOCK_GAP;
    }

    svg.push_str("</svg>");
    svg
}

/// Fixed block heights with leftover space distributed to growing elements.
fn block_heights(elements: &[Element], inner_width: f32) -> Vec<f32> {
    let mut heights: Vec<f32> = elements
        .iter()
        .map(|e| match &e.value {
            ElementValue::Text(value) => {
                let lines: f32 = value
                    .content
                    .iter()
                    .map(|p| max_font_size(p) * FONT_SCALE * p.line_height)
                    .sum();
                lines + TEXT_INSET * 2.0
            }
            // Without decoding we assume a 4:3 frame scaled to the element width.
            ElementValue::Image(value) => value.width / 100.0 * inner_width * 0.75,
        })
        .collect();

    let flexible: Vec<usize> = elements
        .iter()
        .enumerate()
        .filter(|(_, e)| {
            e.style.grow
                || matches!(&e.value, ElementValue::Text(v) if v.expand)
        })
        .map(|(idx, _)| idx)
        .collect();
    if !flexible.is_empty() {
        #[allow(clippy::cast_precision_loss)]
        let used: f32 = heights.iter().sum::<f32>()
            + BLOCK_GAP * elements.len().saturating_sub(1) as f32;
        let leftover = (CARD_PX_HEIGHT - PADDING * 2.0 - used).max(0.0);
        #[allow(clippy::cast_precision_loss)]
        let share = leftover / flexible.len() as f32;
        for idx in flexible {
            heights[idx] += share;
        }
    }
    heights
}

fn max_font_size(paragraph: &deck_core::Paragraph) -> f32 {
    paragraph
        .runs
        .iter()
        .map(|r| r.font_size)
        .fold(deck_core::text::DEFAULT_FONT_SIZE, f32::max)
}

fn element_width(element: &Element) -> f32 {
    match &element.value {
        ElementValue::Text(v) => v.width,
        ElementValue::Image(v) => v.width,
    }
}

fn render_text_block(
    svg: &mut String,
    theme: &Theme,
    value: &deck_core::TextValue,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
) {
    let (fill, text_color) = match value.variant {
        TextVariant::Banner => (&theme.banner_fill, &theme.banner_text),
        TextVariant::Box => (&theme.box_fill, &theme.box_text),
    };
    let stroke = match value.variant {
        TextVariant::Banner => String::new(),
        TextVariant::Box => format!(
            " stroke=\"{}\" stroke-width=\"2\"",
            escape_xml(&theme.base_stroke)
        ),
    };
    let _ = write!(
        svg,
        "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" rx=\"8\" fill=\"{}\"{stroke}/>",
        escape_xml(fill),
    );

    let mut line_y = y + TEXT_INSET;
    for paragraph in &value.content {
        let line_height = max_font_size(paragraph) * FONT_SCALE * paragraph.line_height;
        // Baseline sits near the bottom of the line box.
        let baseline = line_y + line_height * 0.8;
        let (text_x, anchor) = match paragraph.align {
            deck_core::TextAlign::Left => (x + TEXT_INSET, "start"),
            deck_core::TextAlign::Center => (x + width / 2.0, "middle"),
            deck_core::TextAlign::Right => (x + width - TEXT_INSET, "end"),
        };
        let _ = write!(
            svg,
            "<text x=\"{text_x}\" y=\"{baseline}\" text-anchor=\"{anchor}\" fill=\"{}\" font-family=\"sans-serif\">",
            escape_xml(text_color),
        );
        for run in &paragraph.runs {
            let weight = if run.bold { " font-weight=\"bold\"" } else { "" };
            let style = if run.italic {
                " font-style=\"italic\""
            } else {
                ""
            };
            let _ = write!(
                svg,
                "<tspan font-size=\"{}\"{weight}{style}>{}</tspan>",
                run.font_size * FONT_SCALE,
                escape_xml(&run.text),
            );
        }
        svg.push_str("</text>");
        line_y += line_height;
    }
}

fn render_image_block(
    svg: &mut String,
    idx: usize,
    value: &deck_core::ImageValue,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
) {
    // Model radius is on a 0-10 preview scale.
    let radius = value.radius * 4.0;
    if value.src.is_empty() {
        let _ = write!(
            svg,
            "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" rx=\"{radius}\" fill=\"#e0e0e0\" stroke=\"#999\" stroke-width=\"2\"/>",
        );
        return;
    }
    let _ = write!(
        svg,
        "<clipPath id=\"img-clip-{idx}\"><rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" rx=\"{radius}\"/></clipPath>",
    );
    let _ = write!(
        svg,
        "<image x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" preserveAspectRatio=\"xMidYMid slice\" clip-path=\"url(#img-clip-{idx})\" href=\"{}\"/>",
        escape_xml(&value.src),
    );
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Recompress a data-URL image as JPEG, downsizing to fit `max_axis`.
///
/// Used for deck export only; the live per-card thumbnail stays PNG.
///
/// # Errors
///
/// Returns [`MediaError::ImageLoad`] if the source cannot be decoded, or
/// [`MediaError::Export`] if JPEG encoding fails.
pub fn compress_to_jpeg(data_url: &str, quality: f32, max_axis: u32) -> MediaResult<String> {
    let (_, bytes) = decode_data_url(data_url)?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| MediaError::ImageLoad(format!("failed to decode image: {e}")))?;

    let (w, h) = (img.width(), img.height());
    let img = if w > max_axis || h > max_axis {
        let scale = f64::from(max_axis) / f64::from(w.max(h));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (new_w, new_h) = (
            (f64::from(w) * scale) as u32,
            (f64::from(h) * scale) as u32,
        );
        img.resize(
            new_w.max(1),
            new_h.max(1),
            image::imageops::FilterType::Lanczos3,
        )
    } else {
        img
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let quality = (quality.clamp(0.01, 1.0) * 100.0) as u8;
    let mut buf = std::io::Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| MediaError::Export(format!("JPEG encoding failed: {e}")))?;

    Ok(encode_data_url("image/jpeg", &buf.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::{ElementId, ImageValue, sample_elements};

    fn tiny_png_data_url() -> String {
        // 1x1 red pixel.
        "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==".to_string()
    }

    fn image_element(src: &str) -> Element {
        Element::new(
            ElementId::new(),
            ElementValue::Image(ImageValue {
                src: src.to_string(),
                ..ImageValue::default()
            }),
        )
    }

    #[test]
    fn test_svg_contains_theme_and_text() {
        let elements = sample_elements();
        let theme = Theme::default();
        let svg = render_card_svg(&elements, &theme);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(&theme.base_fill));
        assert!(svg.contains("Ancient Golem"));
    }

    #[test]
    fn test_render_png_magic_bytes() {
        let elements = sample_elements();
        let png = render_card_png(&elements, &Theme::default()).expect("png");
        assert_eq!(&png[0..4], &[137, 80, 78, 71]);
    }

    #[tokio::test]
    async fn test_capture_returns_png_data_url() {
        let mut elements = vec![image_element(&tiny_png_data_url())];
        let capture = CardCapture::default();
        let url = capture
            .capture(&mut elements, &Theme::default())
            .await
            .expect("capture");
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_capture_restores_sources() {
        let dir = std::env::temp_dir().join("deck-media-capture-test");
        std::fs::create_dir_all(&dir).expect("tempdir");
        let path = dir.join("art.png");
        let (_, bytes) = decode_data_url(&tiny_png_data_url()).expect("decode");
        std::fs::write(&path, bytes).expect("write");
        let src = path.to_str().expect("utf8 path").to_string();

        let mut elements = vec![image_element(&src), image_element("")];
        let before: Vec<Option<String>> = elements
            .iter()
            .map(|e| e.image_src().map(str::to_string))
            .collect();

        let capture = CardCapture::default();
        let _ = capture.capture(&mut elements, &Theme::default()).await;

        let after: Vec<Option<String>> = elements
            .iter()
            .map(|e| e.image_src().map(str::to_string))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_src_swap_restores_on_drop() {
        let mut elements = vec![image_element("original.png")];
        {
            let mut swap = SrcSwap::new(&mut elements);
            swap.substitute(0, "data:image/png;base64,AAAA".to_string());
            assert_eq!(
                swap.elements()[0].image_src(),
                Some("data:image/png;base64,AAAA")
            );
        }
        assert_eq!(elements[0].image_src(), Some("original.png"));
    }

    #[test]
    fn test_compress_to_jpeg() {
        // Build a PNG larger than the max axis.
        let img = image::DynamicImage::new_rgb8(64, 32);
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).expect("encode");
        let url = encode_data_url("image/png", buf.get_ref());

        let jpeg = compress_to_jpeg(&url, DEFAULT_JPEG_QUALITY, 16).expect("compress");
        assert!(jpeg.starts_with("data:image/jpeg;base64,"));
        let (_, bytes) = decode_data_url(&jpeg).expect("decode");
        let out = image::load_from_memory(&bytes).expect("jpeg");
        assert_eq!(out.width(), 16);
        assert_eq!(out.height(), 8);
    }

    #[test]
    fn test_compress_rejects_bad_input() {
        assert!(compress_to_jpeg("data:image/png;base64,AAAA", 0.8, 1280).is_err());
    }

    #[test]
    fn test_card_image_file_name() {
        assert_eq!(card_image_file_name("abc"), "card-abc.png");
    }
}
