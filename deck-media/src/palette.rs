//! Palette extraction - deriving usable color swatches from card images.
//!
//! Each image is decoded into a small working bitmap, its opaque pixels are
//! quantized and ranked by frequency, and a greedy pass picks visually
//! diverse representatives. Four derived palettes feed the theme-picking UI:
//! lightened, darkened, desaturated, and the raw most-popular colors.
//! Results are cached per element so edits elsewhere on the card do not
//! trigger recomputation.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use deck_core::{ElementId, Notifier, Severity, TracingNotifier};

use crate::busy::BusyGuard;
use crate::data_url::{decode_data_url, UrlResolver};
use crate::error::{MediaError, MediaResult};

/// Decoded images are capped at this axis for analysis.
pub const MAX_DECODE_AXIS: u32 = 400;
/// Pixels with alpha below this are ignored.
pub const MIN_OPAQUE_ALPHA: u8 = 125;
/// Channel bin size for the first quantization pass.
pub const INITIAL_BIN_SIZE: u32 = 10;
/// Minimum pairwise RGB distance for the first diversity pass.
pub const INITIAL_DISTANCE: f32 = 75.0;
/// How many swatches each palette aims for.
pub const PALETTE_SIZE: usize = 6;

const MAX_RETRIES: u32 = 2;
const BIN_STEP: u32 = 3;
const DISTANCE_RELAX: f32 = 0.7;

/// An RGB color swatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Euclidean distance in RGB space.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        let dr = f32::from(self.r) - f32::from(other.r);
        let dg = f32::from(self.g) - f32::from(other.g);
        let db = f32::from(self.b) - f32::from(other.b);
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// Blend toward another color by `t` in `[0, 1]`.
    #[must_use]
    pub fn blend(self, toward: Self, t: f32) -> Self {
        let mix = |a: u8, b: u8| -> u8 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                f32::from(a).mul_add(1.0 - t, f32::from(b) * t).round() as u8
            }
        };
        Self {
            r: mix(self.r, toward.r),
            g: mix(self.g, toward.g),
            b: mix(self.b, toward.b),
        }
    }

    /// Desaturate by blending toward this color's own gray by `amount`.
    #[must_use]
    pub fn desaturate(self, amount: f32) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let gray = (f32::from(self.r) * 0.299
            + f32::from(self.g) * 0.587
            + f32::from(self.b) * 0.114)
            .round() as u8;
        self.blend(
            Self {
                r: gray,
                g: gray,
                b: gray,
            },
            amount,
        )
    }

    /// CSS hex form, e.g. `#1a2b3c`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

const WHITE: Rgb = Rgb {
    r: 255,
    g: 255,
    b: 255,
};
const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

/// The four derived palettes for one image.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Palettes {
    /// Diverse colors blended 50% toward white.
    pub lights: Vec<Rgb>,
    /// Diverse colors blended 50% toward black.
    pub darks: Vec<Rgb>,
    /// Diverse colors desaturated 30% toward their own gray.
    pub base: Vec<Rgb>,
    /// Raw most-frequent colors, undiversified.
    pub populars: Vec<Rgb>,
}

impl Palettes {
    /// Whether extraction produced no swatches at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.populars.is_empty()
    }
}

/// Extract the four palettes from encoded image bytes.
///
/// # Errors
///
/// Returns [`MediaError::ImageLoad`] if the bytes cannot be decoded.
pub fn extract_palettes(bytes: &[u8], count: usize) -> MediaResult<Palettes> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| MediaError::ImageLoad(format!("failed to decode image: {e}")))?;
    let img = if img.width() > MAX_DECODE_AXIS || img.height() > MAX_DECODE_AXIS {
        img.resize(
            MAX_DECODE_AXIS,
            MAX_DECODE_AXIS,
            image::imageops::FilterType::Triangle,
        )
    } else {
        img
    };
    let rgba = img.to_rgba8();

    let mut bin = INITIAL_BIN_SIZE;
    let mut threshold = INITIAL_DISTANCE;
    let mut diverse = Vec::new();
    let mut ranked = Vec::new();
    for attempt in 0..=MAX_RETRIES {
        ranked = ranked_colors(&rgba, bin);
        diverse = diverse_pick(&ranked, count, threshold);
        if diverse.len() >= count || attempt == MAX_RETRIES {
            break;
        }
        // Not enough candidates: finer bins, relaxed distance.
        bin = bin.saturating_sub(BIN_STEP).max(1);
        threshold *= DISTANCE_RELAX;
    }

    let populars = ranked.iter().take(count).map(|(c, _)| *c).collect();
    Ok(Palettes {
        lights: diverse.iter().map(|c| c.blend(WHITE, 0.5)).collect(),
        darks: diverse.iter().map(|c| c.blend(BLACK, 0.5)).collect(),
        base: diverse.iter().map(|c| c.desaturate(0.3)).collect(),
        populars,
    })
}

/// Quantize opaque pixels and rank bins by frequency, descending.
fn ranked_colors(rgba: &image::RgbaImage, bin: u32) -> Vec<(Rgb, u32)> {
    let mut counts: HashMap<Rgb, u32> = HashMap::new();
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a < MIN_OPAQUE_ALPHA {
            continue;
        }
        let q = |c: u8| -> u8 {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::cast_precision_loss
            )]
            {
                ((f32::from(c) / bin as f32).round() * bin as f32).min(255.0) as u8
            }
        };
        let key = Rgb {
            r: q(r),
            g: q(g),
            b: q(b),
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    let mut ranked: Vec<(Rgb, u32)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.to_hex().cmp(&b.0.to_hex())));
    ranked
}

/// Greedily pick up to `count` colors whose pairwise distance exceeds
/// `threshold`, scanning in frequency order.
fn diverse_pick(ranked: &[(Rgb, u32)], count: usize, threshold: f32) -> Vec<Rgb> {
    let mut picked: Vec<Rgb> = Vec::with_capacity(count);
    for (color, _) in ranked {
        if picked.len() >= count {
            break;
        }
        if picked.iter().all(|p| p.distance(*color) > threshold) {
            picked.push(*color);
        }
    }
    picked
}

#[derive(Debug, Clone)]
struct CacheEntry {
    src: String,
    palettes: Palettes,
}

/// Palette extraction with a per-element cache and a generation lock.
pub struct PaletteEngine {
    resolver: UrlResolver,
    notifier: Arc<dyn Notifier>,
    cache: Mutex<HashMap<ElementId, CacheEntry>>,
    generating: Arc<AtomicBool>,
}

impl Default for PaletteEngine {
    fn default() -> Self {
        Self::new(UrlResolver::new())
    }
}

impl PaletteEngine {
    /// Create an engine using the given resolver.
    #[must_use]
    pub fn new(resolver: UrlResolver) -> Self {
        Self {
            resolver,
            notifier: Arc::new(TracingNotifier),
            cache: Mutex::new(HashMap::new()),
            generating: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the notification sink.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Generate palettes for the given `(element id, image src)` pairs.
    ///
    /// Images are processed sequentially to bound peak decode memory. Cached
    /// entries are reused unless the src changed or `force` is set; entries
    /// for elements no longer present are pruned. A second pass requested
    /// while one is in flight returns the current cache unless forced.
    ///
    /// A per-image decode failure yields an empty palette for that element
    /// and never aborts the batch.
    pub async fn generate(
        &self,
        images: &[(ElementId, String)],
        force: bool,
    ) -> HashMap<ElementId, Palettes> {
        let guard = BusyGuard::try_acquire(&self.generating);
        if guard.is_none() && !force {
            tracing::debug!("Palette generation already in flight; serving cache");
            return self.cached_all();
        }

        for (id, src) in images {
            let reusable = !force
                && self
                    .lock_cache()
                    .get(id)
                    .is_some_and(|entry| entry.src == *src);
            if reusable {
                continue;
            }
            let palettes = self.extract_one(src).await.unwrap_or_else(|e| {
                tracing::warn!("Palette extraction failed for element {id}: {e}");
                self.notifier.notify(
                    "Could not read colors from an image",
                    Severity::Warning,
                );
                Palettes::default()
            });
            self.lock_cache().insert(
                *id,
                CacheEntry {
                    src: src.clone(),
                    palettes,
                },
            );
        }

        // Prune entries for elements that left the card.
        {
            let live: std::collections::HashSet<ElementId> =
                images.iter().map(|(id, _)| *id).collect();
            self.lock_cache().retain(|id, _| live.contains(id));
        }

        self.cached_all()
    }

    /// The cached palettes for one element, if any.
    #[must_use]
    pub fn cached(&self, id: ElementId) -> Option<Palettes> {
        self.lock_cache().get(&id).map(|e| e.palettes.clone())
    }

    fn cached_all(&self) -> HashMap<ElementId, Palettes> {
        self.lock_cache()
            .iter()
            .map(|(id, entry)| (*id, entry.palettes.clone()))
            .collect()
    }

    async fn extract_one(&self, src: &str) -> MediaResult<Palettes> {
        let safe = self
            .resolver
            .safe_url(src)
            .await
            .ok_or_else(|| MediaError::ImageLoad("empty image source".to_string()))?;
        let (_, bytes) = decode_data_url(&safe)?;
        extract_palettes(&bytes, PALETTE_SIZE)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<ElementId, CacheEntry>> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
