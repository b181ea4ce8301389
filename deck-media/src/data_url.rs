//! Data URL encoding and safe URL resolution.
//!
//! Every image reference the editor handles - remote URL, local file path, or
//! data URL - is resolved here into a self-contained data URL so that later
//! pixel inspection and rasterization never depend on an external source.

use std::sync::Arc;

use base64::Engine;

use deck_core::{Notifier, Severity, TracingNotifier};

use crate::error::{MediaError, MediaResult};

/// Check whether a source string is already a data URL.
#[must_use]
pub fn is_data_url(src: &str) -> bool {
    src.starts_with("data:")
}

/// Check whether a source string is a remote http(s) URL.
#[must_use]
pub fn is_remote_url(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

/// Encode raw bytes as a base64 data URL with the given MIME type.
#[must_use]
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{encoded}")
}

/// Decode a data URL into its MIME type and raw bytes.
///
/// Supports base64 payloads (`data:image/png;base64,...`) and percent-encoded
/// payloads.
///
/// # Errors
///
/// Returns [`MediaError::ImageLoad`] if the URL is malformed or the payload
/// cannot be decoded.
pub fn decode_data_url(url: &str) -> MediaResult<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| MediaError::ImageLoad("not a data URL".to_string()))?;
    let comma = rest
        .find(',')
        .ok_or_else(|| MediaError::ImageLoad("data URL missing comma".to_string()))?;
    let metadata = &rest[..comma];
    let payload = &rest[comma + 1..];

    let mime = metadata
        .split(';')
        .next()
        .filter(|m| !m.is_empty())
        .unwrap_or("text/plain")
        .to_string();

    let bytes = if metadata.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| MediaError::ImageLoad(format!("invalid base64 payload: {e}")))?
    } else {
        percent_decode(payload)?
    };

    Ok((mime, bytes))
}

/// Detect an image MIME type from magic bytes.
#[must_use]
pub fn mime_from_magic_bytes(data: &[u8]) -> &'static str {
    // PNG: 89 50 4E 47
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return "image/png";
    }
    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    // WebP: RIFF....WEBP
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return "image/webp";
    }
    "application/octet-stream"
}

/// Simple percent-encoding decoder.
fn percent_decode(input: &str) -> MediaResult<Vec<u8>> {
    let mut result = Vec::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() == 2 {
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    result.push(byte);
                    continue;
                }
            }
            return Err(MediaError::ImageLoad("invalid percent encoding".to_string()));
        }
        let mut utf8 = [0u8; 4];
        result.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }
    Ok(result)
}

/// Resolves image references into safely embeddable data URLs.
#[derive(Clone)]
pub struct UrlResolver {
    client: reqwest::Client,
    cors_proxy: Option<String>,
    notifier: Arc<dyn Notifier>,
}

impl Default for UrlResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlResolver {
    /// Create a resolver that fetches remote URLs directly.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            cors_proxy: None,
            notifier: Arc::new(TracingNotifier),
        }
    }

    /// Prefix remote URLs with a relay endpoint before fetching, so pixel
    /// inspection of cross-origin images stays taint-free.
    #[must_use]
    pub fn with_cors_proxy(mut self, prefix: impl Into<String>) -> Self {
        self.cors_proxy = Some(prefix.into());
        self
    }

    /// Replace the notification sink.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Convert any image reference into a data URL.
    ///
    /// Data URLs pass through unchanged. Remote URLs are fetched as binary
    /// and re-encoded; local paths are read from disk. On failure the
    /// original URL is returned unchanged so the caller renders a broken
    /// image rather than crashing.
    pub async fn to_data_url(&self, url: &str) -> String {
        if is_data_url(url) {
            return url.to_string();
        }
        match self.fetch_data_url(url).await {
            Ok(data_url) => data_url,
            Err(e) => {
                tracing::warn!("Falling back to original URL: {e}");
                self.notifier
                    .notify("Could not embed an image; it may render broken", Severity::Warning);
                url.to_string()
            }
        }
    }

    /// Resolve a source into a form safe for pixel inspection.
    ///
    /// Data URLs pass through; remote URLs go through the relay (when
    /// configured) and are embedded; local paths are read directly. An empty
    /// source resolves to `None`.
    pub async fn safe_url(&self, src: &str) -> Option<String> {
        if src.is_empty() {
            return None;
        }
        if is_data_url(src) {
            return Some(src.to_string());
        }
        if is_remote_url(src) {
            let relayed = match &self.cors_proxy {
                Some(prefix) => format!("{prefix}{src}"),
                None => src.to_string(),
            };
            return Some(self.to_data_url(&relayed).await);
        }
        // Local paths (the transient-source analog) are read without relay.
        Some(self.to_data_url(src).await)
    }

    /// Fetch or read a URL as binary and encode it as a data URL.
    async fn fetch_data_url(&self, url: &str) -> MediaResult<String> {
        let bytes: Vec<u8> = if is_remote_url(url) {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| MediaError::Fetch {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
            let response = response.error_for_status().map_err(|e| MediaError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            response
                .bytes()
                .await
                .map_err(|e| MediaError::Fetch {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?
                .to_vec()
        } else {
            tokio::fs::read(url).await.map_err(|e| MediaError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?
        };
        let mime = mime_from_magic_bytes(&bytes);
        Ok(encode_data_url(mime, &bytes))
    }
}
