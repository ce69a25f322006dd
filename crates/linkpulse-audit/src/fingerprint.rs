//! Destination-page fingerprinting and drift comparison.
//!
//! A fingerprint is a three-field signature: page title, primary image URL,
//! and a bounded hash of the stripped page body. The fields are encoded
//! together but stay individually recoverable so two fingerprints can be
//! compared position-wise.

use regex::Regex;
use reqwest::{Client, Url};
use sha2::{Digest, Sha256};

use crate::crawler::{clean_text, extract_title};
use crate::fetch::fetch_page;

/// Similarity below this flags destination drift. Tunable via configuration;
/// this is the fallback used by ad hoc checks.
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.80;

/// Body characters hashed after stripping, bounding cost on large pages.
const CONTENT_HASH_CHAR_LIMIT: usize = 10_000;

/// Field delimiter for the encoded form. Never occurs in titles or URLs;
/// stray occurrences are stripped during normalization anyway.
const FIELD_SEPARATOR: char = '\u{1f}';

/// Structured signature of a destination page.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Fingerprint {
    pub title: String,
    pub primary_image: String,
    pub content_hash: String,
}

impl Fingerprint {
    /// The empty fingerprint produced when a destination cannot be fetched.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.primary_image.is_empty() && self.content_hash.is_empty()
    }

    /// Encode the fields into a single delimited value for persistence.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{title}{sep}{image}{sep}{hash}",
            title = sanitize_field(&self.title),
            image = sanitize_field(&self.primary_image),
            hash = sanitize_field(&self.content_hash),
            sep = FIELD_SEPARATOR,
        )
    }

    /// Decode an encoded fingerprint back into its ordered field list.
    #[must_use]
    pub fn decode_fields(encoded: &str) -> Vec<&str> {
        if encoded.is_empty() {
            return Vec::new();
        }
        encoded.split(FIELD_SEPARATOR).collect()
    }
}

fn sanitize_field(field: &str) -> String {
    field.replace(FIELD_SEPARATOR, " ")
}

/// Outcome of comparing two fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct FingerprintDiff {
    pub similarity: f64,
    pub has_changed: bool,
    /// `round((1 - similarity) * 100)`.
    pub change_pct: u8,
}

/// Compare two encoded fingerprints position-wise.
///
/// Similarity is the count of position-wise equal fields divided by the
/// larger field count; drift is flagged when similarity falls below
/// `threshold`. Two empty encodings compare as identical.
#[must_use]
pub fn compare_encoded(a: &str, b: &str, threshold: f64) -> FingerprintDiff {
    let fields_a = Fingerprint::decode_fields(a);
    let fields_b = Fingerprint::decode_fields(b);

    let denominator = fields_a.len().max(fields_b.len());
    let similarity = if denominator == 0 {
        1.0
    } else {
        let equal = fields_a
            .iter()
            .zip(fields_b.iter())
            .filter(|(x, y)| x == y)
            .count();
        #[allow(clippy::cast_precision_loss)]
        {
            equal as f64 / denominator as f64
        }
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let change_pct = ((1.0 - similarity) * 100.0).round() as u8;

    FingerprintDiff {
        similarity,
        has_changed: similarity < threshold,
        change_pct,
    }
}

/// Compare two structured fingerprints. See [`compare_encoded`].
#[must_use]
pub fn compare_fingerprints(a: &Fingerprint, b: &Fingerprint, threshold: f64) -> FingerprintDiff {
    compare_encoded(&a.encode(), &b.encode(), threshold)
}

/// Build a fingerprint of the destination at `url`.
///
/// Fails open: a transport failure or non-2xx status yields the empty
/// fingerprint, which callers treat as "cannot assess", not as drift.
pub async fn fingerprint_destination(client: &Client, url: &str) -> Fingerprint {
    let page = match fetch_page(client, url).await {
        Ok(page) if page.status < 400 => page,
        Ok(page) => {
            tracing::debug!(url, status = page.status, "fingerprint fetch returned error status");
            return Fingerprint::empty();
        }
        Err(e) => {
            tracing::debug!(url, error = %e, "fingerprint fetch failed");
            return Fingerprint::empty();
        }
    };

    fingerprint_from_html(&page.body, &page.final_url)
}

/// Build a fingerprint from already-fetched HTML.
pub(crate) fn fingerprint_from_html(html: &str, base_url: &str) -> Fingerprint {
    Fingerprint {
        title: extract_title(html).unwrap_or_default(),
        primary_image: extract_primary_image(html, base_url).unwrap_or_default(),
        content_hash: bounded_content_hash(html),
    }
}

/// Prefer an `og:image` meta tag (either attribute order); fall back to the
/// first image element. The result is resolved to an absolute URL.
fn extract_primary_image(html: &str, base_url: &str) -> Option<String> {
    let og = Regex::new(
        r#"(?is)<meta[^>]+property\s*=\s*["']og:image["'][^>]+content\s*=\s*["'](.*?)["'][^>]*>"#,
    )
    .expect("valid og:image regex");

    let og_swapped = Regex::new(
        r#"(?is)<meta[^>]+content\s*=\s*["'](.*?)["'][^>]+property\s*=\s*["']og:image["'][^>]*>"#,
    )
    .expect("valid og:image fallback regex");

    let img = Regex::new(r#"(?is)<img\s[^>]*?src\s*=\s*["']([^"']+)["']"#)
        .expect("valid img regex");

    let raw = og
        .captures(html)
        .or_else(|| og_swapped.captures(html))
        .or_else(|| img.captures(html))
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())?;

    Some(resolve_image_url(&raw, base_url))
}

fn resolve_image_url(raw: &str, base_url: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }
    Url::parse(base_url)
        .ok()
        .and_then(|base| base.join(raw).ok())
        .map_or_else(|| raw.to_string(), |resolved| resolved.to_string())
}

/// SHA-256 over the body with script/style blocks and tags stripped and
/// whitespace collapsed, capped at the first 10,000 characters.
fn bounded_content_hash(html: &str) -> String {
    let scripts = Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid script regex");
    let styles = Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid style regex");

    let without_scripts = scripts.replace_all(html, " ");
    let without_styles = styles.replace_all(&without_scripts, " ");
    let text = clean_text(&without_styles);

    let bounded: String = text.chars().take(CONTENT_HASH_CHAR_LIMIT).collect();
    if bounded.is_empty() {
        return String::new();
    }

    let mut hasher = Sha256::new();
    hasher.update(bounded.as_bytes());
    format!("{:x}", hasher.finalize())
}
