//! Destination availability and reachability checks.
//!
//! Same shape as the other detectors: fetch the destination, classify the
//! HTTP status, then text-match the body against curated phrase lists.
//! Reachability problems are captured into the result, never propagated.

use reqwest::Client;
use serde::Serialize;

use crate::fetch::fetch_page;

/// Out-of-stock phrases, checked before the in-stock list: storefronts keep
/// the add-to-cart markup in the DOM even when a product is sold out.
const OUT_OF_STOCK_PHRASES: &[&str] = &[
    "out of stock",
    "sold out",
    "currently unavailable",
    "no longer available",
    "temporarily out of stock",
    "notify me when available",
    "back in stock soon",
    "this item is unavailable",
];

const IN_STOCK_PHRASES: &[&str] = &[
    "add to cart",
    "add to bag",
    "add to basket",
    "buy now",
    "in stock",
    "ships today",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    InStock,
    OutOfStock,
    Unknown,
}

/// Result of one stock/health check.
#[derive(Debug, Clone, Serialize)]
pub struct StockCheck {
    pub availability: Availability,
    /// HTTP status of 400 or above, or a transport failure.
    pub is_broken: bool,
    pub http_status: Option<u16>,
    /// Confidence in the availability classification, 0–100.
    pub confidence: u8,
    /// Whether the expected affiliate tag appeared in the request or final
    /// URL; `None` when the caller supplied no tag to validate.
    pub tag_present: Option<bool>,
    pub error: Option<String>,
}

/// Fetch `url` and classify its availability.
///
/// HTTP statuses of 400 and above mark the destination broken independent of
/// content; content matching is skipped for broken destinations since error
/// pages routinely contain phrases like "no longer available". When
/// `expected_tag` is supplied, its presence in the request/final URL is
/// reported in `tag_present`.
pub async fn check_stock(client: &Client, url: &str, expected_tag: Option<&str>) -> StockCheck {
    let page = match fetch_page(client, url).await {
        Ok(page) => page,
        Err(e) => {
            tracing::debug!(url, error = %e, "stock check fetch failed");
            return StockCheck {
                availability: Availability::Unknown,
                is_broken: true,
                http_status: None,
                confidence: 0,
                tag_present: expected_tag.map(|tag| url.contains(tag)),
                error: Some(e.to_string()),
            };
        }
    };

    let tag_present =
        expected_tag.map(|tag| url.contains(tag) || page.final_url.contains(tag));

    if page.status >= 400 {
        return StockCheck {
            availability: Availability::Unknown,
            is_broken: true,
            http_status: Some(page.status),
            confidence: 0,
            tag_present,
            error: None,
        };
    }

    let (availability, confidence) = classify_availability(&page.body);

    StockCheck {
        availability,
        is_broken: false,
        http_status: Some(page.status),
        confidence,
        tag_present,
        error: None,
    }
}

/// Classify a page body against the phrase lists.
///
/// Returns the availability plus a confidence that scales with the number of
/// distinct matched phrases. No match at all yields `Unknown` at zero
/// confidence.
pub(crate) fn classify_availability(body: &str) -> (Availability, u8) {
    let lowered = body.to_lowercase();

    let out_matches = OUT_OF_STOCK_PHRASES
        .iter()
        .filter(|p| lowered.contains(*p))
        .count();
    if out_matches > 0 {
        return (Availability::OutOfStock, phrase_confidence(out_matches));
    }

    let in_matches = IN_STOCK_PHRASES
        .iter()
        .filter(|p| lowered.contains(*p))
        .count();
    if in_matches > 0 {
        return (Availability::InStock, phrase_confidence(in_matches));
    }

    (Availability::Unknown, 0)
}

fn phrase_confidence(matches: usize) -> u8 {
    let extra = u8::try_from(matches.saturating_sub(1)).unwrap_or(u8::MAX);
    85u8.saturating_add(extra.saturating_mul(5)).min(95)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sold_out_body_is_out_of_stock() {
        let (availability, confidence) =
            classify_availability("<button disabled>Sold out</button>");
        assert_eq!(availability, Availability::OutOfStock);
        assert_eq!(confidence, 85);
    }

    #[test]
    fn multiple_out_of_stock_phrases_raise_confidence() {
        let (availability, confidence) = classify_availability(
            "This item is currently unavailable. Sold out — notify me when available.",
        );
        assert_eq!(availability, Availability::OutOfStock);
        assert_eq!(confidence, 95);
    }

    #[test]
    fn out_of_stock_wins_over_in_stock_markup() {
        // Sold-out product pages usually still render the cart button.
        let (availability, _) =
            classify_availability("<button>Add to cart</button><span>Sold out</span>");
        assert_eq!(availability, Availability::OutOfStock);
    }

    #[test]
    fn add_to_cart_body_is_in_stock() {
        let (availability, confidence) = classify_availability("<button>Add to Cart</button>");
        assert_eq!(availability, Availability::InStock);
        assert_eq!(confidence, 85);
    }

    #[test]
    fn neutral_body_is_unknown() {
        let (availability, confidence) =
            classify_availability("<html><body>About our company</body></html>");
        assert_eq!(availability, Availability::Unknown);
        assert_eq!(confidence, 0);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let (availability, _) = classify_availability("OUT OF STOCK");
        assert_eq!(availability, Availability::OutOfStock);
    }
}
