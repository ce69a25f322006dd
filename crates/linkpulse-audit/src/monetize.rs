//! Affiliate-network monetization detection.
//!
//! Tries detection strategies in priority order (Amazon Associates,
//! Impact.com, ShareASale, CJ Affiliate, Awin, Rakuten Advertising) against a
//! parsed URL and returns the first positive match. Adding a network means
//! appending one strategy function to [`STRATEGIES`].

use reqwest::Url;
use serde::Serialize;

/// Result shape shared by every network strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonetizationCheck {
    pub has_affiliate_tag: bool,
    pub network: Option<&'static str>,
    pub tag: Option<String>,
    /// Whether the link is in the best shape the network supports
    /// (e.g. a visible tag rather than an unverifiable shortlink).
    pub is_optimal: bool,
    pub suggestion: Option<String>,
}

type NetworkStrategy = fn(&Url) -> Option<MonetizationCheck>;

/// Detection cascade, highest priority first.
const STRATEGIES: &[NetworkStrategy] = &[
    detect_amazon,
    detect_impact,
    detect_shareasale,
    detect_cj,
    detect_awin,
    detect_rakuten,
];

const IMPACT_DOMAINS: &[&str] = &["impact.com", "sjv.io", "pxf.io", "ojrq.net"];
const SHAREASALE_DOMAINS: &[&str] = &["shareasale.com", "shrsl.com"];
const CJ_DOMAINS: &[&str] = &[
    "anrdoezrs.net",
    "jdoqocy.com",
    "tkqlhce.com",
    "dpbolvw.net",
    "kqzyfj.com",
];
const AWIN_DOMAINS: &[&str] = &["awin1.com", "tidd.ly"];
const RAKUTEN_DOMAINS: &[&str] = &["linksynergy.com"];

/// Inspect a URL for affiliate-network tracking signatures.
///
/// Returns the first strategy that recognizes the URL; when none match,
/// returns "not monetized" with an optimization suggestion.
#[must_use]
pub fn detect_monetization(url: &Url) -> MonetizationCheck {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(url))
        .unwrap_or_else(not_monetized)
}

/// Whether `host` belongs to any known affiliate network.
///
/// Used by the crawler to classify links that route through network
/// redirector domains.
#[must_use]
pub fn is_known_network_host(host: &str) -> bool {
    if is_amazon_shortlink_host(host) {
        return true;
    }
    [
        IMPACT_DOMAINS,
        SHAREASALE_DOMAINS,
        CJ_DOMAINS,
        AWIN_DOMAINS,
        RAKUTEN_DOMAINS,
    ]
    .iter()
    .any(|domains| domains.iter().any(|d| host_matches(host, d)))
}

/// Suffix match: `host` equals `domain` or is a subdomain of it.
fn host_matches(host: &str, domain: &str) -> bool {
    host.eq_ignore_ascii_case(domain)
        || host
            .to_ascii_lowercase()
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn is_amazon_host(host: &str) -> bool {
    host.to_ascii_lowercase()
        .split('.')
        .any(|label| label == "amazon")
}

fn is_amazon_shortlink_host(host: &str) -> bool {
    host.eq_ignore_ascii_case("amzn.to")
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

fn detect_amazon(url: &Url) -> Option<MonetizationCheck> {
    let host = url.host_str()?;

    if is_amazon_host(host) {
        // The Associates tag rides in the `tag` query parameter. An Amazon
        // URL without one is not monetized and falls through the cascade.
        let tag = query_param(url, "tag")?;
        return Some(MonetizationCheck {
            has_affiliate_tag: true,
            network: Some("Amazon Associates"),
            tag: Some(tag),
            is_optimal: true,
            suggestion: None,
        });
    }

    if is_amazon_shortlink_host(host) {
        // amzn.to shortlinks carry their tag only after redirect expansion.
        return Some(MonetizationCheck {
            has_affiliate_tag: true,
            network: Some("Amazon Associates"),
            tag: None,
            is_optimal: false,
            suggestion: Some(
                "replace the amzn.to shortlink with the expanded URL so the tag is verifiable"
                    .to_string(),
            ),
        });
    }

    None
}

fn detect_impact(url: &Url) -> Option<MonetizationCheck> {
    let host = url.host_str()?;
    let domain = IMPACT_DOMAINS.iter().find(|d| host_matches(host, d))?;

    // Impact links encode the partner program in the subdomain
    // (e.g. brand.sjv.io); tracking is intrinsic to the domain.
    let subdomain = host
        .to_ascii_lowercase()
        .strip_suffix(domain)
        .map(|p| p.trim_end_matches('.').to_string())
        .filter(|p| !p.is_empty() && p != "www");

    Some(MonetizationCheck {
        has_affiliate_tag: true,
        network: Some("Impact.com"),
        tag: subdomain,
        is_optimal: true,
        suggestion: None,
    })
}

fn detect_shareasale(url: &Url) -> Option<MonetizationCheck> {
    let host = url.host_str()?;
    if !SHAREASALE_DOMAINS.iter().any(|d| host_matches(host, d)) {
        return None;
    }

    let tag = query_param(url, "u").or_else(|| query_param(url, "afftrack"));
    let is_optimal = tag.is_some();

    Some(MonetizationCheck {
        has_affiliate_tag: true,
        network: Some("ShareASale"),
        tag,
        is_optimal,
        suggestion: (!is_optimal)
            .then(|| "add the `u` affiliate id parameter to the ShareASale link".to_string()),
    })
}

fn detect_cj(url: &Url) -> Option<MonetizationCheck> {
    let host = url.host_str()?;
    if !CJ_DOMAINS.iter().any(|d| host_matches(host, d)) {
        return None;
    }

    // CJ deep links carry the publisher id in a `click-<pid>` path segment.
    let tag = url
        .path_segments()
        .and_then(|mut segments| segments.find(|s| s.starts_with("click-")))
        .map(|s| s.trim_start_matches("click-").to_string())
        .filter(|s| !s.is_empty());

    Some(MonetizationCheck {
        has_affiliate_tag: true,
        network: Some("CJ Affiliate"),
        tag,
        is_optimal: true,
        suggestion: None,
    })
}

fn detect_awin(url: &Url) -> Option<MonetizationCheck> {
    let host = url.host_str()?;
    if !AWIN_DOMAINS.iter().any(|d| host_matches(host, d)) {
        return None;
    }

    let tag = query_param(url, "awinaffid");
    let is_optimal = tag.is_some() || host_matches(host, "tidd.ly");

    Some(MonetizationCheck {
        has_affiliate_tag: true,
        network: Some("Awin"),
        tag,
        is_optimal,
        suggestion: (!is_optimal)
            .then(|| "add the `awinaffid` parameter to the Awin link".to_string()),
    })
}

fn detect_rakuten(url: &Url) -> Option<MonetizationCheck> {
    let host = url.host_str()?;
    if !RAKUTEN_DOMAINS.iter().any(|d| host_matches(host, d)) {
        return None;
    }

    let tag = query_param(url, "id");
    let is_optimal = tag.is_some();

    Some(MonetizationCheck {
        has_affiliate_tag: true,
        network: Some("Rakuten Advertising"),
        tag,
        is_optimal,
        suggestion: (!is_optimal)
            .then(|| "add the `id` publisher parameter to the Rakuten link".to_string()),
    })
}

fn not_monetized() -> MonetizationCheck {
    MonetizationCheck {
        has_affiliate_tag: false,
        network: None,
        tag: None,
        is_optimal: false,
        suggestion: Some(
            "no affiliate tracking detected; route this link through an affiliate network \
             to earn commission"
                .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid test URL")
    }

    #[test]
    fn amazon_host_with_tag_is_monetized() {
        let check = detect_monetization(&url(
            "https://www.amazon.com/dp/B08N5WRWNW?tag=creator-20&th=1",
        ));
        assert!(check.has_affiliate_tag);
        assert_eq!(check.network, Some("Amazon Associates"));
        assert_eq!(check.tag.as_deref(), Some("creator-20"));
        assert!(check.is_optimal);
    }

    #[test]
    fn amazon_international_host_with_tag_is_monetized() {
        let check = detect_monetization(&url("https://www.amazon.co.uk/dp/B0TEST?tag=creator-21"));
        assert_eq!(check.network, Some("Amazon Associates"));
        assert!(check.has_affiliate_tag);
    }

    #[test]
    fn amazon_host_without_tag_is_not_monetized() {
        let check = detect_monetization(&url("https://www.amazon.com/dp/B08N5WRWNW"));
        assert!(!check.has_affiliate_tag);
        assert_eq!(check.network, None);
        assert!(check.suggestion.is_some(), "expected a suggestion");
    }

    #[test]
    fn amzn_shortlink_is_monetized_but_not_optimal() {
        let check = detect_monetization(&url("https://amzn.to/3xYzAbC"));
        assert!(check.has_affiliate_tag);
        assert_eq!(check.network, Some("Amazon Associates"));
        assert!(check.tag.is_none());
        assert!(!check.is_optimal);
    }

    #[test]
    fn impact_domain_matches_regardless_of_query_params() {
        let check = detect_monetization(&url("https://brand.sjv.io/c/12345/987?foo=bar"));
        assert!(check.has_affiliate_tag);
        assert_eq!(check.network, Some("Impact.com"));
        assert_eq!(check.tag.as_deref(), Some("brand"));

        let bare = detect_monetization(&url("https://impact.com/landing"));
        assert_eq!(bare.network, Some("Impact.com"));
    }

    #[test]
    fn shareasale_takes_affiliate_id_from_u_param() {
        let check = detect_monetization(&url(
            "https://www.shareasale.com/r.cfm?b=100&u=55555&m=200",
        ));
        assert_eq!(check.network, Some("ShareASale"));
        assert_eq!(check.tag.as_deref(), Some("55555"));
        assert!(check.is_optimal);
    }

    #[test]
    fn shareasale_without_id_suggests_adding_one() {
        let check = detect_monetization(&url("https://shareasale.com/r.cfm?b=100&m=200"));
        assert_eq!(check.network, Some("ShareASale"));
        assert!(!check.is_optimal);
        assert!(check.suggestion.is_some());
    }

    #[test]
    fn cj_domain_extracts_click_pid() {
        let check = detect_monetization(&url("https://www.anrdoezrs.net/click-9876543-13947obj"));
        assert_eq!(check.network, Some("CJ Affiliate"));
        assert_eq!(check.tag.as_deref(), Some("9876543-13947obj"));
    }

    #[test]
    fn awin_domain_with_affiliate_id() {
        let check = detect_monetization(&url(
            "https://www.awin1.com/cread.php?awinmid=1234&awinaffid=777",
        ));
        assert_eq!(check.network, Some("Awin"));
        assert_eq!(check.tag.as_deref(), Some("777"));
    }

    #[test]
    fn rakuten_linksynergy_with_publisher_id() {
        let check = detect_monetization(&url(
            "https://click.linksynergy.com/deeplink?id=AbCdEf&mid=999&murl=https%3A%2F%2Fshop.example",
        ));
        assert_eq!(check.network, Some("Rakuten Advertising"));
        assert_eq!(check.tag.as_deref(), Some("AbCdEf"));
    }

    #[test]
    fn plain_merchant_url_is_not_monetized() {
        let check = detect_monetization(&url("https://shop.example.com/products/mug"));
        assert!(!check.has_affiliate_tag);
        assert_eq!(check.network, None);
        assert!(check.tag.is_none());
        assert!(check.suggestion.is_some());
    }

    #[test]
    fn known_network_hosts_are_recognized() {
        assert!(is_known_network_host("amzn.to"));
        assert!(is_known_network_host("brand.sjv.io"));
        assert!(is_known_network_host("www.shareasale.com"));
        assert!(is_known_network_host("jdoqocy.com"));
        assert!(!is_known_network_host("example.com"));
        // Suffix matching must not accept lookalike registrations.
        assert!(!is_known_network_host("notsjv.io"));
    }
}
