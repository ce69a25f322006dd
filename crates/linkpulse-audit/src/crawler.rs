//! Bio-page crawler: fetches a tracked page and extracts its outbound links.

use regex::Regex;
use reqwest::{Client, Url};
use serde::Serialize;

use crate::error::AuditError;
use crate::fetch::fetch_page;
use crate::monetize;

/// Link-in-bio and shortener services whose hosts mark a link as affiliate
/// even before the network cascade runs. Known network redirector domains
/// are matched separately via [`monetize::is_known_network_host`].
const AFFILIATE_REDIRECTOR_DOMAINS: &[&str] = &[
    "geni.us",
    "rstyle.me",
    "shopstyle.it",
    "liketk.it",
    "howl.me",
    "go.magik.ly",
    "mavely.app.link",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkClassification {
    Internal,
    Affiliate,
    External,
}

/// One outbound link extracted from a tracked page, in document order.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedLink {
    pub url: String,
    pub anchor_text: Option<String>,
    pub position: usize,
    pub classification: LinkClassification,
}

/// The result of crawling one tracked page.
#[derive(Debug, Clone)]
pub struct PageCrawl {
    pub page_url: String,
    pub page_title: Option<String>,
    pub links: Vec<ExtractedLink>,
}

/// Fetch a tracked page and extract its outbound links.
///
/// Relative hrefs are resolved against the page URL (post-redirect), in-page
/// anchors and `javascript:`/`mailto:`/`tel:` links are skipped, and each
/// remaining link is classified as internal (same host), affiliate (known
/// redirector or network domain), or external. Document order is preserved.
/// The page title is extracted opportunistically for diagnostics.
///
/// # Errors
///
/// Returns [`AuditError::HttpStatus`] for a non-2xx response,
/// [`AuditError::Timeout`] / [`AuditError::Network`] for transport failures,
/// and [`AuditError::InvalidUrl`] if `page_url` itself does not parse.
/// Malformed HTML is tolerated: extraction degrades to partial or empty
/// results, never an error.
pub async fn crawl_page(client: &Client, page_url: &str) -> Result<PageCrawl, AuditError> {
    Url::parse(page_url).map_err(|e| AuditError::InvalidUrl {
        url: page_url.to_owned(),
        reason: e.to_string(),
    })?;

    let page = fetch_page(client, page_url).await?;
    if page.status >= 400 {
        return Err(AuditError::HttpStatus {
            status: page.status,
            url: page_url.to_owned(),
        });
    }

    // Resolve relative hrefs against the post-redirect URL so pages served
    // from a canonical host classify their own links as internal.
    let base = Url::parse(&page.final_url).map_err(|e| AuditError::InvalidUrl {
        url: page.final_url.clone(),
        reason: e.to_string(),
    })?;

    let links = extract_links(&page.body, &base);
    let page_title = extract_title(&page.body);

    tracing::debug!(
        page_url,
        link_count = links.len(),
        "crawled tracked page"
    );

    Ok(PageCrawl {
        page_url: page_url.to_owned(),
        page_title,
        links,
    })
}

/// Extract anchor elements in document order and classify each link.
pub(crate) fn extract_links(html: &str, base: &Url) -> Vec<ExtractedLink> {
    let re = Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#)
        .expect("valid anchor regex");

    let page_host = base.host_str().unwrap_or("").to_ascii_lowercase();
    let mut links = Vec::new();

    for cap in re.captures_iter(html) {
        let href = cap.get(1).map_or("", |m| m.as_str()).trim();
        if !is_auditable_href(href) {
            continue;
        }

        let Some(resolved) = resolve_href(href, base) else {
            continue;
        };

        let anchor_text = Some(clean_text(cap.get(2).map_or("", |m| m.as_str())))
            .filter(|t| !t.is_empty());

        let classification = classify_link(&resolved, Some(page_host.as_str()));

        links.push(ExtractedLink {
            url: resolved.to_string(),
            anchor_text,
            position: links.len(),
            classification,
        });
    }

    links
}

fn is_auditable_href(href: &str) -> bool {
    !href.is_empty()
        && !href.starts_with('#')
        && !href.starts_with("javascript:")
        && !href.starts_with("mailto:")
        && !href.starts_with("tel:")
        && !href.starts_with("data:")
}

/// Resolve an href against the page base. Query strings are preserved —
/// affiliate tags live there — while fragments are dropped.
fn resolve_href(href: &str, base: &Url) -> Option<Url> {
    let mut resolved = if href.starts_with("http://") || href.starts_with("https://") {
        Url::parse(href).ok()?
    } else {
        base.join(href).ok()?
    };
    resolved.set_fragment(None);

    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// Classify a link relative to the page it was found on.
///
/// Affiliate covers links through known redirector/network hosts as well as
/// merchant URLs that already carry a tracking tag (e.g. an Amazon `tag`
/// parameter). `page_host` is `None` for ad hoc single-URL checks, where
/// "internal" has no meaning.
#[must_use]
pub fn classify_link(url: &Url, page_host: Option<&str>) -> LinkClassification {
    let host = url.host_str().unwrap_or("").to_ascii_lowercase();
    if page_host.is_some_and(|p| !p.is_empty() && host == p.to_ascii_lowercase()) {
        return LinkClassification::Internal;
    }
    if monetize::is_known_network_host(&host)
        || AFFILIATE_REDIRECTOR_DOMAINS
            .iter()
            .any(|d| host_matches(&host, d))
        || monetize::detect_monetization(url).has_affiliate_tag
    {
        return LinkClassification::Affiliate;
    }
    LinkClassification::External
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

pub(crate) fn extract_title(html: &str) -> Option<String> {
    let re = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex");
    re.captures(html)
        .map(|cap| clean_text(cap.get(1).map_or("", |m| m.as_str())))
        .filter(|t| !t.is_empty())
}

/// Strip tags and collapse whitespace.
pub(crate) fn clean_text(input: &str) -> String {
    let tags = Regex::new(r"(?is)<[^>]+>").expect("valid tags regex");
    let no_tags = tags.replace_all(input, " ");
    no_tags
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://links.example.com/@creator").expect("valid base")
    }

    #[test]
    fn extracts_links_in_document_order_with_positions() {
        let html = r#"
            <html><body>
            <a href="https://www.amazon.com/dp/B01?tag=creator-20">Desk lamp</a>
            <a href="/about">About me</a>
            <a href="https://shop.other.com/mug">Mug</a>
            </body></html>
        "#;
        let links = extract_links(html, &base());
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].position, 0);
        assert_eq!(links[1].position, 1);
        assert_eq!(links[2].position, 2);
        assert_eq!(links[0].anchor_text.as_deref(), Some("Desk lamp"));
        assert_eq!(
            links[1].url, "https://links.example.com/about",
            "relative href resolves against the page base"
        );
    }

    #[test]
    fn classifies_internal_affiliate_and_external() {
        let html = r#"
            <a href="/contact">contact</a>
            <a href="https://amzn.to/3xYzAbC">deal</a>
            <a href="https://brand.sjv.io/c/1/2">offer</a>
            <a href="https://geni.us/gadget">gadget</a>
            <a href="https://shop.other.com/mug">mug</a>
        "#;
        let links = extract_links(html, &base());
        let classes: Vec<LinkClassification> =
            links.iter().map(|l| l.classification).collect();
        assert_eq!(
            classes,
            vec![
                LinkClassification::Internal,
                LinkClassification::Affiliate,
                LinkClassification::Affiliate,
                LinkClassification::Affiliate,
                LinkClassification::External,
            ]
        );
    }

    #[test]
    fn skips_fragment_javascript_and_mailto_links() {
        let html = r##"
            <a href="#top">top</a>
            <a href="javascript:void(0)">noop</a>
            <a href="mailto:me@example.com">email</a>
            <a href="tel:+15555550100">call</a>
            <a href="https://shop.other.com/a">kept</a>
        "##;
        let links = extract_links(html, &base());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://shop.other.com/a");
    }

    #[test]
    fn preserves_query_and_drops_fragment() {
        let html = r#"<a href="https://www.amazon.com/dp/B01?tag=creator-20#reviews">x</a>"#;
        let links = extract_links(html, &base());
        assert_eq!(links[0].url, "https://www.amazon.com/dp/B01?tag=creator-20");
    }

    #[test]
    fn tolerates_malformed_html() {
        let html = "<a href='https://shop.other.com/a'>ok</a><a href=>broken<a ";
        let links = extract_links(html, &base());
        assert_eq!(links.len(), 1, "extraction degrades, never errors");
    }

    #[test]
    fn empty_page_yields_no_links() {
        assert!(extract_links("", &base()).is_empty());
    }

    #[test]
    fn anchor_text_is_stripped_of_nested_tags() {
        let html = r#"<a href="https://shop.other.com/a"><b>Bold</b> <i>offer</i></a>"#;
        let links = extract_links(html, &base());
        assert_eq!(links[0].anchor_text.as_deref(), Some("Bold offer"));
    }

    #[test]
    fn extract_title_returns_cleaned_text() {
        let html = "<html><head><title>  My Links \n Page </title></head></html>";
        assert_eq!(extract_title(html).as_deref(), Some("My Links Page"));
        assert_eq!(extract_title("<html></html>"), None);
    }
}
