//! The per-link audit: four detectors joined over one link.

use linkpulse_audit::{
    build_detector_client, build_no_redirect_client, check_stock, classify_link, compare_encoded,
    detect_monetization, fingerprint_destination, resolve_chain, AuditError, ExtractedLink,
    Fingerprint, FingerprintDiff, LinkClassification, MonetizationCheck, RedirectChainResult,
    StockCheck,
};
use linkpulse_core::AppConfig;
use reqwest::Url;
use serde::Serialize;

/// The HTTP clients shared by every link audit in a run.
///
/// `reqwest::Client` is cheaply cloneable; one set per run keeps connection
/// pools shared across batches.
#[derive(Clone)]
pub struct AuditClients {
    /// Follows redirects; used for page crawls.
    pub crawler: reqwest::Client,
    /// Follows redirects; used by the stock checker and fingerprinter.
    pub detector: reqwest::Client,
    /// Never follows redirects; used by the redirect resolver.
    pub resolver: reqwest::Client,
}

impl AuditClients {
    /// Build the three clients from configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Client`] if any client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, AuditError> {
        Ok(Self {
            crawler: build_detector_client(
                config.audit_crawl_timeout_secs,
                &config.audit_user_agent,
            )?,
            detector: build_detector_client(
                config.audit_request_timeout_secs,
                &config.audit_user_agent,
            )?,
            resolver: build_no_redirect_client(
                config.audit_request_timeout_secs,
                &config.audit_user_agent,
            )?,
        })
    }
}

/// A link queued for auditing, paired with its previously stored fingerprint.
#[derive(Debug, Clone)]
pub struct PendingLink {
    pub link: ExtractedLink,
    /// Encoded fingerprint from the last audit, when one exists.
    pub previous_fingerprint: Option<String>,
    /// Caller-supplied affiliate tag to validate; falls back to whatever the
    /// monetization detector extracts from the URL itself.
    pub expected_tag: Option<String>,
}

/// Everything the detectors learned about one link.
#[derive(Debug, Clone, Serialize)]
pub struct LinkAuditRecord {
    pub url: String,
    pub classification: LinkClassification,
    pub chain: RedirectChainResult,
    pub chain_health: u8,
    pub stock: StockCheck,
    pub monetization: MonetizationCheck,
    pub fingerprint: Fingerprint,
    /// Drift against the prior fingerprint; `None` when no prior fingerprint
    /// exists or the current fetch produced nothing to compare.
    pub drift: Option<FingerprintDiff>,
    pub health_score: u8,
}

impl LinkAuditRecord {
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.chain.is_broken || self.stock.is_broken
    }

    #[must_use]
    pub fn is_out_of_stock(&self) -> bool {
        self.stock.availability == linkpulse_audit::Availability::OutOfStock
    }

    #[must_use]
    pub fn has_drifted(&self) -> bool {
        self.drift.is_some_and(|d| d.has_changed)
    }
}

/// The explicit, observable outcome of one link's audit.
///
/// A link is either fully audited or dropped from the run; skips are counted
/// per run rather than silently swallowed.
#[derive(Debug)]
pub enum LinkAuditOutcome {
    Audited(Box<LinkAuditRecord>),
    Skipped { url: String, reason: String },
}

/// Options for ad hoc single-URL checks.
#[derive(Debug, Clone, Default)]
pub struct CheckUrlOptions {
    /// Affiliate tag whose presence the stock checker should validate.
    pub expected_tag: Option<String>,
    /// Prior encoded fingerprint to diff against.
    pub previous_fingerprint: Option<String>,
}

/// Audit one link: resolve its redirect chain, check stock, detect
/// monetization, and fingerprint the destination, all concurrently.
///
/// Detector reachability problems are captured inside the individual
/// results; only an unparsable URL skips the link here. Panics inside a
/// detector are converted to skips by the batch layer's task boundary.
pub async fn audit_link(
    clients: &AuditClients,
    pending: PendingLink,
    max_hops: usize,
    drift_threshold: f64,
) -> LinkAuditOutcome {
    let url = pending.link.url;

    let parsed = match Url::parse(&url) {
        Ok(parsed) => parsed,
        Err(e) => {
            return LinkAuditOutcome::Skipped {
                reason: format!("invalid URL: {e}"),
                url,
            };
        }
    };

    let monetization = detect_monetization(&parsed);
    let expected_tag = pending.expected_tag.or_else(|| monetization.tag.clone());

    let (chain, stock, fingerprint) = tokio::join!(
        resolve_chain(&clients.resolver, &url, max_hops),
        check_stock(&clients.detector, &url, expected_tag.as_deref()),
        fingerprint_destination(&clients.detector, &url),
    );

    let drift = match &pending.previous_fingerprint {
        Some(previous) if !previous.is_empty() && !fingerprint.is_empty() => Some(
            compare_encoded(previous, &fingerprint.encode(), drift_threshold),
        ),
        // No baseline, or the current fetch failed open: cannot assess.
        _ => None,
    };

    let chain_health = linkpulse_audit::analyze_chain_health(&chain);
    let is_broken = chain.is_broken || stock.is_broken;

    let health_score = crate::score::link_health_score(
        chain_health,
        is_broken,
        stock.availability == linkpulse_audit::Availability::OutOfStock,
        !monetization.has_affiliate_tag,
        drift.is_some_and(|d| d.has_changed),
    );

    LinkAuditOutcome::Audited(Box::new(LinkAuditRecord {
        url,
        classification: pending.link.classification,
        chain,
        chain_health,
        stock,
        monetization,
        fingerprint,
        drift,
        health_score,
    }))
}

/// Build the [`PendingLink`] for an ad hoc check of a bare URL.
pub(crate) fn pending_for_url(url: &str, options: &CheckUrlOptions) -> PendingLink {
    let classification = Url::parse(url)
        .map_or(LinkClassification::External, |u| classify_link(&u, None));

    PendingLink {
        link: ExtractedLink {
            url: url.to_owned(),
            anchor_text: None,
            position: 0,
            classification,
        },
        previous_fingerprint: options.previous_fingerprint.clone(),
        expected_tag: options.expected_tag.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_for_url_classifies_known_network_hosts() {
        let pending = pending_for_url("https://amzn.to/3xYzAbC", &CheckUrlOptions::default());
        assert_eq!(
            pending.link.classification,
            LinkClassification::Affiliate
        );

        let plain = pending_for_url(
            "https://shop.example.com/mug",
            &CheckUrlOptions::default(),
        );
        assert_eq!(plain.link.classification, LinkClassification::External);
    }
}
