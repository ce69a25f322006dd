//! Issue derivation: fixed rules mapping detector signals to actionable,
//! persisted issues.

use serde::Serialize;

use crate::link_audit::LinkAuditRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// An issue derived from one link's audit, not yet persisted.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedIssue {
    pub issue_type: &'static str,
    pub severity: Severity,
    /// Rough monthly revenue at risk, as a percentage of the link's earning
    /// potential.
    pub revenue_impact: f64,
    pub confidence: u8,
    pub detail: String,
}

/// Redirect chains longer than this raise an informational issue.
const LONG_CHAIN_HOPS: usize = 5;

/// Derive zero or more issues for an audited link.
///
/// The rules are independent of one another; a link can carry several issues
/// at once. Severity, impact, and confidence are fixed per rule, except that
/// the out-of-stock confidence comes from the stock detector itself.
#[must_use]
pub fn derive_issues(record: &LinkAuditRecord) -> Vec<DerivedIssue> {
    let mut issues = Vec::new();

    if record.is_broken() {
        let detail = record
            .chain
            .error
            .clone()
            .or_else(|| {
                record
                    .stock
                    .http_status
                    .filter(|s| *s >= 400)
                    .map(|s| format!("destination returned HTTP {s}"))
            })
            .unwrap_or_else(|| "destination unreachable".to_string());
        issues.push(DerivedIssue {
            issue_type: "broken_link",
            severity: Severity::Critical,
            revenue_impact: 50.0,
            confidence: 100,
            detail,
        });
    }

    if record.is_out_of_stock() {
        issues.push(DerivedIssue {
            issue_type: "stock_out",
            severity: Severity::Critical,
            revenue_impact: 30.0,
            confidence: record.stock.confidence,
            detail: "destination reports the product as out of stock".to_string(),
        });
    }

    if !record.monetization.has_affiliate_tag {
        let detail = record
            .monetization
            .suggestion
            .clone()
            .unwrap_or_else(|| "no affiliate tracking detected on this link".to_string());
        issues.push(DerivedIssue {
            issue_type: "missing_affiliate_tag",
            severity: Severity::Warning,
            revenue_impact: 20.0,
            confidence: 90,
            detail,
        });
    }

    if record.has_drifted() {
        let change_pct = record.drift.map_or(0, |d| d.change_pct);
        issues.push(DerivedIssue {
            issue_type: "content_drift",
            severity: Severity::Warning,
            revenue_impact: 15.0,
            confidence: 80,
            detail: format!("destination content changed by about {change_pct}%"),
        });
    }

    if record.chain.redirect_count() > LONG_CHAIN_HOPS {
        issues.push(DerivedIssue {
            issue_type: "long_redirect_chain",
            severity: Severity::Info,
            revenue_impact: 5.0,
            confidence: 100,
            detail: format!(
                "link passes through {} redirects before reaching its destination",
                record.chain.redirect_count()
            ),
        });
    }

    issues
}

#[cfg(test)]
mod tests {
    use linkpulse_audit::{
        Availability, Fingerprint, FingerprintDiff, LinkClassification, MonetizationCheck,
        RedirectChainResult, RedirectHop, StockCheck,
    };

    use super::*;
    use crate::link_audit::LinkAuditRecord;
    use crate::score::link_health_score;

    fn clean_chain(hop_count: usize) -> RedirectChainResult {
        let mut hops: Vec<RedirectHop> = (0..hop_count.saturating_sub(1))
            .map(|i| RedirectHop {
                url: format!("https://r{i}.example"),
                status: 301,
                at: chrono_now(),
            })
            .collect();
        hops.push(RedirectHop {
            url: "https://final.example/product".to_string(),
            status: 200,
            at: chrono_now(),
        });
        RedirectChainResult {
            final_url: "https://final.example/product".to_string(),
            hops,
            total_time_ms: 150,
            is_broken: false,
            error: None,
        }
    }

    fn chrono_now() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now()
    }

    fn monetized() -> MonetizationCheck {
        MonetizationCheck {
            has_affiliate_tag: true,
            network: Some("Amazon Associates"),
            tag: Some("creator-20".to_string()),
            is_optimal: true,
            suggestion: None,
        }
    }

    fn in_stock() -> StockCheck {
        StockCheck {
            availability: Availability::InStock,
            is_broken: false,
            http_status: Some(200),
            confidence: 85,
            tag_present: Some(true),
            error: None,
        }
    }

    fn record(
        chain: RedirectChainResult,
        stock: StockCheck,
        monetization: MonetizationCheck,
        drift: Option<FingerprintDiff>,
    ) -> LinkAuditRecord {
        let chain_health = linkpulse_audit::analyze_chain_health(&chain);
        let is_broken = chain.is_broken || stock.is_broken;
        let health_score = link_health_score(
            chain_health,
            is_broken,
            stock.availability == Availability::OutOfStock,
            !monetization.has_affiliate_tag,
            drift.is_some_and(|d| d.has_changed),
        );
        LinkAuditRecord {
            url: "https://www.amazon.com/dp/B01?tag=creator-20".to_string(),
            classification: LinkClassification::Affiliate,
            chain,
            chain_health,
            stock,
            monetization,
            fingerprint: Fingerprint::empty(),
            drift,
            health_score,
        }
    }

    #[test]
    fn healthy_link_yields_no_issues() {
        let rec = record(clean_chain(1), in_stock(), monetized(), None);
        assert_eq!(rec.health_score, 100);
        assert!(derive_issues(&rec).is_empty());
    }

    #[test]
    fn out_of_stock_link_yields_exactly_one_critical_stock_out() {
        let mut stock = in_stock();
        stock.availability = Availability::OutOfStock;
        stock.confidence = 95;

        let rec = record(clean_chain(1), stock, monetized(), None);
        assert_eq!(
            rec.health_score, 20,
            "min(100, 100, 20, 100, 100) for a clean chain that is out of stock"
        );

        let issues = derive_issues(&rec);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "stock_out");
        assert_eq!(issues[0].severity, Severity::Critical);
        assert!((issues[0].revenue_impact - 30.0).abs() < f64::EPSILON);
        assert_eq!(
            issues[0].confidence, 95,
            "confidence comes from the stock detector"
        );
    }

    #[test]
    fn broken_chain_yields_critical_broken_link() {
        let mut chain = clean_chain(1);
        chain.is_broken = true;
        chain.hops[0].status = 404;
        chain.error = Some("destination returned HTTP 404".to_string());

        let rec = record(chain, in_stock(), monetized(), None);
        assert_eq!(rec.health_score, 0);

        let issues = derive_issues(&rec);
        let broken: Vec<_> = issues
            .iter()
            .filter(|i| i.issue_type == "broken_link")
            .collect();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].severity, Severity::Critical);
        assert_eq!(broken[0].confidence, 100);
        assert!(broken[0].detail.contains("404"));
    }

    #[test]
    fn missing_tag_yields_warning_with_suggestion_detail() {
        let unmonetized = MonetizationCheck {
            has_affiliate_tag: false,
            network: None,
            tag: None,
            is_optimal: false,
            suggestion: Some("route this link through an affiliate network".to_string()),
        };

        let rec = record(clean_chain(1), in_stock(), unmonetized, None);
        assert_eq!(rec.health_score, 60);

        let issues = derive_issues(&rec);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "missing_affiliate_tag");
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].confidence, 90);
        assert!(issues[0].detail.contains("affiliate network"));
    }

    #[test]
    fn drift_yields_warning_with_change_percentage() {
        let drift = FingerprintDiff {
            similarity: 1.0 / 3.0,
            has_changed: true,
            change_pct: 67,
        };

        let rec = record(clean_chain(1), in_stock(), monetized(), Some(drift));
        assert_eq!(rec.health_score, 70);

        let issues = derive_issues(&rec);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "content_drift");
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].detail.contains("67%"));
    }

    #[test]
    fn long_chain_yields_info_issue() {
        let rec = record(clean_chain(7), in_stock(), monetized(), None);

        let issues = derive_issues(&rec);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, "long_redirect_chain");
        assert_eq!(issues[0].severity, Severity::Info);
        assert_eq!(issues[0].confidence, 100);
    }

    #[test]
    fn rules_are_independent_and_stack() {
        let mut stock = in_stock();
        stock.availability = Availability::OutOfStock;
        let drift = FingerprintDiff {
            similarity: 0.0,
            has_changed: true,
            change_pct: 100,
        };

        let rec = record(clean_chain(1), stock, monetized(), Some(drift));
        let types: Vec<&str> = derive_issues(&rec).iter().map(|i| i.issue_type).collect();
        assert_eq!(types, vec!["stock_out", "content_drift"]);
    }
}
