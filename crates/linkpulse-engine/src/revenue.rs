//! Aggregate revenue-health scoring.
//!
//! Stand-in for the external scoring collaborator: a weighted average of the
//! run's per-link health scores, with monetized links weighted double since
//! their breakage costs commission directly.

use crate::link_audit::LinkAuditRecord;

const MONETIZED_WEIGHT: f64 = 2.0;
const UNMONETIZED_WEIGHT: f64 = 1.0;

/// Compute the 0–100 revenue-health score for a run's audited links.
///
/// An empty run scores 100.0 — no links means nothing is losing revenue.
#[must_use]
pub fn aggregate_revenue_health(records: &[LinkAuditRecord]) -> f64 {
    if records.is_empty() {
        return 100.0;
    }

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for record in records {
        let weight = if record.monetization.has_affiliate_tag {
            MONETIZED_WEIGHT
        } else {
            UNMONETIZED_WEIGHT
        };
        weighted_sum += f64::from(record.health_score) * weight;
        weight_total += weight;
    }

    weighted_sum / weight_total
}

#[cfg(test)]
mod tests {
    use linkpulse_audit::{
        Availability, Fingerprint, LinkClassification, MonetizationCheck, RedirectChainResult,
        StockCheck,
    };

    use super::*;
    use crate::link_audit::LinkAuditRecord;

    fn record(health_score: u8, monetized: bool) -> LinkAuditRecord {
        LinkAuditRecord {
            url: "https://example.com".to_string(),
            classification: LinkClassification::External,
            chain: RedirectChainResult {
                final_url: "https://example.com".to_string(),
                hops: Vec::new(),
                total_time_ms: 0,
                is_broken: false,
                error: None,
            },
            chain_health: 100,
            stock: StockCheck {
                availability: Availability::Unknown,
                is_broken: false,
                http_status: Some(200),
                confidence: 0,
                tag_present: None,
                error: None,
            },
            monetization: MonetizationCheck {
                has_affiliate_tag: monetized,
                network: monetized.then_some("Amazon Associates"),
                tag: None,
                is_optimal: monetized,
                suggestion: None,
            },
            fingerprint: Fingerprint::empty(),
            drift: None,
            health_score,
        }
    }

    #[test]
    fn empty_run_scores_100() {
        assert!((aggregate_revenue_health(&[]) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn uniform_scores_average_to_themselves() {
        let records = vec![record(80, true), record(80, false)];
        assert!((aggregate_revenue_health(&records) - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn monetized_links_weigh_double() {
        // (0 * 2 + 100 * 1) / 3 ≈ 33.3: a broken monetized link drags the
        // aggregate harder than a broken plain link would.
        let records = vec![record(0, true), record(100, false)];
        let score = aggregate_revenue_health(&records);
        assert!((score - 100.0 / 3.0).abs() < 1e-9);

        let flipped = vec![record(0, false), record(100, true)];
        let flipped_score = aggregate_revenue_health(&flipped);
        assert!((flipped_score - 200.0 / 3.0).abs() < 1e-9);
        assert!(flipped_score > score);
    }
}
