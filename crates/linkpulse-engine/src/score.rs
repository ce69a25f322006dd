//! Pure per-link health scoring.

/// Score factor applied when the destination is out of stock.
const OUT_OF_STOCK_FACTOR: u8 = 20;
/// Score factor applied when no affiliate tracking is present.
const TAG_MISSING_FACTOR: u8 = 60;
/// Score factor applied when destination content has drifted.
const DRIFT_FACTOR: u8 = 70;

/// Compute one link's composite health score, 0–100.
///
/// A broken link scores 0 outright. Otherwise the score is the minimum of
/// the redirect-chain health score and the per-signal factors, so a single
/// severe problem dominates rather than being averaged away. A fully healthy
/// link scores 100.
#[must_use]
pub fn link_health_score(
    chain_health: u8,
    is_broken: bool,
    out_of_stock: bool,
    tag_missing: bool,
    drifted: bool,
) -> u8 {
    if is_broken {
        return 0;
    }

    let stock_factor = if out_of_stock { OUT_OF_STOCK_FACTOR } else { 100 };
    let tag_factor = if tag_missing { TAG_MISSING_FACTOR } else { 100 };
    let drift_factor = if drifted { DRIFT_FACTOR } else { 100 };

    chain_health
        .min(stock_factor)
        .min(tag_factor)
        .min(drift_factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_healthy_link_scores_100() {
        assert_eq!(link_health_score(100, false, false, false, false), 100);
    }

    #[test]
    fn broken_link_scores_zero_regardless_of_other_signals() {
        assert_eq!(link_health_score(100, true, false, false, false), 0);
        assert_eq!(link_health_score(95, true, true, true, true), 0);
    }

    #[test]
    fn out_of_stock_dominates_a_clean_chain() {
        // min(100, 20, 100, 100) = 20.
        assert_eq!(link_health_score(100, false, true, false, false), 20);
    }

    #[test]
    fn missing_tag_caps_the_score_at_60() {
        assert_eq!(link_health_score(100, false, false, true, false), 60);
    }

    #[test]
    fn drift_caps_the_score_at_70() {
        assert_eq!(link_health_score(100, false, false, false, true), 70);
    }

    #[test]
    fn minimum_wins_over_combination() {
        // Out-of-stock (20) is lower than missing tag (60) and drift (70).
        assert_eq!(link_health_score(90, false, true, true, true), 20);
    }

    #[test]
    fn degraded_chain_health_carries_through() {
        assert_eq!(link_health_score(85, false, false, false, false), 85);
        // Chain health lower than the drift factor.
        assert_eq!(link_health_score(65, false, false, false, true), 65);
    }
}
