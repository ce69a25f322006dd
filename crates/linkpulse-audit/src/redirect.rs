//! Redirect-chain resolution and chain health scoring.
//!
//! The resolver advances a link's redirect chain one hop at a time with a
//! redirect-non-following client, so every intermediate status stays
//! observable. Reachability problems are captured into the result — the
//! resolver never returns an error for a single link's troubles.

use std::collections::HashSet;
use std::time::Instant;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Deserialize, Serialize};

/// Maximum redirect hops followed before the chain is declared broken.
pub const DEFAULT_MAX_HOPS: usize = 10;

/// One request/response step within a redirect chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectHop {
    pub url: String,
    pub status: u16,
    pub at: DateTime<Utc>,
}

/// The resolved chain for one link.
///
/// When at least one response was received, `hops` is non-empty and starts
/// at the original URL; if `is_broken` is false the last hop's status is
/// below 300. A transport failure before any response leaves `hops` empty
/// with the failure described in `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectChainResult {
    pub final_url: String,
    pub hops: Vec<RedirectHop>,
    pub total_time_ms: u64,
    pub is_broken: bool,
    pub error: Option<String>,
}

impl RedirectChainResult {
    #[must_use]
    pub fn redirect_count(&self) -> usize {
        self.hops.len().saturating_sub(1)
    }
}

/// Why a chain stopped before reaching a terminal success status.
#[derive(Debug)]
enum ChainBreak {
    InvalidStartUrl(String),
    MissingLocation,
    InvalidLocation(String),
    Loop(String),
    HopLimit(usize),
    ErrorStatus(u16),
    Transport(String),
}

impl std::fmt::Display for ChainBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainBreak::InvalidStartUrl(reason) => write!(f, "invalid URL: {reason}"),
            ChainBreak::MissingLocation => {
                write!(f, "redirect response without a Location header")
            }
            ChainBreak::InvalidLocation(loc) => write!(f, "unparsable Location value: {loc}"),
            ChainBreak::Loop(url) => write!(f, "redirect loop back to {url}"),
            ChainBreak::HopLimit(max) => write!(f, "still redirecting after {max} hops"),
            ChainBreak::ErrorStatus(status) => write!(f, "destination returned HTTP {status}"),
            ChainBreak::Transport(reason) => write!(f, "request failed: {reason}"),
        }
    }
}

/// Follow `start_url`'s redirect chain hop by hop.
///
/// `client` must be built with redirects disabled
/// (see [`crate::fetch::build_no_redirect_client`]). HEAD is preferred; a
/// hop answering 405/501 is retried with GET. Terminal conditions: a status
/// below 300 (success), a status of 400 or above, a missing or unparsable
/// `Location`, a URL already visited (loop), or `max_hops` exhausted while
/// still redirecting.
pub async fn resolve_chain(
    client: &Client,
    start_url: &str,
    max_hops: usize,
) -> RedirectChainResult {
    let started = Instant::now();

    let mut current = match Url::parse(start_url) {
        Ok(url) => url,
        Err(e) => {
            return broken(
                start_url.to_owned(),
                Vec::new(),
                started,
                &ChainBreak::InvalidStartUrl(e.to_string()),
            );
        }
    };

    let mut visited: HashSet<String> = HashSet::from([current.to_string()]);
    let mut hops: Vec<RedirectHop> = Vec::new();

    loop {
        let response = match request_hop(client, &current).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %current, error = %e, "redirect hop request failed");
                return broken(
                    current.to_string(),
                    hops,
                    started,
                    &ChainBreak::Transport(e.to_string()),
                );
            }
        };

        let status = response.status();
        hops.push(RedirectHop {
            url: current.to_string(),
            status: status.as_u16(),
            at: Utc::now(),
        });

        if status.as_u16() < 300 {
            return RedirectChainResult {
                final_url: current.to_string(),
                total_time_ms: elapsed_ms(started),
                hops,
                is_broken: false,
                error: None,
            };
        }

        if status.as_u16() >= 400 {
            return broken(
                current.to_string(),
                hops,
                started,
                &ChainBreak::ErrorStatus(status.as_u16()),
            );
        }

        // 3xx: advance the chain through the Location header.
        let Some(location) = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
        else {
            return broken(
                current.to_string(),
                hops,
                started,
                &ChainBreak::MissingLocation,
            );
        };

        let next = match current.join(location) {
            Ok(next) => next,
            Err(_) => {
                return broken(
                    current.to_string(),
                    hops,
                    started,
                    &ChainBreak::InvalidLocation(location.to_owned()),
                );
            }
        };

        if !visited.insert(next.to_string()) {
            return broken(
                current.to_string(),
                hops,
                started,
                &ChainBreak::Loop(next.to_string()),
            );
        }

        if hops.len() >= max_hops {
            return broken(
                current.to_string(),
                hops,
                started,
                &ChainBreak::HopLimit(max_hops),
            );
        }

        current = next;
    }
}

/// HEAD the current hop, falling back to GET when HEAD is not supported.
async fn request_hop(client: &Client, url: &Url) -> Result<reqwest::Response, reqwest::Error> {
    let response = client.request(Method::HEAD, url.clone()).send().await?;
    if matches!(
        response.status(),
        StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
    ) {
        return client.get(url.clone()).send().await;
    }
    Ok(response)
}

fn broken(
    final_url: String,
    hops: Vec<RedirectHop>,
    started: Instant,
    reason: &ChainBreak,
) -> RedirectChainResult {
    RedirectChainResult {
        final_url,
        hops,
        total_time_ms: elapsed_ms(started),
        is_broken: true,
        error: Some(reason.to_string()),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

const TEMPORARY_REDIRECT_STATUSES: [u16; 3] = [302, 303, 307];

/// Score a resolved chain's health, 0–100.
///
/// Broken chains score 0. Otherwise the score starts at 100 and loses
/// 20 points for more than 5 redirect hops (10 for more than 3), 15 for a
/// total resolution time above 5000ms (5 above 3000ms), 10 if any hop is
/// served over plain HTTP, and 5 if any hop used a temporary redirect
/// status instead of a permanent one.
#[must_use]
pub fn analyze_chain_health(chain: &RedirectChainResult) -> u8 {
    if chain.is_broken {
        return 0;
    }

    let mut score: i32 = 100;

    let redirects = chain.redirect_count();
    if redirects > 5 {
        score -= 20;
    } else if redirects > 3 {
        score -= 10;
    }

    if chain.total_time_ms > 5000 {
        score -= 15;
    } else if chain.total_time_ms > 3000 {
        score -= 5;
    }

    if chain.hops.iter().any(|h| h.url.starts_with("http://")) {
        score -= 10;
    }

    if chain
        .hops
        .iter()
        .any(|h| TEMPORARY_REDIRECT_STATUSES.contains(&h.status))
    {
        score -= 5;
    }

    u8::try_from(score.max(0)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(url: &str, status: u16) -> RedirectHop {
        RedirectHop {
            url: url.to_owned(),
            status,
            at: Utc::now(),
        }
    }

    fn chain(hops: Vec<RedirectHop>, total_time_ms: u64, is_broken: bool) -> RedirectChainResult {
        let final_url = hops.last().map_or(String::new(), |h| h.url.clone());
        RedirectChainResult {
            final_url,
            hops,
            total_time_ms,
            is_broken,
            error: None,
        }
    }

    #[test]
    fn broken_chain_scores_zero() {
        let c = chain(vec![hop("https://a.example", 404)], 120, true);
        assert_eq!(analyze_chain_health(&c), 0);
    }

    #[test]
    fn clean_direct_hit_scores_full() {
        let c = chain(vec![hop("https://a.example", 200)], 300, false);
        assert_eq!(analyze_chain_health(&c), 100);
    }

    #[test]
    fn deducts_for_long_chains() {
        let mut hops: Vec<RedirectHop> = (0..5)
            .map(|i| hop(&format!("https://r{i}.example"), 301))
            .collect();
        hops.push(hop("https://final.example", 200));
        // 5 redirect hops: > 3 but not > 5.
        assert_eq!(analyze_chain_health(&chain(hops.clone(), 100, false)), 90);

        hops.insert(0, hop("https://r9.example", 301));
        hops.insert(0, hop("https://r8.example", 301));
        // 7 redirect hops: > 5.
        assert_eq!(analyze_chain_health(&chain(hops, 100, false)), 80);
    }

    #[test]
    fn deducts_for_slow_resolution() {
        let hops = vec![hop("https://a.example", 200)];
        assert_eq!(analyze_chain_health(&chain(hops.clone(), 3500, false)), 95);
        assert_eq!(analyze_chain_health(&chain(hops, 6000, false)), 85);
    }

    #[test]
    fn deducts_for_unencrypted_hop() {
        let hops = vec![
            hop("http://a.example", 301),
            hop("https://b.example", 200),
        ];
        // 10 for the http:// hop, 0 for the permanent redirect.
        assert_eq!(analyze_chain_health(&chain(hops, 100, false)), 90);
    }

    #[test]
    fn deducts_for_temporary_redirects() {
        let hops = vec![
            hop("https://a.example", 302),
            hop("https://b.example", 200),
        ];
        assert_eq!(analyze_chain_health(&chain(hops, 100, false)), 95);

        let permanent = vec![
            hop("https://a.example", 301),
            hop("https://b.example", 200),
        ];
        assert_eq!(analyze_chain_health(&chain(permanent, 100, false)), 100);
    }

    #[test]
    fn all_deductions_stack() {
        let mut hops: Vec<RedirectHop> = (0..7)
            .map(|i| hop(&format!("http://r{i}.example"), 302))
            .collect();
        hops.push(hop("http://final.example", 200));
        let c = chain(hops, 9000, false);
        // 20 (hops) + 15 (time) + 10 (http) + 5 (temporary) = 50.
        assert_eq!(analyze_chain_health(&c), 50);
    }

    #[test]
    fn redirect_count_is_hops_minus_one() {
        let c = chain(
            vec![
                hop("https://a.example", 301),
                hop("https://b.example", 301),
                hop("https://c.example", 200),
            ],
            100,
            false,
        );
        assert_eq!(c.redirect_count(), 2);
    }
}
