//! Low-level HTTP helpers shared by the detectors.

use std::time::Duration;

use reqwest::Client;

use crate::error::AuditError;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Build the client used by the crawler, stock checker, and fingerprinter.
///
/// Follows up to 10 redirects so content checks see the destination page.
///
/// # Errors
///
/// Returns [`AuditError::Client`] if the underlying `reqwest::Client`
/// cannot be constructed (e.g., invalid TLS config).
pub fn build_detector_client(timeout_secs: u64, user_agent: &str) -> Result<Client, AuditError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(user_agent)
        .build()
        .map_err(AuditError::Client)
}

/// Build the client used by the redirect resolver.
///
/// Redirects are never followed: the resolver advances the chain itself,
/// one hop per request, so every intermediate status and `Location` header
/// stays observable.
///
/// # Errors
///
/// Returns [`AuditError::Client`] if the underlying `reqwest::Client`
/// cannot be constructed.
pub fn build_no_redirect_client(timeout_secs: u64, user_agent: &str) -> Result<Client, AuditError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(user_agent)
        .build()
        .map_err(AuditError::Client)
}

/// A fetched page body together with the status and post-redirect URL.
#[derive(Debug)]
pub(crate) struct FetchedPage {
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

/// GET a page and return its body for any HTTP status.
///
/// Only transport-level failures (timeout, DNS, connection refused) are
/// errors; callers classify the status themselves, since a 404 body is still
/// meaningful to some detectors.
pub(crate) async fn fetch_page(client: &Client, url: &str) -> Result<FetchedPage, AuditError> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
        .send()
        .await
        .map_err(|e| AuditError::from_fetch(url, e))?;

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let body = response
        .text()
        .await
        .map_err(|e| AuditError::from_fetch(url, e))?;

    Ok(FetchedPage {
        final_url,
        status,
        body,
    })
}
