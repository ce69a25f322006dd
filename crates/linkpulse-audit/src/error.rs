use thiserror::Error;

/// Errors surfaced by the network-bound detectors.
///
/// The redirect resolver and the stock checker capture reachability problems
/// into their result types instead of returning these; the crawler and any
/// caller-side URL validation propagate them.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl AuditError {
    /// Classify a transport-level `reqwest` failure for `url`.
    pub(crate) fn from_fetch(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            AuditError::Timeout {
                url: url.to_owned(),
            }
        } else {
            AuditError::Network {
                url: url.to_owned(),
                source,
            }
        }
    }
}
