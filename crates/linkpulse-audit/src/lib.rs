pub mod crawler;
pub mod error;
pub mod fetch;
pub mod fingerprint;
pub mod monetize;
pub mod redirect;
pub mod stock;

pub use crawler::{classify_link, crawl_page, ExtractedLink, LinkClassification, PageCrawl};
pub use error::AuditError;
pub use fetch::{build_detector_client, build_no_redirect_client};
pub use fingerprint::{
    compare_encoded, compare_fingerprints, fingerprint_destination, Fingerprint, FingerprintDiff,
    DEFAULT_DRIFT_THRESHOLD,
};
pub use monetize::{detect_monetization, MonetizationCheck};
pub use redirect::{
    analyze_chain_health, resolve_chain, RedirectChainResult, RedirectHop, DEFAULT_MAX_HOPS,
};
pub use stock::{check_stock, Availability, StockCheck};
