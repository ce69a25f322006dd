mod batch;
pub mod issues;
pub mod link_audit;
pub mod revenue;
pub mod runner;
pub mod score;

pub use issues::{derive_issues, DerivedIssue, Severity};
pub use link_audit::{
    audit_link, AuditClients, CheckUrlOptions, LinkAuditOutcome, LinkAuditRecord, PendingLink,
};
pub use revenue::aggregate_revenue_health;
pub use runner::{
    check_destinations_for, check_url, run_audit, DestinationCheck, RunSummary,
};
pub use score::link_health_score;
